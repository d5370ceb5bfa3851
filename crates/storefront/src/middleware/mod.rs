//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. Session layer (tower-sessions)
//! 3. `TraceLayer` (request span)
//! 4. Request ID (recorded on the span)
//! 5. Security headers
//! 6. Rate limiting on `/auth/login` and `/auth/register` (governor)
//!
//! Access control is done per handler with the [`RequireAuth`] and
//! [`RequireAdmin`] extractors.

pub mod auth;
pub mod context;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    GateOutcome, OptionalAuth, RequireAdmin, RequireAuth, check_access, clear_current_user,
    resolve_role, sanitize_return_path, set_current_user,
};
pub use context::PageContext;
pub use rate_limit::auth_rate_limiter;
pub use request_id::{make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
