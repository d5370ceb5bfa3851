//! Session-held models for the storefront.
//!
//! Catalog, order and booking rows live in [`crate::platform::types`]; the
//! types here only ever live in the server-side session.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentUser, keys as session_keys};
