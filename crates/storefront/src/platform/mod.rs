//! Hosted data platform access.
//!
//! # Architecture
//!
//! - All persistence, sign-in and role storage live on a hosted platform
//!   (Supabase-compatible auth + `PostgREST` data API). Nothing is stored locally
//!   except server-side sessions.
//! - Handlers talk to the platform through the [`DataPlatform`] trait so the
//!   hosted client can be swapped for [`MemoryPlatform`] in tests.
//! - The data API is called with the service key; every user-owned query is
//!   scoped by `user_id` here on the server, never by the browser.
//!
//! # Collections
//!
//! | Collection   | Owner          | Used by                           |
//! |--------------|----------------|-----------------------------------|
//! | `users`      | role records   | session gate, registration, CLI   |
//! | `menu_items` | catalog        | menu pages, admin console, CLI    |
//! | `cart`       | per user       | cart, checkout                    |
//! | `orders`     | per user       | checkout, account, admin console  |
//! | `bookings`   | per user / anon| booking, account                  |
//! | `reviews`    | public         | item page                         |
//! | `contacts`   | public         | contact page                      |
//! | `profiles`   | per user       | profile page                      |

mod hosted;
#[cfg(any(test, feature = "test-support"))]
mod memory;
pub mod types;

pub use hosted::HostedPlatform;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryPlatform;
pub use types::*;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use millets_core::{
    BookingId, CartLineId, Email, MenuItemId, OrderId, OrderStatus, Role, UserId,
};

/// Errors that can occur when talking to the data platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A row addressed by id does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token was rejected or has expired.
    #[error("Session is no longer valid")]
    Unauthorized,

    /// Email/password sign-in failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// A unique constraint was hit (e.g. email already registered).
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl PlatformError {
    /// Whether this error means the caller's session should be discarded.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Operations the storefront needs from the hosted data platform.
///
/// Methods taking a [`UserId`] only ever see or touch that user's rows.
#[async_trait]
pub trait DataPlatform: Send + Sync {
    // --- auth -------------------------------------------------------------

    /// Exchange email and password for a session.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<AuthSession, PlatformError>;

    /// Create an account. The session is absent when email confirmation is on.
    async fn sign_up(&self, email: &Email, password: &SecretString)
    -> Result<SignUp, PlatformError>;

    /// Resolve an access token to its user.
    async fn current_user(&self, access_token: &str) -> Result<AuthUser, PlatformError>;

    /// Revoke an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), PlatformError>;

    // --- roles ------------------------------------------------------------

    /// Role record for a user, if one exists.
    async fn role_of(&self, user: UserId) -> Result<Option<Role>, PlatformError>;

    /// Insert a role record for a new account.
    async fn insert_role(&self, user: UserId, role: Role) -> Result<(), PlatformError>;

    /// Create or replace a role record.
    async fn set_role(&self, user: UserId, role: Role) -> Result<(), PlatformError>;

    // --- catalog ----------------------------------------------------------

    /// Menu items ordered by id, optionally limited to one category.
    async fn list_menu(&self, category: Option<&str>) -> Result<Vec<MenuItem>, PlatformError>;

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, PlatformError>;

    async fn create_menu_item(&self, item: &MenuItemInput) -> Result<MenuItem, PlatformError>;

    async fn update_menu_item(
        &self,
        id: MenuItemId,
        item: &MenuItemInput,
    ) -> Result<MenuItem, PlatformError>;

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<(), PlatformError>;

    // --- cart -------------------------------------------------------------

    /// Cart lines with their menu item embedded, newest first.
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, PlatformError>;

    async fn insert_cart_line(
        &self,
        user: UserId,
        item: MenuItemId,
        quantity: u32,
    ) -> Result<(), PlatformError>;

    async fn set_cart_quantity(
        &self,
        user: UserId,
        line: CartLineId,
        quantity: u32,
    ) -> Result<(), PlatformError>;

    async fn remove_cart_line(&self, user: UserId, line: CartLineId)
    -> Result<(), PlatformError>;

    /// Delete every cart line belonging to `user`.
    async fn clear_cart(&self, user: UserId) -> Result<(), PlatformError>;

    // --- orders -----------------------------------------------------------

    async fn create_order(&self, order: &NewOrder) -> Result<Order, PlatformError>;

    /// A user's orders, newest first.
    async fn orders_for(&self, user: UserId) -> Result<Vec<Order>, PlatformError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, PlatformError>;

    /// Every order, newest first.
    async fn all_orders(&self) -> Result<Vec<Order>, PlatformError>;

    /// Update an order's status and return the updated row.
    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, PlatformError>;

    // --- bookings ---------------------------------------------------------

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, PlatformError>;

    /// A user's bookings, newest first.
    async fn bookings_for(&self, user: UserId) -> Result<Vec<Booking>, PlatformError>;

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, PlatformError>;

    // --- reviews, contact, profiles --------------------------------------

    /// Reviews for an item, newest first.
    async fn reviews_for(&self, item: MenuItemId) -> Result<Vec<Review>, PlatformError>;

    async fn create_review(&self, review: &NewReview) -> Result<(), PlatformError>;

    async fn create_contact(&self, message: &ContactMessage) -> Result<(), PlatformError>;

    async fn profile(&self, user: UserId) -> Result<Option<Profile>, PlatformError>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), PlatformError>;

    // --- health -----------------------------------------------------------

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), PlatformError>;
}
