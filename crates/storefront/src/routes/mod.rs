//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (featured dishes, categories)
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check
//!
//! # Menu
//! GET  /menu                      - Full menu
//! GET  /menu/{category}           - Menu filtered by category
//! GET  /order                     - Menu as the ordering entry point
//! GET  /order/{item_id}           - Dish detail with reviews
//! POST /order/{item_id}/reviews   - Post a review
//!
//! # Cart (requires auth)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (merges lines)
//! POST /cart/update               - Set line quantity
//! POST /cart/remove               - Remove line
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Checkout form (?item_id=&quantity= for order now)
//! POST /checkout                  - Place order
//! GET  /order-confirmation/{id}   - Order confirmation
//!
//! # Bookings and contact
//! GET  /booking                   - Table booking form
//! POST /booking                   - Create booking
//! GET  /booking-confirmation      - Booking confirmation
//! GET  /contact                   - Contact form
//! POST /contact                   - Send contact message
//! GET  /contact-confirmation      - Contact confirmation
//!
//! # Account (requires auth)
//! GET  /my-orders                 - Order history
//! GET  /my-bookings               - Booking history
//! GET  /profile                   - Delivery profile
//! POST /profile                   - Save delivery profile
//!
//! # Auth
//! GET  /auth                      - Sign in / register page
//! POST /auth/login                - Sign in (rate limited)
//! POST /auth/register             - Register (rate limited)
//! POST /auth/logout               - Sign out
//!
//! # Admin (requires admin role)
//! GET  /admin                     - Console
//! POST /admin/menu                - Create menu item
//! GET  /admin/menu/{id}/edit      - Edit form
//! POST /admin/menu/{id}           - Update menu item
//! POST /admin/menu/{id}/delete    - Delete menu item
//! POST /admin/orders/{id}/status  - Change order status
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod booking;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod health;
pub mod home;
pub mod items;
pub mod menu;
pub mod pages;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Credential submissions are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/", get(auth::page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the menu and ordering routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(menu::index))
        .route("/{item_id}", get(items::show))
        .route("/{item_id}/reviews", post(items::create_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the admin console routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/menu", post(admin::create_item))
        .route("/menu/{id}", post(admin::update_item))
        .route("/menu/{id}/edit", get(admin::edit_item))
        .route("/menu/{id}/delete", post(admin::delete_item))
        .route("/orders/{id}/status", post(admin::update_order_status))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Menu
        .route("/menu", get(menu::index))
        .route("/menu/{category}", get(menu::category))
        .nest("/order", order_routes())
        // Cart and checkout
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .route("/order-confirmation/{id}", get(pages::order_confirmation))
        // Bookings and contact
        .route("/booking", get(booking::show).post(booking::submit))
        .route("/booking-confirmation", get(pages::booking_confirmation))
        .route("/contact", get(contact::show).post(contact::submit))
        .route("/contact-confirmation", get(pages::contact_confirmation))
        // Account
        .route("/my-orders", get(account::orders))
        .route("/my-bookings", get(account::bookings))
        .route("/profile", get(account::profile).post(account::update_profile))
        // Auth
        .nest("/auth", auth_routes())
        // Admin console
        .nest("/admin", admin_routes())
}
