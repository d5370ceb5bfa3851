//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Cached menu listings
//! - `cart` - Cart line merging
//! - `checkout` - Order snapshot, total and cart clearing
//! - `notifier` - Order status notifications

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod notifier;

pub use catalog::CatalogCache;
pub use checkout::{CheckoutError, CheckoutForm, CheckoutSource, place_order};
pub use notifier::{NotifyError, StatusNotifier};
