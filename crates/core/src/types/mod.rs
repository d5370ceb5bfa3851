//! Core types for Millets.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{OrderLine, order_total};
pub use price::{CurrencyCode, Price, PriceError};
pub use status::*;
