//! Type-safe price representation using decimal arithmetic.
//!
//! Menu prices are stored as plain decimals on the platform; the restaurant
//! only trades in rupees, so the currency is carried for display only.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from parsing a price typed into a form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The field was blank.
    #[error("price is required")]
    Empty,
    /// The field is not a decimal number.
    #[error("price must be a number")]
    Invalid,
    /// The value is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a rupee price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Parse a non-negative amount from admin form input.
    ///
    /// Surrounding whitespace and a leading rupee sign are accepted. The
    /// result is rounded to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the input is blank, not a number, or negative.
    pub fn parse_amount(input: &str) -> Result<Decimal, PriceError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('₹').unwrap_or(trimmed).trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }
        let amount: Decimal = trimmed.parse().map_err(|_| PriceError::Invalid)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{}{:.2}", self.currency_code.symbol(), rounded)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Symbol shown before amounts.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }
}
