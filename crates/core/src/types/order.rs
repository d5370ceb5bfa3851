//! Order line snapshots.
//!
//! An order stores a copy of each item's name and price as they were when
//! the order was placed. Later menu edits never reach into past orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::MenuItemId;

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: MenuItemId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl OrderLine {
    /// Price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Sum of `price * quantity` over the given lines.
#[must_use]
pub fn order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}
