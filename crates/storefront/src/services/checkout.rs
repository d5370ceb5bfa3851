//! Order placement.
//!
//! The order's item snapshot and total are always built here from platform
//! data read at submission time. The form never carries prices.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use millets_core::{
    DeliveryMethod, Email, MenuItemId, OrderLine, OrderStatus, PaymentMethod, UserId, order_total,
};

use crate::platform::{DataPlatform, NewOrder, Order, PlatformError};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form failed validation; nothing was written.
    #[error("{0}")]
    Validation(String),

    /// Cart checkout with nothing in the cart.
    #[error("Your cart is empty")]
    EmptyCart,

    /// An item being ordered no longer exists.
    #[error("An item in your order is no longer available")]
    ItemUnavailable,

    /// The platform failed to read or write.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Where the ordered lines come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutSource {
    /// Everything in the user's cart; the cart is cleared afterwards.
    Cart,
    /// A single item ordered straight from its page; the cart is untouched.
    Direct { item_id: MenuItemId, quantity: u32 },
}

/// Checkout form data as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub delivery_method: String,
    pub payment_method: String,
    pub special_instructions: String,
    /// Present for "order now" from an item page.
    pub item_id: Option<String>,
    pub quantity: Option<String>,
}

/// A checkout form that passed validation.
#[derive(Debug, Clone)]
pub struct ValidCheckout {
    pub name: String,
    pub phone: String,
    pub email: Option<Email>,
    pub address: String,
    pub pincode: String,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub special_instructions: String,
    pub source: CheckoutSource,
}

fn required(value: &str, label: &str) -> Result<String, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::Validation(format!("{label} is required")));
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl CheckoutForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<ValidCheckout, CheckoutError> {
        let name = required(&self.name, "Name")?;
        let phone = required(&self.phone, "Phone")?;

        let delivery_method: DeliveryMethod = self
            .delivery_method
            .parse()
            .map_err(|_| CheckoutError::Validation("Choose delivery or takeaway".to_string()))?;
        let payment_method: PaymentMethod = self
            .payment_method
            .parse()
            .map_err(|_| CheckoutError::Validation("Choose a payment method".to_string()))?;

        let (address, pincode) = if delivery_method.requires_address() {
            (
                required(&self.address, "Address")?,
                required(&self.pincode, "Pincode")?,
            )
        } else {
            (self.address.trim().to_string(), self.pincode.trim().to_string())
        };

        let email = Email::parse_optional(&self.email)
            .map_err(|e| CheckoutError::Validation(format!("Email: {e}")))?;

        let source = match non_blank(self.item_id.as_ref()) {
            None => CheckoutSource::Cart,
            Some(raw) => {
                let item_id: MenuItemId = raw
                    .parse()
                    .map_err(|_| CheckoutError::Validation("Unknown item".to_string()))?;
                let quantity = match non_blank(self.quantity.as_ref()) {
                    None => 1,
                    Some(q) => q
                        .parse::<u32>()
                        .ok()
                        .filter(|q| *q >= 1)
                        .ok_or_else(|| {
                            CheckoutError::Validation("Quantity must be at least 1".to_string())
                        })?,
                };
                CheckoutSource::Direct { item_id, quantity }
            }
        };

        Ok(ValidCheckout {
            name,
            phone,
            email,
            address,
            pincode,
            delivery_method,
            payment_method,
            special_instructions: self.special_instructions.trim().to_string(),
            source,
        })
    }
}

/// Build the order lines for a checkout from current platform data.
async fn snapshot_lines(
    platform: &dyn DataPlatform,
    user: UserId,
    source: CheckoutSource,
) -> Result<Vec<OrderLine>, CheckoutError> {
    match source {
        CheckoutSource::Direct { item_id, quantity } => {
            let item = platform
                .menu_item(item_id)
                .await?
                .ok_or(CheckoutError::ItemUnavailable)?;
            Ok(vec![item.to_order_line(quantity)])
        }
        CheckoutSource::Cart => {
            let lines = platform.cart_lines(user).await?;
            if lines.is_empty() {
                return Err(CheckoutError::EmptyCart);
            }

            let mut snapshot = Vec::with_capacity(lines.len());
            for line in lines {
                let item = match line.item {
                    Some(item) => item,
                    None => platform
                        .menu_item(line.item_id)
                        .await?
                        .ok_or(CheckoutError::ItemUnavailable)?,
                };
                snapshot.push(item.to_order_line(line.quantity));
            }
            Ok(snapshot)
        }
    }
}

/// Place an order for `user`.
///
/// The lines are snapshotted from the catalog, the total is computed from the
/// snapshot, and the initial status follows the payment method. For cart
/// checkouts the cart is cleared after the order is stored; a failure to clear
/// it is logged and the order stands.
///
/// # Errors
///
/// Returns [`CheckoutError`] if the lines cannot be built or the order insert fails.
#[instrument(skip(platform, checkout), fields(source = ?checkout.source))]
pub async fn place_order(
    platform: &dyn DataPlatform,
    user: UserId,
    checkout: ValidCheckout,
) -> Result<Order, CheckoutError> {
    let items = snapshot_lines(platform, user, checkout.source).await?;
    let total = order_total(&items);

    let new_order = NewOrder {
        user_id: user,
        name: checkout.name,
        phone: checkout.phone,
        email: checkout.email,
        address: checkout.address,
        pincode: checkout.pincode,
        delivery_method: checkout.delivery_method,
        payment_method: checkout.payment_method,
        special_instructions: checkout.special_instructions,
        items,
        total,
        status: OrderStatus::initial_for(checkout.payment_method),
    };

    let order = platform.create_order(&new_order).await?;
    info!(order_id = %order.id, total = %order.total, "Order placed");

    if checkout.source == CheckoutSource::Cart
        && let Err(e) = platform.clear_cart(user).await
    {
        warn!(order_id = %order.id, error = %e, "Order stored but cart was not cleared");
    }

    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::platform::MemoryPlatform;

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            email: String::new(),
            address: "12 MG Road".to_string(),
            pincode: "560001".to_string(),
            delivery_method: "Delivery".to_string(),
            payment_method: "COD".to_string(),
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn test_delivery_requires_address() {
        let mut form = form();
        form.address = "  ".to_string();
        let err = form.validate().unwrap_err();
        assert_eq!(err.to_string(), "Address is required");

        form.delivery_method = "Takeaway".to_string();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_email_optional_but_checked() {
        let mut form = form();
        assert!(form.validate().unwrap().email.is_none());

        form.email = "not-an-email".to_string();
        assert!(matches!(form.validate(), Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn test_direct_quantity_must_be_positive() {
        let mut form = form();
        form.item_id = Some("4".to_string());
        form.quantity = Some("0".to_string());
        assert!(form.validate().is_err());

        form.quantity = Some("3".to_string());
        assert_eq!(
            form.validate().unwrap().source,
            CheckoutSource::Direct {
                item_id: MenuItemId::new(4),
                quantity: 3
            }
        );
    }

    #[tokio::test]
    async fn test_cart_checkout_snapshots_and_clears() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(9050, 2), "breakfast");
        let kheer = platform.add_menu_item("Millet Kheer", Decimal::new(70, 0), "desserts");
        let user = platform.add_user("asha@example.in", "pw", None);
        platform.insert_cart_line(user, dosa.id, 2).await.unwrap();
        platform.insert_cart_line(user, kheer.id, 1).await.unwrap();

        let order = place_order(&platform, user, form().validate().unwrap())
            .await
            .unwrap();

        assert_eq!(order.total, Decimal::new(25100, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert!(platform.cart_of(user).is_empty());
    }

    #[tokio::test]
    async fn test_prepaid_order_starts_paid() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        let user = platform.add_user("asha@example.in", "pw", None);
        platform.insert_cart_line(user, dosa.id, 1).await.unwrap();

        let mut form = form();
        form.payment_method = "UPI".to_string();
        let order = place_order(&platform, user, form.validate().unwrap())
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_direct_order_leaves_cart() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        let kheer = platform.add_menu_item("Millet Kheer", Decimal::new(70, 0), "desserts");
        let user = platform.add_user("asha@example.in", "pw", None);
        platform.insert_cart_line(user, kheer.id, 1).await.unwrap();

        let mut form = form();
        form.item_id = Some(dosa.id.to_string());
        form.quantity = Some("2".to_string());
        let order = place_order(&platform, user, form.validate().unwrap())
            .await
            .unwrap();

        assert_eq!(order.total, Decimal::new(180, 0));
        assert_eq!(platform.cart_of(user).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let platform = MemoryPlatform::new();
        let user = platform.add_user("asha@example.in", "pw", None);
        let err = place_order(&platform, user, form().validate().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(platform.orders().is_empty());
    }

    #[tokio::test]
    async fn test_cart_clear_failure_keeps_order() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        let user = platform.add_user("asha@example.in", "pw", None);
        platform.insert_cart_line(user, dosa.id, 1).await.unwrap();
        platform.fail_cart_clear(true);

        let order = place_order(&platform, user, form().validate().unwrap()).await;
        assert!(order.is_ok());
        assert_eq!(platform.orders().len(), 1);
    }
}
