//! Cart operations on top of the platform's per-user cart lines.

use rust_decimal::Decimal;
use tracing::instrument;

use millets_core::{CartLineId, MenuItemId, UserId};

use crate::platform::{CartLine, DataPlatform, PlatformError};

/// Add `quantity` of an item to a user's cart.
///
/// An item already in the cart has its line quantity increased instead of
/// getting a second line.
///
/// # Errors
///
/// Returns the platform error if the cart cannot be read or written.
#[instrument(skip(platform))]
pub async fn add_item(
    platform: &dyn DataPlatform,
    user: UserId,
    item: MenuItemId,
    quantity: u32,
) -> Result<(), PlatformError> {
    let quantity = quantity.max(1);
    let lines = platform.cart_lines(user).await?;

    match lines.iter().find(|line| line.item_id == item) {
        Some(line) => {
            platform
                .set_cart_quantity(user, line.id, line.quantity.saturating_add(quantity))
                .await
        }
        None => platform.insert_cart_line(user, item, quantity).await,
    }
}

/// Set a cart line's quantity. Quantities below one are ignored.
///
/// Returns whether anything was written.
///
/// # Errors
///
/// Returns the platform error if the write fails.
#[instrument(skip(platform))]
pub async fn set_quantity(
    platform: &dyn DataPlatform,
    user: UserId,
    line: CartLineId,
    quantity: i64,
) -> Result<bool, PlatformError> {
    let Ok(quantity) = u32::try_from(quantity) else {
        return Ok(false);
    };
    if quantity < 1 {
        return Ok(false);
    }
    platform.set_cart_quantity(user, line, quantity).await?;
    Ok(true)
}

/// Sum of price × quantity over lines whose item still exists.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .filter_map(|line| {
            line.item
                .as_ref()
                .map(|item| item.price * Decimal::from(line.quantity))
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;

    #[tokio::test]
    async fn test_adding_same_item_merges_lines() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        let user = platform.add_user("asha@example.in", "pw", None);

        add_item(&platform, user, dosa.id, 1).await.unwrap();
        add_item(&platform, user, dosa.id, 2).await.unwrap();

        let lines = platform.cart_of(user);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_quantity_below_one_is_ignored() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        let user = platform.add_user("asha@example.in", "pw", None);
        add_item(&platform, user, dosa.id, 2).await.unwrap();
        let line = platform.cart_of(user)[0].id;

        assert!(!set_quantity(&platform, user, line, 0).await.unwrap());
        assert!(!set_quantity(&platform, user, line, -3).await.unwrap());
        assert_eq!(platform.cart_of(user)[0].quantity, 2);

        assert!(set_quantity(&platform, user, line, 5).await.unwrap());
        assert_eq!(platform.cart_of(user)[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_subtotal_skips_deleted_items() {
        let platform = MemoryPlatform::new();
        let dosa = platform.add_menu_item("Ragi Dosa", Decimal::new(9050, 2), "breakfast");
        let kheer = platform.add_menu_item("Millet Kheer", Decimal::new(70, 0), "desserts");
        let user = platform.add_user("asha@example.in", "pw", None);
        add_item(&platform, user, dosa.id, 2).await.unwrap();
        add_item(&platform, user, kheer.id, 1).await.unwrap();
        platform.delete_menu_item(kheer.id).await.unwrap();

        let lines = platform.cart_lines(user).await.unwrap();
        assert_eq!(subtotal(&lines), Decimal::new(18100, 2));
    }
}
