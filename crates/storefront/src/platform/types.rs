//! Rows exchanged with the hosted data platform.
//!
//! Read types deserialize exactly what `PostgREST` returns; `New*`/`*Input`
//! types serialize the columns we write.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use millets_core::{
    BookingId, BookingStatus, CartLineId, ConfirmationMethod, DeliveryMethod, Email, MenuItemId,
    OrderId, OrderLine, OrderStatus, PaymentMethod, Price, ReviewId, UserId,
};

/// Treat a JSON `null` column like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Auth
// =============================================================================

/// A user as reported by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by a successful sign-in.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Result of creating an account.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: AuthUser,
    /// Present when the platform signs the user in immediately.
    pub session: Option<AuthSession>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A dish on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl MenuItem {
    /// Price formatted for display, e.g. `₹120.00`.
    #[must_use]
    pub fn price_display(&self) -> String {
        Price::inr(self.price).to_string()
    }

    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    #[must_use]
    pub fn image_src(&self) -> &str {
        match self.image_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => "/static/img/placeholder-dish.svg",
        }
    }

    /// Link to the menu page for this item's category.
    #[must_use]
    pub fn category_href(&self) -> String {
        format!("/menu/{}", urlencoding::encode(&self.category))
    }

    /// Snapshot this item into an order line.
    #[must_use]
    pub fn to_order_line(&self, quantity: u32) -> OrderLine {
        OrderLine {
            item_id: self.id,
            name: self.name.clone(),
            price: self.price,
            quantity,
        }
    }
}

/// Writable menu item columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart line with its menu item embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub item_id: MenuItemId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    /// Embedded by `select=*,menu_items(*)`; absent if the item was deleted.
    #[serde(rename = "menu_items", default)]
    pub item: Option<MenuItem>,
}

// =============================================================================
// Orders
// =============================================================================

/// Columns written when placing an order.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub email: Option<Email>,
    pub address: String,
    pub pincode: String,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub special_instructions: String,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub status: OrderStatus,
}

/// A stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pincode: String,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    #[serde(default, deserialize_with = "null_as_default")]
    pub special_instructions: String,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn total_display(&self) -> String {
        Price::inr(self.total).to_string()
    }

    /// Non-blank email to notify, if the customer gave one.
    #[must_use]
    pub fn contact_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }

    #[must_use]
    pub fn placed_on(&self) -> String {
        self.created_at.format("%d %b %Y, %H:%M").to_string()
    }
}

// =============================================================================
// Bookings
// =============================================================================

/// Columns written when booking a table.
#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub guests: u32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub occasion: String,
    pub table_preference: String,
    pub special_requests: String,
    pub confirmation_method: ConfirmationMethod,
    pub status: BookingStatus,
}

/// A stored booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub guests: u32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default, deserialize_with = "null_as_default")]
    pub occasion: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_preference: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub special_requests: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confirmation_method: ConfirmationMethod,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    #[must_use]
    pub fn date_display(&self) -> String {
        self.date.format("%a, %d %b %Y").to_string()
    }

    #[must_use]
    pub fn time_display(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

// =============================================================================
// Reviews, contact, profiles
// =============================================================================

/// A customer review of a menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub item_id: MenuItemId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    #[must_use]
    pub fn posted_on(&self) -> String {
        self.created_at.format("%d %b %Y").to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub item_id: MenuItemId,
    pub name: String,
    pub email: Option<Email>,
    pub message: String,
}

/// A message from the contact form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
}

/// Delivery details a user keeps on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pincode: String,
}

impl Profile {
    /// A blank profile for a user who has not saved one yet.
    #[must_use]
    pub const fn empty(id: UserId) -> Self {
        Self {
            id,
            full_name: String::new(),
            phone: String::new(),
            address: String::new(),
            pincode: String::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_line_decodes_embedded_item() {
        let json = r#"{
            "id": 3,
            "user_id": "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10",
            "item_id": 12,
            "quantity": 2,
            "created_at": "2026-03-01T10:15:00+00:00",
            "menu_items": {"id": 12, "name": "Ragi Dosa", "price": 90.5, "category": "breakfast",
                           "description": null, "image_url": null}
        }"#;
        let line: CartLine = serde_json::from_str(json).unwrap();
        let item = line.item.unwrap();
        assert_eq!(item.name, "Ragi Dosa");
        assert_eq!(item.price_display(), "₹90.50");
        assert_eq!(item.image_src(), "/static/img/placeholder-dish.svg");
    }

    #[test]
    fn test_cart_line_without_item() {
        let json = r#"{
            "id": 3,
            "user_id": "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10",
            "item_id": 12,
            "quantity": 1,
            "created_at": "2026-03-01T10:15:00Z",
            "menu_items": null
        }"#;
        let line: CartLine = serde_json::from_str(json).unwrap();
        assert!(line.item.is_none());
    }

    #[test]
    fn test_order_decodes_stored_row() {
        let json = r#"{
            "id": 41,
            "user_id": "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10",
            "name": "Asha",
            "phone": "9876543210",
            "email": "",
            "address": "12 MG Road",
            "pincode": "560001",
            "delivery_method": "Delivery",
            "payment_method": "UPI",
            "special_instructions": "",
            "items": [{"item_id": 12, "name": "Ragi Dosa", "price": "90.50", "quantity": 2}],
            "total": 181,
            "status": "in process",
            "created_at": "2026-03-01T10:15:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::InProcess);
        assert_eq!(order.payment_method, PaymentMethod::Upi);
        assert_eq!(order.contact_email(), None);
        assert_eq!(order.total_display(), "₹181.00");
    }

    #[test]
    fn test_booking_time_round_trip() {
        let json = r#"{
            "id": 7, "user_id": null, "name": "Ravi", "email": "ravi@example.in",
            "phone": "99", "guests": 4, "date": "2026-12-24", "time": "19:30:00",
            "status": "pending", "created_at": "2026-03-01T10:15:00Z"
        }"#;
        let booking: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(booking.time_display(), "19:30");
        assert_eq!(booking.confirmation_method, ConfirmationMethod::Email);
    }

    #[test]
    fn test_auth_session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "very-secret-token".to_string(),
            refresh_token: Some("refresh-me".to_string()),
            user: AuthUser {
                id: "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10".parse().unwrap(),
                email: Some("asha@example.in".to_string()),
            },
        };
        let output = format!("{session:?}");
        assert!(!output.contains("very-secret-token"));
        assert!(!output.contains("refresh-me"));
        assert!(output.contains("asha@example.in"));
    }
}
