//! Status and choice enums for restaurant entities.
//!
//! Each enum serializes to the exact string stored on the data platform and
//! round-trips through `Display`/`FromStr` so it can travel through HTML
//! forms unchanged.

use serde::{Deserialize, Serialize};

/// Account role stored in the `users` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular diner. The fallback whenever a role cannot be determined.
    #[default]
    Customer,
    /// Restaurant staff with access to the admin console.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Lifecycle status of a food order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Placed, awaiting the kitchen. Cash-on-delivery orders start here.
    #[default]
    #[serde(rename = "pending")]
    Pending,
    /// Prepaid at checkout. Only ever assigned when the order is created.
    #[serde(rename = "paid")]
    Paid,
    /// Being prepared.
    #[serde(rename = "in process")]
    InProcess,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "delivered")]
    Delivered,
}

impl OrderStatus {
    /// Statuses staff may move an order to from the admin console.
    pub const ADMIN_SETTABLE: [Self; 4] = [
        Self::Pending,
        Self::InProcess,
        Self::Cancelled,
        Self::Delivered,
    ];

    /// Initial status for a new order paid with `method`.
    #[must_use]
    pub const fn initial_for(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cod => Self::Pending,
            _ => Self::Paid,
        }
    }

    /// Parse a status submitted by the admin console.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown values and for `paid`, which cannot be
    /// set after creation.
    pub fn parse_admin_transition(s: &str) -> Result<Self, String> {
        let status: Self = s.parse()?;
        if Self::ADMIN_SETTABLE.contains(&status) {
            Ok(status)
        } else {
            Err(format!("status cannot be set by staff: {s}"))
        }
    }

    /// Stable stored value, also used as a CSS class suffix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::InProcess => "in process",
            Self::Cancelled => "cancelled",
            Self::Delivered => "delivered",
        }
    }

    /// Slug form without spaces, for CSS classes.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::InProcess => "in-process",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "in process" => Ok(Self::InProcess),
            "cancelled" => Ok(Self::Cancelled),
            "delivered" => Ok(Self::Delivered),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer intends to pay. Recorded only; no payment is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    Cod,
    Card,
    #[serde(rename = "UPI")]
    Upi,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    /// All methods in the order the checkout form lists them.
    pub const ALL: [Self; 5] = [
        Self::Cod,
        Self::Card,
        Self::Upi,
        Self::NetBanking,
        Self::Wallet,
    ];

    /// Human label for the checkout form.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::Card => "Credit / Debit Card",
            Self::Upi => "UPI",
            Self::NetBanking => "Net Banking",
            Self::Wallet => "Wallet",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "COD"),
            Self::Card => write!(f, "Card"),
            Self::Upi => write!(f, "UPI"),
            Self::NetBanking => write!(f, "NetBanking"),
            Self::Wallet => write!(f, "Wallet"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::Cod),
            "Card" => Ok(Self::Card),
            "UPI" => Ok(Self::Upi),
            "NetBanking" => Ok(Self::NetBanking),
            "Wallet" => Ok(Self::Wallet),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Whether the order is delivered or collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeliveryMethod {
    #[default]
    Delivery,
    Takeaway,
}

impl DeliveryMethod {
    /// Delivery orders need an address and pincode.
    #[must_use]
    pub const fn requires_address(&self) -> bool {
        matches!(self, Self::Delivery)
    }
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "Delivery"),
            Self::Takeaway => write!(f, "Takeaway"),
        }
    }
}

impl std::str::FromStr for DeliveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Delivery" => Ok(Self::Delivery),
            "Takeaway" => Ok(Self::Takeaway),
            _ => Err(format!("invalid delivery method: {s}")),
        }
    }
}

/// Table booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How a guest wants their booking confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMethod {
    #[default]
    Email,
    Phone,
}

impl std::fmt::Display for ConfirmationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

impl std::str::FromStr for ConfirmationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            _ => Err(format!("invalid confirmation method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_and_default() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Customer.to_string(), "customer");
        assert_eq!(Role::default(), Role::Customer);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_order_status_stored_values() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::InProcess).unwrap(),
            "\"in process\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(parsed, OrderStatus::Delivered);
        assert_eq!(OrderStatus::InProcess.slug(), "in-process");
    }

    #[test]
    fn test_admin_transition_accepts_fixed_set() {
        for status in OrderStatus::ADMIN_SETTABLE {
            assert_eq!(
                OrderStatus::parse_admin_transition(status.as_str()).unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_admin_transition_rejects_others() {
        assert!(OrderStatus::parse_admin_transition("paid").is_err());
        assert!(OrderStatus::parse_admin_transition("shipped").is_err());
        assert!(OrderStatus::parse_admin_transition("Pending").is_err());
        assert!(OrderStatus::parse_admin_transition("").is_err());
    }

    #[test]
    fn test_initial_status_by_payment_method() {
        assert_eq!(OrderStatus::initial_for(PaymentMethod::Cod), OrderStatus::Pending);
        assert_eq!(OrderStatus::initial_for(PaymentMethod::Upi), OrderStatus::Paid);
        assert_eq!(OrderStatus::initial_for(PaymentMethod::Card), OrderStatus::Paid);
    }

    #[test]
    fn test_payment_method_form_values() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), method);
        }
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"COD\"");
    }

    #[test]
    fn test_delivery_requires_address() {
        assert!(DeliveryMethod::Delivery.requires_address());
        assert!(!DeliveryMethod::Takeaway.requires_address());
        assert!("Pickup".parse::<DeliveryMethod>().is_err());
    }

    #[test]
    fn test_booking_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            "phone".parse::<ConfirmationMethod>().unwrap(),
            ConfirmationMethod::Phone
        );
    }
}
