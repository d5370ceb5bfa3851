//! Newtype IDs for type-safe entity references.
//!
//! Platform collections use `bigint` identity keys for restaurant data and
//! UUIDs for auth users. Use the `define_id!` macro for the former and
//! [`UserId`] for the latter.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
/// - `Display` and `FromStr`, so IDs can come straight out of URL paths
///
/// # Example
///
/// ```rust
/// # use millets_core::define_id;
/// define_id!(TableId);
/// define_id!(ShiftId);
///
/// let table = TableId::new(4);
/// assert_eq!(table.to_string(), "4");
/// assert_eq!("4".parse::<TableId>().unwrap(), table);
///
/// // These are different types, so this won't compile:
/// // let _: TableId = ShiftId::new(4);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(MenuItemId);
define_id!(CartLineId);
define_id!(OrderId);
define_id!(BookingId);
define_id!(ReviewId);

/// Identifier of an account on the platform's auth service.
///
/// Role records and profiles share this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an auth-service UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_path_segment() {
        assert_eq!("42".parse::<OrderId>().unwrap(), OrderId::new(42));
        assert_eq!(" 7 ".parse::<MenuItemId>().unwrap().as_i64(), 7);
        assert!("seven".parse::<BookingId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_number() {
        let json = serde_json::to_string(&CartLineId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: CartLineId = serde_json::from_str("9").unwrap();
        assert_eq!(back, CartLineId::new(9));
    }

    #[test]
    fn test_user_id_parse_and_display() {
        let raw = "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10";
        let id: UserId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn test_user_id_serde_is_transparent() {
        let id = UserId::new(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }
}
