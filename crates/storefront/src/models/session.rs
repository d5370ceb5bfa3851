//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use millets_core::UserId;

/// Session-stored user identity.
///
/// The access token is re-validated with the auth service on every protected
/// request, so a revoked token stops working even while the cookie is alive.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth service user id.
    pub id: UserId,
    /// Email the user signed in with.
    pub email: String,
    /// Access token issued at sign-in.
    pub access_token: String,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the one-shot notification shown on the next page.
    pub const FLASH: &str = "flash";

    /// Key for the role last seen for the current user (navigation only).
    pub const CACHED_ROLE: &str = "cached_role";

    /// Key for the id of the booking made in this session.
    pub const LAST_BOOKING: &str = "last_booking";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_debug_redacts_token() {
        let user = CurrentUser {
            id: "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10".parse().unwrap(),
            email: "asha@example.in".to_string(),
            access_token: "eyJ-very-secret".to_string(),
        };
        let output = format!("{user:?}");
        assert!(output.contains("asha@example.in"));
        assert!(!output.contains("eyJ-very-secret"));
    }
}
