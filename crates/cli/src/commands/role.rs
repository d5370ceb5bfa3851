//! Role management commands.
//!
//! # Usage
//!
//! ```bash
//! millets-cli role set --user-id 0b6e1c9a-4f0e-4a52-9a57-2c2b1b1f3e10 --role admin
//! ```
//!
//! # Environment Variables
//!
//! - `PLATFORM_URL`, `PLATFORM_ANON_KEY`, `PLATFORM_SERVICE_KEY`

use thiserror::Error;

use millets_core::{Role, UserId};
use millets_storefront::config::{ConfigError, PlatformConfig};
use millets_storefront::platform::{DataPlatform, HostedPlatform, PlatformError};

/// Errors from role commands.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Invalid role: {0}. Valid roles: customer, admin")]
    InvalidRole(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Parse the command arguments before touching the network.
fn parse_args(user_id: &str, role: &str) -> Result<(UserId, Role), RoleError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| RoleError::InvalidUserId(user_id.to_owned()))?;
    let role: Role = role
        .trim()
        .parse()
        .map_err(|_| RoleError::InvalidRole(role.to_owned()))?;
    Ok((user_id, role))
}

/// Set the role record of an account.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, the platform configuration
/// is missing, or the platform rejects the write.
pub async fn set(user_id: &str, role: &str) -> Result<(), RoleError> {
    dotenvy::dotenv().ok();

    let (user_id, role) = parse_args(user_id, role)?;
    let platform = HostedPlatform::new(&PlatformConfig::from_env()?)?;

    tracing::info!(%user_id, %role, "Setting role");
    platform.set_role(user_id, role).await?;

    tracing::info!("Role updated");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let (user_id, role) =
            parse_args("0b6e1c9a-4f0e-4a52-9a57-2c2b1b1f3e10", "admin").unwrap();
        assert_eq!(user_id.to_string(), "0b6e1c9a-4f0e-4a52-9a57-2c2b1b1f3e10");
        assert_eq!(role, Role::Admin);

        assert!(matches!(
            parse_args("not-a-uuid", "admin"),
            Err(RoleError::InvalidUserId(_))
        ));
        assert!(matches!(
            parse_args("0b6e1c9a-4f0e-4a52-9a57-2c2b1b1f3e10", "owner"),
            Err(RoleError::InvalidRole(_))
        ));
    }
}
