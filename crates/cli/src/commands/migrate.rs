//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! millets-cli migrate sessions
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the session
//!   store (falls back to `DATABASE_URL`)

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use millets_storefront::config::{ConfigError, database_url_from_env};
use millets_storefront::db;

/// Errors from migration commands.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the `tower_sessions.session` table used by the storefront.
///
/// Safe to run repeatedly.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the database rejects
/// the schema statements.
pub async fn sessions() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url_from_env("STOREFRONT_DATABASE_URL")?;

    tracing::info!("Connecting to session database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session migrations complete!");
    Ok(())
}
