//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::platform::DataPlatform;
use crate::services::{CatalogCache, StatusNotifier};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the data platform, caches and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    platform: Arc<dyn DataPlatform>,
    catalog: CatalogCache,
    notifier: StatusNotifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `platform` - Data platform client
    /// * `pool` - Session database pool, checked by the readiness probe when present
    ///
    /// # Errors
    ///
    /// Returns an error if the notifier's HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        platform: Arc<dyn DataPlatform>,
        pool: Option<PgPool>,
    ) -> Result<Self, StateError> {
        let catalog = CatalogCache::new(Arc::clone(&platform), config.catalog_cache_ttl);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let notifier = StatusNotifier::new(client, config.status_email_endpoint.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                platform,
                catalog,
                notifier,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the session database pool, if one is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get the data platform client.
    #[must_use]
    pub fn platform(&self) -> &dyn DataPlatform {
        self.inner.platform.as_ref()
    }

    /// Get the cached menu listings.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get the order status notifier.
    #[must_use]
    pub fn notifier(&self) -> &StatusNotifier {
        &self.inner.notifier
    }
}
