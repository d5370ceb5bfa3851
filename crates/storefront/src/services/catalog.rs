//! Cached menu listings.
//!
//! Menu pages are read far more often than the admin edits them, so listings
//! are kept in a `moka` cache for a short TTL and dropped on every admin write.
//! Single-item reads always go to the platform.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use crate::platform::{DataPlatform, MenuItem, PlatformError};

/// Number of items shown on the home page.
pub const FEATURED_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CatalogKey {
    All,
    Category(String),
}

/// Menu listings cached in front of the data platform.
#[derive(Clone)]
pub struct CatalogCache {
    platform: Arc<dyn DataPlatform>,
    cache: Cache<CatalogKey, Arc<Vec<MenuItem>>>,
    /// Bumped on every invalidation; loads that straddle one are not stored.
    generation: Arc<AtomicU64>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(platform: Arc<dyn DataPlatform>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(ttl)
            .build();
        Self {
            platform,
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Menu items ordered by id, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns the platform error on a cache miss that fails to load.
    #[instrument(skip(self))]
    pub async fn list(&self, category: Option<&str>) -> Result<Arc<Vec<MenuItem>>, PlatformError> {
        let key = category.map_or(CatalogKey::All, |c| CatalogKey::Category(c.to_string()));

        if let Some(items) = self.cache.get(&key).await {
            debug!("Cache hit for menu listing");
            return Ok(items);
        }

        let seen = self.generation.load(Ordering::Acquire);
        let items = Arc::new(self.platform.list_menu(category).await?);
        self.store(key, Arc::clone(&items), seen).await;
        Ok(items)
    }

    async fn store(&self, key: CatalogKey, items: Arc<Vec<MenuItem>>, seen: u64) {
        if self.generation.load(Ordering::Acquire) != seen {
            debug!("Menu changed during load; not caching listing");
            return;
        }
        self.cache.insert(key, items).await;
    }

    /// The first few menu items, for the home page.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the menu cannot be loaded.
    pub async fn featured(&self) -> Result<Vec<MenuItem>, PlatformError> {
        let items = self.list(None).await?;
        Ok(items.iter().take(FEATURED_COUNT).cloned().collect())
    }

    /// Distinct non-empty categories in menu order.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the menu cannot be loaded.
    pub async fn categories(&self) -> Result<Vec<String>, PlatformError> {
        let items = self.list(None).await?;
        Ok(distinct_categories(&items))
    }

    /// Drop every cached listing.
    pub async fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

fn distinct_categories(items: &[MenuItem]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for item in items {
        let category = item.category.trim();
        if !category.is_empty() && !categories.iter().any(|c| c == category) {
            categories.push(category.to_string());
        }
    }
    categories
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::platform::MemoryPlatform;

    fn setup() -> (Arc<MemoryPlatform>, CatalogCache) {
        let platform = Arc::new(MemoryPlatform::new());
        platform.add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
        platform.add_menu_item("Jowar Roti", Decimal::new(60, 0), "mains");
        platform.add_menu_item("Bajra Khichdi", Decimal::new(150, 0), "mains");
        platform.add_menu_item("Foxtail Upma", Decimal::new(80, 0), "breakfast");
        platform.add_menu_item("Millet Kheer", Decimal::new(70, 0), "desserts");
        let cache = CatalogCache::new(platform.clone(), Duration::from_secs(60));
        (platform, cache)
    }

    #[tokio::test]
    async fn test_featured_takes_first_four() {
        let (_, cache) = setup();
        let featured = cache.featured().await.unwrap();
        assert_eq!(featured.len(), FEATURED_COUNT);
        assert_eq!(featured[0].name, "Ragi Dosa");
    }

    #[tokio::test]
    async fn test_categories_are_distinct_in_order() {
        let (_, cache) = setup();
        assert_eq!(
            cache.categories().await.unwrap(),
            vec!["breakfast", "mains", "desserts"]
        );
    }

    #[tokio::test]
    async fn test_listing_is_cached_until_invalidated() {
        let (platform, cache) = setup();
        assert_eq!(cache.list(Some("mains")).await.unwrap().len(), 2);

        platform.add_menu_item("Kodo Pulao", Decimal::new(160, 0), "mains");
        assert_eq!(cache.list(Some("mains")).await.unwrap().len(), 2);

        cache.invalidate_all().await;
        assert_eq!(cache.list(Some("mains")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_load_straddling_invalidation_is_not_cached() {
        let (platform, cache) = setup();
        let seen = cache.generation.load(Ordering::Acquire);
        let stale = Arc::new(platform.list_menu(Some("mains")).await.unwrap());

        platform.add_menu_item("Kodo Pulao", Decimal::new(160, 0), "mains");
        cache.invalidate_all().await;
        cache.store(CatalogKey::Category("mains".into()), stale, seen).await;

        assert_eq!(cache.list(Some("mains")).await.unwrap().len(), 3);
    }
}
