//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{RepositoryError, ZoneRepository};
use crate::models::Zone;

/// The active zone list is cached under a single key.
const ACTIVE_ZONES: &str = "active";

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    zones: Cache<&'static str, Arc<Vec<Zone>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let zones = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.zone_cache_ttl)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                zones,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Active service zones, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the zones have to be reloaded and the
    /// query fails.
    pub async fn active_zones(&self) -> Result<Arc<Vec<Zone>>, RepositoryError> {
        if let Some(zones) = self.inner.zones.get(ACTIVE_ZONES).await {
            return Ok(zones);
        }

        let zones = Arc::new(ZoneRepository::new(self.pool()).list(true).await?);
        self.inner
            .zones
            .insert(ACTIVE_ZONES, Arc::clone(&zones))
            .await;
        Ok(zones)
    }

    /// Drop the cached zone list after an admin edit.
    pub async fn invalidate_zones(&self) {
        self.inner.zones.invalidate(ACTIVE_ZONES).await;
    }
}
