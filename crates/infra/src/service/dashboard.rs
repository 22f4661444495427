use std::time::Duration;

use tracing::instrument;

use crate::cache::AnalyticsCache;
use crate::store::{InventoryStore, InventorySummary};

use super::ServiceError;

pub const SUMMARY_CACHE_KEY: &str = "dashboard.summary";

/// Dashboard analytics served through the read-through cache.
#[derive(Debug)]
pub struct DashboardService<S> {
    store: S,
    cache: AnalyticsCache<InventorySummary>,
}

impl<S: InventoryStore> DashboardService<S> {
    pub fn new(store: S, ttl: Duration, capacity: usize) -> Self {
        Self {
            store,
            cache: AnalyticsCache::new(ttl, capacity),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn summary(&self) -> Result<InventorySummary, ServiceError> {
        self.cache
            .get_or_try_insert_with(SUMMARY_CACHE_KEY, || async {
                self.store.summary().await.map_err(ServiceError::from)
            })
            .await
    }
}
