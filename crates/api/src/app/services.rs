//! Storage selection and service wiring.
//!
//! `USE_PERSISTENT_STORES=true` selects Postgres (schema migrated on startup);
//! otherwise everything lives in process memory.

use std::sync::Arc;

use anyhow::Context;

use stockwise_infra::AppConfig;
use stockwise_infra::service::{CatalogService, DashboardService, InventoryService, StockDefaults};
use stockwise_infra::store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};

pub type SharedStore = Arc<dyn InventoryStore>;

pub struct AppServices {
    pub catalog: CatalogService<SharedStore>,
    pub inventory: InventoryService<SharedStore>,
    pub dashboard: DashboardService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, config: &AppConfig) -> Self {
        let defaults = StockDefaults {
            lot_number: config.default_lot_number.clone(),
            location: config.default_location.clone(),
        };
        Self {
            catalog: CatalogService::new(store.clone()),
            inventory: InventoryService::new(store.clone(), defaults),
            dashboard: DashboardService::new(
                store,
                config.analytics_cache_ttl,
                config.analytics_cache_capacity,
            ),
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(Arc::new(InMemoryInventoryStore::new()), config)
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if !config.use_persistent_stores {
            tracing::info!("using in-memory stores");
            return Ok(Self::in_memory(config));
        }

        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
        let store = PostgresInventoryStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        tracing::info!(
            max_connections = config.database_max_connections,
            "using postgres stores"
        );
        Ok(Self::new(Arc::new(store), config))
    }
}
