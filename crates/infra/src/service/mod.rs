//! Application services over an [`InventoryStore`](crate::store::InventoryStore).

pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod inventory;

pub use catalog::{CatalogService, CreateProduct};
pub use dashboard::{DashboardService, SUMMARY_CACHE_KEY};
pub use error::ServiceError;
pub use inventory::{
    AdjustInventory, BulkRow, BulkRowError, BulkRowOutcome, BulkUpload, BulkUploadReport,
    CreateInventory, InventoryService, StockDefaults,
};
