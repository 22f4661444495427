use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use stockwise_core::{DomainError, InventoryId, ProductId};
use stockwise_inventory::{
    Adjustment, InventoryMovement, InventoryRecord, MovementRequest, Reconciliation, StockAction,
    StockKey,
};
use stockwise_products::{CatalogKey, Product};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The reconciliation rule rejected the change; nothing was written.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),
}

/// Result of a successful on-hand write: the record after the change, whether
/// it was created, the computed quantities, and the ledger entry written with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub record: InventoryRecord,
    pub action: StockAction,
    pub reconciliation: Reconciliation,
    pub movement: InventoryMovement,
}

/// Aggregate quantities for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub product_count: u64,
    pub record_count: u64,
    pub total_on_hand: i64,
    pub total_allocated: i64,
    pub total_picked: i64,
    pub total_available: i64,
    /// Records whose available quantity is zero or below.
    pub depleted_records: u64,
}

/// Storage for products, inventory records and movements.
///
/// ## Atomicity
///
/// `adjust` and `upsert` must run the reconciliation rule, update the record and
/// append the movement as one unit: either all three happen or none do. The
/// current on-hand must be read under the same lock/transaction as the write so
/// concurrent adjustments to one record serialize instead of racing.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert a product. A product with the same catalog key is a conflict.
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Find the product identified by `key` (trimmed, case-sensitive match).
    async fn find_product(&self, key: &CatalogKey) -> Result<Option<Product>, StoreError>;

    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>, StoreError>;

    async fn list_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    /// Ledger entries for one record, oldest first.
    async fn list_movements(&self, id: InventoryId) -> Result<Vec<InventoryMovement>, StoreError>;

    /// Apply `adjustment` to an existing record.
    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError>;

    /// Apply `adjustment` to the record for `key`, opening it first when missing.
    ///
    /// A missing record starts from zero on-hand, so `Add(n)` and `Set(n)` both
    /// open it with `n`.
    async fn upsert(
        &self,
        key: &StockKey,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError>;

    async fn summary(&self) -> Result<InventorySummary, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for std::sync::Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        (**self).insert_product(product).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn find_product(&self, key: &CatalogKey) -> Result<Option<Product>, StoreError> {
        (**self).find_product(key).await
    }

    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>, StoreError> {
        (**self).get_inventory(id).await
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        (**self).list_inventory().await
    }

    async fn list_movements(&self, id: InventoryId) -> Result<Vec<InventoryMovement>, StoreError> {
        (**self).list_movements(id).await
    }

    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        (**self).adjust(id, adjustment, movement).await
    }

    async fn upsert(
        &self,
        key: &StockKey,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        (**self).upsert(key, adjustment, movement).await
    }

    async fn summary(&self) -> Result<InventorySummary, StoreError> {
        (**self).summary().await
    }
}
