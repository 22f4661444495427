use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use stockwise_core::{InventoryId, ProductId};
use stockwise_inventory::{
    Adjustment, InventoryMovement, InventoryRecord, MovementRequest, Quantity, StockAction,
    StockKey, reconcile,
};
use stockwise_products::{CatalogKey, Product};

use super::r#trait::{InventoryStore, InventorySummary, StockChange, StoreError};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    records: BTreeMap<InventoryId, InventoryRecord>,
    by_key: HashMap<StockKey, InventoryId>,
    movements: Vec<InventoryMovement>,
}

/// In-memory store for tests/dev.
///
/// A single `RwLock` guards all state, so a reconciliation (read on-hand,
/// compute, write record, append movement) runs entirely under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }
}

impl State {
    fn apply(
        &mut self,
        id: InventoryId,
        action: StockAction,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory record {id}")))?;

        let reconciliation = reconcile(record.on_hand, adjustment)?;
        let now = Utc::now();
        record.on_hand = reconciliation.on_hand;
        record.updated_at = now;
        let record = record.clone();

        let entry = movement.record(id, action, &reconciliation, now);
        self.movements.push(entry.clone());

        Ok(StockChange {
            record,
            action,
            reconciliation,
            movement: entry,
        })
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        let mut state = self.write()?;
        let key = product.catalog_key();
        if state.products.values().any(|p| key.matches(p)) {
            return Err(StoreError::Conflict(format!("product already exists: {key}")));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn find_product(&self, key: &CatalogKey) -> Result<Option<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .values()
            .find(|p| key.matches(p))
            .cloned())
    }

    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>, StoreError> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        Ok(self.read()?.records.values().cloned().collect())
    }

    async fn list_movements(&self, id: InventoryId) -> Result<Vec<InventoryMovement>, StoreError> {
        Ok(self
            .read()?
            .movements
            .iter()
            .filter(|m| m.inventory_id == id)
            .cloned()
            .collect())
    }

    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        self.write()?.apply(id, StockAction::Updated, adjustment, movement)
    }

    async fn upsert(
        &self,
        key: &StockKey,
        adjustment: Adjustment,
        movement: &MovementRequest,
    ) -> Result<StockChange, StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&key.product_id) {
            return Err(StoreError::NotFound(format!("product {}", key.product_id)));
        }

        if let Some(id) = state.by_key.get(key).copied() {
            return state.apply(id, StockAction::Updated, adjustment, movement);
        }

        // Validate before inserting so a rejected change leaves no empty record behind.
        reconcile(Quantity::ZERO, adjustment)?;
        let record = InventoryRecord::open(key.clone(), Quantity::ZERO, Utc::now());
        let id = record.id;
        state.by_key.insert(key.clone(), id);
        state.records.insert(id, record);
        state.apply(id, StockAction::Created, adjustment, movement)
    }

    async fn summary(&self) -> Result<InventorySummary, StoreError> {
        let state = self.read()?;
        let mut summary = InventorySummary {
            product_count: state.products.len() as u64,
            record_count: state.records.len() as u64,
            ..InventorySummary::default()
        };
        for r in state.records.values() {
            add_total(&mut summary.total_on_hand, r.on_hand.get(), "total on hand")?;
            add_total(&mut summary.total_allocated, r.allocated.get(), "total allocated")?;
            add_total(&mut summary.total_picked, r.picked.get(), "total picked")?;
            add_total(&mut summary.total_available, r.available(), "total available")?;
            if r.available() <= 0 {
                summary.depleted_records += 1;
            }
        }
        Ok(summary)
    }
}

/// Same outcome as the `::BIGINT` cast in the Postgres summary: a total that
/// does not fit in 64 bits is an error, never a wrapped value.
fn add_total(total: &mut i64, value: i64, what: &str) -> Result<(), StoreError> {
    *total = total
        .checked_add(value)
        .ok_or_else(|| StoreError::Database(format!("{what} is out of range")))?;
    Ok(())
}
