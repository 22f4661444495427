//! Persistent state for the catalog, inventory records and the movement ledger.
//!
//! Two backends share the [`InventoryStore`] trait: an in-memory store for
//! tests/dev and a Postgres store for production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use r#trait::{InventoryStore, InventorySummary, StockChange, StoreError};
