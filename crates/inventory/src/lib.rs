//! Inventory domain module.
//!
//! This crate contains the business rules for on-hand quantities, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! reconciliation rule in [`reconcile`] is the single place where a new on-hand
//! quantity is computed; every write path calls it.

pub mod movement;
pub mod quantity;
pub mod reconcile;
pub mod record;

pub use movement::{InventoryMovement, MovementKind, MovementRequest};
pub use quantity::{Quantity, QuantityInput};
pub use reconcile::{Adjustment, AdjustmentType, Reconciliation, UploadMode, reconcile};
pub use record::{InventoryRecord, StockAction, StockKey};
pub use stockwise_core::{InventoryId, MovementId};
