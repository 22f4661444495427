use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, Entity, InventoryId, ProductId};

use crate::quantity::Quantity;

/// Identity of a stock position: product + lot + location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub lot_number: String,
    pub location: String,
}

impl StockKey {
    pub fn new(product_id: ProductId, lot_number: &str, location: &str) -> DomainResult<Self> {
        let lot_number = lot_number.trim();
        let location = location.trim();
        if lot_number.is_empty() {
            return Err(DomainError::validation("lot number cannot be empty"));
        }
        if location.is_empty() {
            return Err(DomainError::validation("location cannot be empty"));
        }
        Ok(Self {
            product_id,
            lot_number: lot_number.to_string(),
            location: location.to_string(),
        })
    }
}

/// Stored quantities for one [`StockKey`].
///
/// `on_hand` is only changed through [`crate::reconcile`]; `allocated` and
/// `picked` belong to order fulfillment and are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub lot_number: String,
    pub location: String,
    pub on_hand: Quantity,
    pub allocated: Quantity,
    pub picked: Quantity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// A fresh record for `key`: nothing allocated or picked yet.
    pub fn open(key: StockKey, on_hand: Quantity, now: DateTime<Utc>) -> Self {
        Self {
            id: InventoryId::new(),
            product_id: key.product_id,
            lot_number: key.lot_number,
            location: key.location,
            on_hand,
            allocated: Quantity::ZERO,
            picked: Quantity::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey {
            product_id: self.product_id,
            lot_number: self.lot_number.clone(),
            location: self.location.clone(),
        }
    }

    /// `on_hand - allocated - picked`. Negative when on-hand was lowered below
    /// what is already committed to orders.
    pub fn available(&self) -> i64 {
        self.on_hand
            .get()
            .saturating_sub(self.allocated.get())
            .saturating_sub(self.picked.get())
    }
}

impl Entity for InventoryRecord {
    type Id = InventoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Whether a write created a new record or changed an existing one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAction {
    Created,
    Updated,
}

impl StockAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StockAction::Created => "created",
            StockAction::Updated => "updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_record_has_nothing_committed() {
        let key = StockKey::new(ProductId::new(), "LOT-1", "MAIN").unwrap();
        let rec = InventoryRecord::open(key.clone(), Quantity::new(100).unwrap(), Utc::now());
        assert_eq!(rec.key(), key);
        assert_eq!(rec.allocated, Quantity::ZERO);
        assert_eq!(rec.picked, Quantity::ZERO);
        assert_eq!(rec.available(), 100);
    }

    #[test]
    fn available_may_go_negative() {
        let key = StockKey::new(ProductId::new(), "LOT-1", "MAIN").unwrap();
        let mut rec = InventoryRecord::open(key, Quantity::new(5).unwrap(), Utc::now());
        rec.allocated = Quantity::new(4).unwrap();
        rec.picked = Quantity::new(3).unwrap();
        assert_eq!(rec.available(), -2);
    }

    #[test]
    fn stock_key_rejects_blank_lot() {
        assert!(StockKey::new(ProductId::new(), "  ", "MAIN").is_err());
        assert!(StockKey::new(ProductId::new(), "LOT", "").is_err());
    }

    #[test]
    fn stock_action_serializes_lowercase() {
        assert_eq!(serde_json::to_value(StockAction::Created).unwrap(), "created");
        assert_eq!(StockAction::Updated.as_str(), "updated");
    }
}
