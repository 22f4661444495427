use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, InventoryId, MovementId};

use crate::reconcile::Reconciliation;
use crate::record::StockAction;

/// Why an on-hand quantity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Record opened by create or bulk upload.
    Created,
    /// Manual adjustment.
    Adjusted,
    /// Single create against an existing record.
    Received,
    /// Bulk upload against an existing record.
    BulkUpload,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Created => "created",
            MovementKind::Adjusted => "adjusted",
            MovementKind::Received => "received",
            MovementKind::BulkUpload => "bulk_upload",
        }
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MovementKind::Created),
            "adjusted" => Ok(MovementKind::Adjusted),
            "received" => Ok(MovementKind::Received),
            "bulk_upload" => Ok(MovementKind::BulkUpload),
            other => Err(DomainError::validation(format!("unknown movement kind: {other}"))),
        }
    }
}

/// Immutable ledger entry. Written once per reconciliation, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub inventory_id: InventoryId,
    pub kind: MovementKind,
    pub delta: i64,
    pub previous_on_hand: i64,
    pub new_on_hand: i64,
    pub reason: Option<String>,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Ledger metadata supplied by the caller of a write.
///
/// Carries no timestamp: stores stamp `occurred_at` while holding the record
/// lock, so ledger time follows the order writes were applied in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    /// Kind used when the write updates an existing record.
    pub kind: MovementKind,
    pub reason: Option<String>,
    pub actor: String,
}

impl MovementRequest {
    pub fn new(kind: MovementKind, actor: impl Into<String>) -> Self {
        Self {
            kind,
            reason: None,
            actor: actor.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Build the ledger entry for a reconciliation on `inventory_id`.
    pub fn record(
        &self,
        inventory_id: InventoryId,
        action: StockAction,
        reconciliation: &Reconciliation,
        occurred_at: DateTime<Utc>,
    ) -> InventoryMovement {
        let kind = match action {
            StockAction::Created => MovementKind::Created,
            StockAction::Updated => self.kind,
        };
        InventoryMovement {
            id: MovementId::new(),
            inventory_id,
            kind,
            delta: reconciliation.delta,
            previous_on_hand: reconciliation.previous.get(),
            new_on_hand: reconciliation.on_hand.get(),
            reason: self.reason.clone(),
            actor: self.actor.clone(),
            occurred_at,
        }
    }
}
