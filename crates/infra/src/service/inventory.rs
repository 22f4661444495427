//! Inventory write paths: manual adjustment, single create and bulk upload.
//!
//! All three parse their input into an [`Adjustment`] and hand it to the store,
//! which runs the reconciliation rule and writes the ledger entry atomically.
//! Nothing here computes an on-hand quantity itself.

use serde::Serialize;
use tracing::instrument;

use stockwise_core::{InventoryId, ProductId};
use stockwise_inventory::{
    AdjustmentType, InventoryMovement, InventoryRecord, MovementKind, MovementRequest,
    QuantityInput, StockAction, StockKey, UploadMode,
};
use stockwise_products::CatalogKey;

use crate::store::{InventoryStore, StockChange};

use super::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustInventory {
    pub adjustment_type: AdjustmentType,
    pub quantity: QuantityInput,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateInventory {
    pub product_id: ProductId,
    pub lot_number: Option<String>,
    pub location: Option<String>,
    pub quantity: QuantityInput,
}

/// One parsed spreadsheet row. Fields are raw; validation happens per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRow {
    pub product_type: String,
    pub brand: String,
    pub category: String,
    pub name: String,
    pub quantity: Option<QuantityInput>,
    pub lot_number: Option<String>,
    pub location: Option<String>,
    /// Set when the row could not be read at all (wrong JSON shape). The row
    /// is reported as a validation failure and the rest of the batch proceeds.
    pub unreadable: Option<String>,
}

impl BulkRow {
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self {
            unreadable: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpload {
    pub rows: Vec<BulkRow>,
    pub upload_type: UploadMode,
}

/// A row that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRowOutcome {
    /// 1-based position in the uploaded batch.
    pub row: usize,
    pub product_id: ProductId,
    pub inventory_id: InventoryId,
    pub action: StockAction,
    pub previous: i64,
    pub on_hand: i64,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRowError {
    pub row: usize,
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadReport {
    pub processed: usize,
    pub failed: usize,
    pub inventories: Vec<BulkRowOutcome>,
    pub errors: Vec<BulkRowError>,
}

/// Lot and location used when a request leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDefaults {
    pub lot_number: String,
    pub location: String,
}

impl Default for StockDefaults {
    fn default() -> Self {
        Self {
            lot_number: "DEFAULT".to_string(),
            location: "MAIN".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InventoryService<S> {
    store: S,
    defaults: StockDefaults,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(store: S, defaults: StockDefaults) -> Self {
        Self { store, defaults }
    }

    pub async fn get(&self, id: InventoryId) -> Result<InventoryRecord, ServiceError> {
        self.store
            .get_inventory(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("inventory record {id}")))
    }

    pub async fn list(&self) -> Result<Vec<InventoryRecord>, ServiceError> {
        Ok(self.store.list_inventory().await?)
    }

    /// Ledger for one record, oldest first. Unknown ids are not found.
    pub async fn movements(&self, id: InventoryId) -> Result<Vec<InventoryMovement>, ServiceError> {
        self.get(id).await?;
        Ok(self.store.list_movements(id).await?)
    }

    #[instrument(skip(self, input), fields(inventory_id = %id, mode = ?input.adjustment_type), err)]
    pub async fn adjust(
        &self,
        id: InventoryId,
        input: AdjustInventory,
        actor: &str,
    ) -> Result<InventoryRecord, ServiceError> {
        let reason = input
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ServiceError::validation("reason is required"))?;
        let amount = input.quantity.parse()?;
        let request = MovementRequest::new(MovementKind::Adjusted, actor).with_reason(reason);

        let change = self
            .store
            .adjust(id, input.adjustment_type.with(amount), &request)
            .await?;
        log_change(&change);
        Ok(change.record)
    }

    /// Add stock to a product's lot/location, opening the record when missing.
    #[instrument(skip(self, input), fields(product_id = %input.product_id), err)]
    pub async fn create(
        &self,
        input: CreateInventory,
        actor: &str,
    ) -> Result<StockChange, ServiceError> {
        let amount = input.quantity.parse()?;
        let key = self.stock_key(
            input.product_id,
            input.lot_number.as_deref(),
            input.location.as_deref(),
        )?;
        let request = MovementRequest::new(MovementKind::Received, actor);

        let change = self
            .store
            .upsert(&key, UploadMode::Add.with(amount), &request)
            .await?;
        log_change(&change);
        Ok(change)
    }

    /// Apply every row independently; failures are collected, never propagated.
    #[instrument(skip(self, upload), fields(rows = upload.rows.len(), mode = ?upload.upload_type))]
    pub async fn bulk_upload(&self, upload: BulkUpload, actor: &str) -> BulkUploadReport {
        let mut report = BulkUploadReport::default();

        for (index, row) in upload.rows.iter().enumerate() {
            let row_number = index + 1;
            match self.apply_row(row, upload.upload_type, actor).await {
                Ok(change) => {
                    report.processed += 1;
                    report.inventories.push(BulkRowOutcome::new(row_number, &change));
                }
                Err(err) => {
                    tracing::warn!(row = row_number, error = %err, "bulk upload row rejected");
                    report.failed += 1;
                    report.errors.push(BulkRowError {
                        row: row_number,
                        error: err.code(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            failed = report.failed,
            "bulk upload finished"
        );
        report
    }

    async fn apply_row(
        &self,
        row: &BulkRow,
        mode: UploadMode,
        actor: &str,
    ) -> Result<StockChange, ServiceError> {
        if let Some(message) = &row.unreadable {
            return Err(ServiceError::validation(message.clone()));
        }
        let catalog_key = CatalogKey::new(&row.product_type, &row.brand, &row.category, &row.name)?;
        let amount = row
            .quantity
            .as_ref()
            .ok_or_else(|| ServiceError::validation("quantity is required"))?
            .parse()?;

        let product = self
            .store
            .find_product(&catalog_key)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("no product matches {catalog_key}")))?;

        let key = self.stock_key(product.id, row.lot_number.as_deref(), row.location.as_deref())?;
        let request = MovementRequest::new(MovementKind::BulkUpload, actor);
        let change = self.store.upsert(&key, mode.with(amount), &request).await?;
        log_change(&change);
        Ok(change)
    }

    fn stock_key(
        &self,
        product_id: ProductId,
        lot_number: Option<&str>,
        location: Option<&str>,
    ) -> Result<StockKey, ServiceError> {
        let lot = or_default(lot_number, &self.defaults.lot_number);
        let location = or_default(location, &self.defaults.location);
        Ok(StockKey::new(product_id, lot, location)?)
    }
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(default)
}

fn log_change(change: &StockChange) {
    tracing::info!(
        inventory_id = %change.record.id,
        action = change.action.as_str(),
        previous = change.reconciliation.previous.get(),
        on_hand = change.reconciliation.on_hand.get(),
        delta = change.reconciliation.delta,
        "inventory reconciled"
    );
}

impl BulkRowOutcome {
    fn new(row: usize, change: &StockChange) -> Self {
        Self {
            row,
            product_id: change.record.product_id,
            inventory_id: change.record.id,
            action: change.action,
            previous: change.reconciliation.previous.get(),
            on_hand: change.reconciliation.on_hand.get(),
            delta: change.reconciliation.delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use stockwise_inventory::Quantity;
    use stockwise_products::{NewProduct, Product};

    use super::*;
    use crate::store::InMemoryInventoryStore;

    type Service = InventoryService<Arc<InMemoryInventoryStore>>;

    async fn setup() -> (Service, Product) {
        let store = Arc::new(InMemoryInventoryStore::new());
        let product = NewProduct::new(
            CatalogKey::new("Premium", "LENE", "L2", "Premium Lene Product L2").unwrap(),
            None,
        )
        .into_product(Utc::now());
        let product = store.insert_product(product).await.unwrap();
        (InventoryService::new(store, StockDefaults::default()), product)
    }

    fn n(v: i64) -> QuantityInput {
        QuantityInput::Integer(v)
    }

    fn lene_row(quantity: QuantityInput) -> BulkRow {
        BulkRow {
            product_type: "Premium".into(),
            brand: "LENE".into(),
            category: "L2".into(),
            name: "Premium Lene Product L2".into(),
            quantity: Some(quantity),
            ..BulkRow::default()
        }
    }

    fn upload(rows: Vec<BulkRow>, mode: UploadMode) -> BulkUpload {
        BulkUpload {
            rows,
            upload_type: mode,
        }
    }

    async fn create(svc: &Service, product: &Product, qty: i64) -> StockChange {
        svc.create(
            CreateInventory {
                product_id: product.id,
                lot_number: None,
                location: None,
                quantity: n(qty),
            },
            "tester",
        )
        .await
        .unwrap()
    }

    fn adjust(mode: AdjustmentType, qty: QuantityInput) -> AdjustInventory {
        AdjustInventory {
            adjustment_type: mode,
            quantity: qty,
            reason: Some("cycle count".into()),
        }
    }

    #[tokio::test]
    async fn bulk_add_creates_then_accumulates() {
        let (svc, product) = setup().await;

        let first = svc.bulk_upload(upload(vec![lene_row(n(100))], UploadMode::Add), "ops").await;
        assert_eq!(first.processed, 1);
        assert_eq!(first.failed, 0);
        assert_eq!(first.inventories[0].action, StockAction::Created);
        assert_eq!(first.inventories[0].on_hand, 100);
        assert_eq!(first.inventories[0].product_id, product.id);

        let second = svc.bulk_upload(upload(vec![lene_row(n(100))], UploadMode::Add), "ops").await;
        let outcome = &second.inventories[0];
        assert_eq!(outcome.action, StockAction::Updated);
        assert_eq!(outcome.inventory_id, first.inventories[0].inventory_id);
        assert_eq!(outcome.previous, 100);
        assert_eq!(outcome.on_hand, 200);
        assert_eq!(outcome.delta, 100);

        let record = svc.get(outcome.inventory_id).await.unwrap();
        assert_eq!(record.lot_number, "DEFAULT");
        assert_eq!(record.location, "MAIN");
    }

    #[tokio::test]
    async fn bulk_replace_is_idempotent() {
        let (svc, _) = setup().await;
        for _ in 0..3 {
            let report = svc
                .bulk_upload(upload(vec![lene_row(n(75))], UploadMode::Replace), "ops")
                .await;
            assert_eq!(report.inventories[0].on_hand, 75);
        }
        let records = svc.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].on_hand, Quantity::new(75).unwrap());
    }

    #[tokio::test]
    async fn bad_rows_do_not_abort_the_batch() {
        let (svc, _) = setup().await;
        let rows = vec![
            lene_row(n(10)),
            BulkRow {
                brand: "lene".into(),
                ..lene_row(n(5))
            },
            lene_row(QuantityInput::Number(2.5)),
            BulkRow {
                category: "  ".into(),
                ..lene_row(n(1))
            },
            BulkRow {
                quantity: None,
                ..lene_row(n(0))
            },
            lene_row(n(-4)),
            BulkRow {
                brand: " LENE ".into(),
                ..lene_row(QuantityInput::Text("15".into()))
            },
            BulkRow::unreadable("quantity must be a number or a numeric string"),
        ];

        let report = svc.bulk_upload(upload(rows, UploadMode::Add), "ops").await;
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 6);
        assert_eq!(
            report.errors.iter().map(|e| (e.row, e.error)).collect::<Vec<_>>(),
            vec![
                (2, "not_found"),
                (3, "validation_error"),
                (4, "validation_error"),
                (5, "validation_error"),
                (6, "validation_error"),
                (8, "validation_error"),
            ]
        );
        assert_eq!(report.errors[5].message, "quantity must be a number or a numeric string");
        assert_eq!(report.inventories[1].row, 7);
        assert_eq!(report.inventories[1].on_hand, 25);
    }

    #[tokio::test]
    async fn report_serializes_camel_case() {
        let (svc, _) = setup().await;
        let rows = vec![lene_row(n(3)), lene_row(n(-1))];
        let report = svc.bulk_upload(upload(rows, UploadMode::Add), "ops").await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["processed"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["inventories"][0]["action"], "created");
        assert_eq!(json["inventories"][0]["onHand"], 3);
        assert!(json["inventories"][0]["inventoryId"].is_string());
        assert_eq!(json["errors"][0]["row"], 2);
        assert_eq!(json["errors"][0]["error"], "validation_error");
    }

    #[tokio::test]
    async fn bulk_rows_can_target_lots_and_locations() {
        let (svc, _) = setup().await;
        let rows = vec![
            BulkRow {
                lot_number: Some("LOT-9".into()),
                location: Some("DOCK".into()),
                ..lene_row(n(3))
            },
            lene_row(n(4)),
        ];
        let report = svc.bulk_upload(upload(rows, UploadMode::Add), "ops").await;
        assert_eq!(report.processed, 2);
        assert_ne!(report.inventories[0].inventory_id, report.inventories[1].inventory_id);
    }

    #[tokio::test]
    async fn create_opens_then_adds() {
        let (svc, product) = setup().await;

        let first = create(&svc, &product, 40).await;
        assert_eq!(first.action, StockAction::Created);
        assert_eq!(first.record.on_hand, Quantity::new(40).unwrap());

        let second = create(&svc, &product, 10).await;
        assert_eq!(second.action, StockAction::Updated);
        assert_eq!(second.record.on_hand, Quantity::new(50).unwrap());
        assert_eq!(second.movement.kind, MovementKind::Received);
    }

    #[tokio::test]
    async fn create_for_unknown_product_is_not_found() {
        let (svc, _) = setup().await;
        let err = svc
            .create(
                CreateInventory {
                    product_id: ProductId::new(),
                    lot_number: None,
                    location: None,
                    quantity: n(1),
                },
                "tester",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn adjust_applies_each_mode() {
        let (svc, product) = setup().await;
        let id = create(&svc, &product, 10).await.record.id;

        let r = svc.adjust(id, adjust(AdjustmentType::Add, n(20)), "ops").await.unwrap();
        assert_eq!(r.on_hand.get(), 30);
        let r = svc.adjust(id, adjust(AdjustmentType::Subtract, n(5)), "ops").await.unwrap();
        assert_eq!(r.on_hand.get(), 25);
        let r = svc.adjust(id, adjust(AdjustmentType::Set, n(7)), "ops").await.unwrap();
        assert_eq!(r.on_hand.get(), 7);

        let ledger = svc.movements(id).await.unwrap();
        assert_eq!(
            ledger.iter().map(|m| m.delta).collect::<Vec<_>>(),
            vec![10, 20, -5, -18]
        );
        assert!(ledger[1..].iter().all(|m| m.kind == MovementKind::Adjusted));
        assert_eq!(ledger[3].reason.as_deref(), Some("cycle count"));
        assert_eq!(ledger[3].actor, "ops");
    }

    #[tokio::test]
    async fn subtract_below_zero_is_rejected_without_side_effects() {
        let (svc, product) = setup().await;
        let id = create(&svc, &product, 10).await.record.id;

        let err = svc
            .adjust(id, adjust(AdjustmentType::Subtract, n(15)), "ops")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(svc.get(id).await.unwrap().on_hand.get(), 10);
        assert_eq!(svc.movements(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn adjust_requires_reason_and_whole_quantity() {
        let (svc, product) = setup().await;
        let id = create(&svc, &product, 10).await.record.id;

        let mut no_reason = adjust(AdjustmentType::Add, n(1));
        no_reason.reason = Some("   ".into());
        assert_eq!(
            svc.adjust(id, no_reason, "ops").await.unwrap_err(),
            ServiceError::validation("reason is required")
        );

        let fractional = adjust(AdjustmentType::Add, QuantityInput::Number(1.5));
        assert!(matches!(
            svc.adjust(id, fractional, "ops").await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(svc.movements(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let (svc, _) = setup().await;
        let id = InventoryId::new();
        assert!(matches!(
            svc.adjust(id, adjust(AdjustmentType::Add, n(1)), "ops").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(svc.movements(id).await, Err(ServiceError::NotFound(_))));
    }
}
