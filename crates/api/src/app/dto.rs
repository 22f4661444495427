use serde::Deserialize;
use serde_json::{Value, json};

use stockwise_infra::service::{AdjustInventory, BulkRow, BulkUpload, CreateInventory, CreateProduct};
use stockwise_infra::store::StockChange;
use stockwise_inventory::{AdjustmentType, InventoryMovement, InventoryRecord, QuantityInput, UploadMode};
use stockwise_products::{Product, ProductId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

// Text fields default to empty so a missing field is reported as a
// validation error by the service instead of a body rejection.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(rename = "type", default)]
    pub product_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    pub sku: Option<String>,
}

impl From<CreateProductRequest> for CreateProduct {
    fn from(body: CreateProductRequest) -> Self {
        CreateProduct {
            product_type: body.product_type,
            brand: body.brand,
            category: body.category,
            name: body.name,
            sku: body.sku,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryRequest {
    pub product_id: String,
    pub lot_number: Option<String>,
    pub location: Option<String>,
    pub quantity: Option<QuantityInput>,
}

impl CreateInventoryRequest {
    pub fn into_command(self) -> Result<CreateInventory, axum::response::Response> {
        let product_id: ProductId = self
            .product_id
            .parse()
            .map_err(|_| errors::invalid_id("product"))?;
        Ok(CreateInventory {
            product_id,
            lot_number: self.lot_number,
            location: self.location,
            quantity: required_quantity(self.quantity)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInventoryRequest {
    pub adjustment_type: Option<String>,
    pub quantity: Option<QuantityInput>,
    pub reason: Option<String>,
}

impl AdjustInventoryRequest {
    pub fn into_command(self) -> Result<AdjustInventory, axum::response::Response> {
        Ok(AdjustInventory {
            adjustment_type: parse_adjustment_type(self.adjustment_type.as_deref().unwrap_or(""))?,
            quantity: required_quantity(self.quantity)?,
            reason: self.reason,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRowRequest {
    #[serde(rename = "type", default)]
    pub product_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    /// Kept raw so a bad cell fails its own row only.
    pub quantity: Option<Value>,
    pub lot_number: Option<String>,
    pub location: Option<String>,
}

impl BulkRowRequest {
    /// Decode one uploaded row. Shape errors become an unreadable row.
    fn read(value: Value) -> BulkRow {
        let row: BulkRowRequest = match serde_json::from_value(value) {
            Ok(row) => row,
            Err(e) => return BulkRow::unreadable(format!("row could not be read: {e}")),
        };
        let quantity = match row.quantity.map(serde_json::from_value::<QuantityInput>) {
            None => None,
            Some(Ok(q)) => Some(q),
            Some(Err(_)) => {
                return BulkRow::unreadable("quantity must be a number or a numeric string");
            }
        };
        BulkRow {
            product_type: row.product_type,
            brand: row.brand,
            category: row.category,
            name: row.name,
            quantity,
            lot_number: row.lot_number,
            location: row.location,
            unreadable: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadRequest {
    /// Rows stay untyped here and are decoded one by one.
    #[serde(default)]
    pub inventories: Vec<Value>,
    pub upload_type: Option<String>,
}

impl BulkUploadRequest {
    pub fn into_command(self) -> Result<BulkUpload, axum::response::Response> {
        let upload_type = parse_upload_type(self.upload_type.as_deref().unwrap_or(""))?;
        let rows = self.inventories.into_iter().map(BulkRowRequest::read).collect();
        Ok(BulkUpload { rows, upload_type })
    }
}

fn required_quantity(q: Option<QuantityInput>) -> Result<QuantityInput, axum::response::Response> {
    q.ok_or_else(|| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "validation_error",
            "quantity is required",
        )
    })
}

pub fn parse_adjustment_type(s: &str) -> Result<AdjustmentType, axum::response::Response> {
    match s.trim().to_ascii_uppercase().as_str() {
        "ADD" => Ok(AdjustmentType::Add),
        "SUBTRACT" => Ok(AdjustmentType::Subtract),
        "SET" => Ok(AdjustmentType::Set),
        _ => Err(errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "validation_error",
            "adjustmentType must be one of: ADD, SUBTRACT, SET",
        )),
    }
}

pub fn parse_upload_type(s: &str) -> Result<UploadMode, axum::response::Response> {
    match s.trim().to_ascii_lowercase().as_str() {
        "add" => Ok(UploadMode::Add),
        "replace" => Ok(UploadMode::Replace),
        _ => Err(errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "validation_error",
            "uploadType must be one of: add, replace",
        )),
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id.to_string(),
        "type": p.product_type,
        "brand": p.brand,
        "category": p.category,
        "name": p.name,
        "sku": p.sku,
        "createdAt": p.created_at,
    })
}

pub fn inventory_to_json(r: &InventoryRecord) -> Value {
    json!({
        "id": r.id.to_string(),
        "productId": r.product_id.to_string(),
        "lotNumber": r.lot_number,
        "location": r.location,
        "onHand": r.on_hand.get(),
        "allocated": r.allocated.get(),
        "picked": r.picked.get(),
        "available": r.available(),
        "createdAt": r.created_at,
        "updatedAt": r.updated_at,
    })
}

pub fn movement_to_json(m: &InventoryMovement) -> Value {
    json!({
        "id": m.id.to_string(),
        "inventoryId": m.inventory_id.to_string(),
        "kind": m.kind.as_str(),
        "delta": m.delta,
        "previousOnHand": m.previous_on_hand,
        "newOnHand": m.new_on_hand,
        "reason": m.reason,
        "actor": m.actor,
        "occurredAt": m.occurred_at,
    })
}

pub fn stock_change_to_json(change: &StockChange) -> Value {
    json!({
        "action": change.action.as_str(),
        "inventory": inventory_to_json(&change.record),
        "delta": change.reconciliation.delta,
    })
}
