use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockwise_core::InventoryId;
use stockwise_inventory::StockAction;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_inventory).get(list_inventory))
        .route("/bulk-upload", post(bulk_upload))
        .route("/:id", get(get_inventory))
        .route("/:id/adjust", post(adjust_inventory))
        .route("/:id/movements", get(list_movements))
}

fn parse_id(id: &str) -> Result<InventoryId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("inventory"))
}

pub async fn create_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::CreateInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let cmd = match body.map_err(errors::rejection_to_response).and_then(|Json(b)| b.into_command()) {
        Ok(c) => c,
        Err(res) => return res,
    };

    match services.inventory.create(cmd, actor.actor()).await {
        Ok(change) => {
            let status = match change.action {
                StockAction::Created => StatusCode::CREATED,
                StockAction::Updated => StatusCode::OK,
            };
            (status, Json(dto::stock_change_to_json(&change))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.inventory.list().await {
        Ok(records) => {
            let out: Vec<_> = records.iter().map(dto::inventory_to_json).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.inventory.get(id).await {
        Ok(r) => (StatusCode::OK, Json(dto::inventory_to_json(&r))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::AdjustInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let cmd = match body.map_err(errors::rejection_to_response).and_then(|Json(b)| b.into_command()) {
        Ok(c) => c,
        Err(res) => return res,
    };

    match services.inventory.adjust(id, cmd, actor.actor()).await {
        Ok(r) => (StatusCode::OK, Json(dto::inventory_to_json(&r))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.inventory.movements(id).await {
        Ok(movements) => {
            let out: Vec<_> = movements.iter().map(dto::movement_to_json).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn bulk_upload(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::BulkUploadRequest>, JsonRejection>,
) -> axum::response::Response {
    let cmd = match body.map_err(errors::rejection_to_response).and_then(|Json(b)| b.into_command()) {
        Ok(c) => c,
        Err(res) => return res,
    };

    let report = services.inventory.bulk_upload(cmd, actor.actor()).await;
    (StatusCode::OK, Json(report)).into_response()
}
