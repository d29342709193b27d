//! Supplier stock synchronization endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::SyncReport;
use domain::Sku;
use order_store::{InventoryStore, OrderStore};
use serde::Deserialize;

use crate::routes::orders::AppState;

#[derive(Deserialize)]
pub struct SyncBody {
    pub skus: Vec<String>,
}

/// POST /stock/sync, pulling supplier stock levels for the given SKUs
/// into the local inventory.
///
/// The run itself never fails; SKUs the supplier could not resolve or
/// that errored are itemized in the report.
#[tracing::instrument(skip(state, body), fields(sku_count = body.skus.len()))]
pub async fn sync<O: OrderStore + Clone + 'static, I: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, I>>>,
    Json(body): Json<SyncBody>,
) -> Json<SyncReport> {
    let skus: Vec<Sku> = body.skus.into_iter().map(Sku::from).collect();
    Json(state.sync.sync_stocks(&skus).await)
}
