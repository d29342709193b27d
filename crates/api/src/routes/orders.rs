//! Checkout, order read, and fulfillment resumption endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::{
    CheckoutOrchestrator, CheckoutReceipt, CheckoutRequest, InMemoryNotifier,
    InMemoryPaymentGateway, InMemorySupplier, InventorySync, OrderReader,
};
use common::OrderId;
use domain::{
    BillingAddress, CustomerId, GuestId, LineItem, Money, OrderOwner, OrderRecord, PaymentView,
    ShippingAddress, SupplierView,
};
use order_store::{InventoryStore, OrderQuery, OrderStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
///
/// The stores are generic so the same wiring serves the PostgreSQL and
/// in-memory deployments; the upstream gateways are the in-process
/// ones in both.
pub struct AppState<O, I>
where
    O: OrderStore + Clone + 'static,
    I: InventoryStore + Clone + 'static,
{
    pub orchestrator:
        CheckoutOrchestrator<O, I, InMemoryPaymentGateway, InMemorySupplier, InMemoryNotifier>,
    pub reader: OrderReader<O, InMemoryPaymentGateway, InMemorySupplier>,
    pub sync: InventorySync<InMemorySupplier, I>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub customer_id: Option<i64>,
    pub guest_id: Option<i64>,
    pub items: Vec<LineItem>,
    pub shipping: ShippingAddress,
    pub billing: BillingAddress,
    pub payment_nonce: String,
    pub amount: String,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub customer_id: Option<i64>,
    pub awaiting: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub guest_id: Option<i64>,
    pub payment_transaction_id: String,
    pub fulfillment_status: String,
    pub supplier_order_id: Option<String>,
    pub fulfillment_error: Option<String>,
    pub total_quantity: u32,
    pub contact_email: Option<String>,
    pub created_at: String,
}

impl OrderSummaryResponse {
    fn from_record(record: &OrderRecord) -> Self {
        Self {
            id: record.id().value(),
            customer_id: record.owner().customer_id().map(|c| c.value()),
            guest_id: record.owner().guest_id().map(|g| g.value()),
            payment_transaction_id: record.payment_transaction_id().to_string(),
            fulfillment_status: record.fulfillment().as_str().to_string(),
            supplier_order_id: record.supplier_order_id().map(String::from),
            fulfillment_error: record.fulfillment().failure_reason().map(String::from),
            total_quantity: record.total_quantity(),
            contact_email: record.contact_email().map(String::from),
            created_at: record.created_at().to_rfc3339(),
        }
    }
}

/// Full order detail with the lazily loaded upstream views.
///
/// A view that is unavailable (never fetched and currently failing) is
/// returned as `null` rather than failing the whole read.
#[derive(Serialize)]
pub struct OrderDetailResponse {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub guest_id: Option<i64>,
    pub payment_transaction_id: String,
    pub fulfillment_status: String,
    pub supplier_order_id: Option<String>,
    pub fulfillment_error: Option<String>,
    pub total_quantity: u32,
    pub contact_email: Option<String>,
    pub created_at: String,
    pub products: Vec<LineItem>,
    pub shipping: ShippingAddress,
    pub supplier: Option<SupplierView>,
    pub payment: Option<PaymentView>,
}

// -- Handlers --

/// POST /checkout, running one checkout attempt to its terminal state.
#[tracing::instrument(skip(state, body))]
pub async fn checkout<O: OrderStore + Clone + 'static, I: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, I>>>,
    Json(body): Json<CheckoutBody>,
) -> Result<(axum::http::StatusCode, Json<CheckoutReceipt>), ApiError> {
    let owner = match (body.customer_id, body.guest_id) {
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "customer_id and guest_id are mutually exclusive".to_string(),
            ));
        }
        (Some(id), None) => OrderOwner::Customer(CustomerId::new(id)),
        (None, Some(id)) => OrderOwner::Guest(GuestId::new(id)),
        (None, None) => OrderOwner::Anonymous,
    };

    let amount = Money::parse(&body.amount)
        .map_err(|e| ApiError::BadRequest(format!("Invalid amount: {e}")))?;

    let request = CheckoutRequest {
        owner,
        items: body.items,
        shipping: body.shipping,
        billing: body.billing,
        payment_nonce: body.payment_nonce,
        amount,
        contact_email: body.contact_email,
    };

    let receipt = state.orchestrator.place_order(request).await?;
    Ok((axum::http::StatusCode::CREATED, Json(receipt)))
}

/// GET /orders/{id}, the stored record enriched with both upstream views.
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderStore + Clone + 'static, I: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, I>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let mut record = state.reader.get(order_id).await?;

    let supplier = match state.reader.supplier_view(&mut record).await {
        Ok(view) => view.cloned(),
        Err(err) => {
            tracing::warn!(error = %err, "supplier view unavailable");
            None
        }
    };
    let payment = match state.reader.payment_view(&mut record).await {
        Ok(view) => Some(view.clone()),
        Err(err) => {
            tracing::warn!(error = %err, "payment view unavailable");
            None
        }
    };

    let summary = OrderSummaryResponse::from_record(&record);
    Ok(Json(OrderDetailResponse {
        id: summary.id,
        customer_id: summary.customer_id,
        guest_id: summary.guest_id,
        payment_transaction_id: summary.payment_transaction_id,
        fulfillment_status: summary.fulfillment_status,
        supplier_order_id: summary.supplier_order_id,
        fulfillment_error: summary.fulfillment_error,
        total_quantity: summary.total_quantity,
        contact_email: summary.contact_email,
        created_at: summary.created_at,
        products: record.products().to_vec(),
        shipping: record.shipping().clone(),
        supplier,
        payment,
    }))
}

/// GET /orders, newest first, with optional paging and filters.
#[tracing::instrument(skip(state))]
pub async fn list<O: OrderStore + Clone + 'static, I: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, I>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let mut query = OrderQuery::new();
    if let Some(page) = params.page {
        query = query.page(page);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(customer_id) = params.customer_id {
        query = query.for_customer(CustomerId::new(customer_id));
    }
    if params.awaiting.unwrap_or(false) {
        query = query.awaiting_only();
    }

    let records = state.reader.list(query).await?;
    let responses: Vec<OrderSummaryResponse> =
        records.iter().map(OrderSummaryResponse::from_record).collect();
    Ok(Json(responses))
}

/// POST /orders/{id}/resume, retrying supplier placement for an order
/// stuck awaiting fulfillment.
#[tracing::instrument(skip(state))]
pub async fn resume<O: OrderStore + Clone + 'static, I: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<O, I>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderSummaryResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let record = state.orchestrator.resume_fulfillment(order_id).await?;
    Ok(Json(OrderSummaryResponse::from_record(&record)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse::<i64>()
        .map(OrderId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
