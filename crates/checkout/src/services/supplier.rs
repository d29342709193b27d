//! Dropship supplier contract and in-memory double.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::{LineItem, ShippingAddress, Sku, SupplierLine};
use thiserror::Error;

/// Failures surfaced by the supplier boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupplierError {
    /// The supplier refused the order (bad SKU, out of stock, ...).
    #[error("supplier rejected the order: {0}")]
    Rejected(String),

    /// The supplier could not be reached or answered with a fault.
    #[error("supplier unavailable: {0}")]
    Unavailable(String),

    /// No supplier order exists under the requested id.
    #[error("supplier order not found: {0}")]
    NotFound(String),
}

/// Order submission to the supplier.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    /// Line items to place, exactly as captured at checkout.
    pub line_items: Vec<LineItem>,

    /// Delivery address for the shipment.
    pub shipping: ShippingAddress,
}

/// Result of a successful placement.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Order id assigned by the supplier.
    pub supplier_order_id: String,

    /// Initial supplier-side status, typically `"pending"`.
    pub status: String,
}

/// Supplier-side order state returned by an order-info lookup.
#[derive(Debug, Clone)]
pub struct SupplierOrderInfo {
    /// Order identifier on the supplier side.
    pub id: String,

    /// Current supplier-side status.
    pub status: String,

    /// Delivery address echoed by the supplier.
    pub shipping: ShippingAddress,

    /// Product lines in the supplier order.
    pub lines: Vec<SupplierLine>,
}

/// Per-SKU outcome of one stock batch call.
///
/// A requested SKU absent from both maps was not resolved by the
/// supplier; callers treat it as unknown, never as zero. Only a
/// transport-level fault fails the batch as a whole.
#[derive(Debug, Clone, Default)]
pub struct StockReport {
    /// Quantities for SKUs the supplier resolved.
    pub levels: HashMap<Sku, u32>,

    /// Per-SKU errors reported inside an otherwise successful batch.
    pub failures: HashMap<Sku, String>,
}

/// Client contract for the dropship supplier.
#[async_trait]
pub trait SupplierClient: Send + Sync {
    /// Places a fulfillment order with the supplier.
    async fn place_order(&self, request: &PlacementRequest) -> Result<Placement, SupplierError>;

    /// Fetches the current state of a placed supplier order.
    async fn order_info(&self, supplier_order_id: &str)
    -> Result<SupplierOrderInfo, SupplierError>;

    /// Fetches supplier stock levels for a batch of SKUs.
    async fn stocks(&self, skus: &[Sku]) -> Result<StockReport, SupplierError>;
}

#[derive(Debug, Default)]
struct SupplierState {
    orders: HashMap<String, SupplierOrderInfo>,
    stock: HashMap<Sku, u32>,
    broken_skus: HashMap<Sku, String>,
    next_id: u32,
    placement_calls: u32,
    info_calls: u32,
    stock_calls: u32,
    reject_placements: bool,
    unavailable_placements: bool,
    fail_info: bool,
    fail_stocks: bool,
    latency: Option<Duration>,
}

/// In-memory supplier for tests and local runs.
///
/// Mints sequential order ids (`sup_1`, `sup_2`, ...) with an initial
/// `"pending"` status and serves stock lookups from a seeded table.
#[derive(Debug, Clone, Default)]
pub struct InMemorySupplier {
    state: Arc<RwLock<SupplierState>>,
}

impl InMemorySupplier {
    /// Creates a new in-memory supplier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the supplier to reject every placement.
    pub fn set_reject_placements(&self, reject: bool) {
        self.state.write().unwrap().reject_placements = reject;
    }

    /// Configures every placement to fail as unavailable.
    pub fn set_unavailable_placements(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable_placements = unavailable;
    }

    /// Configures order-info lookups to fail as unavailable.
    pub fn set_fail_on_info(&self, fail: bool) {
        self.state.write().unwrap().fail_info = fail;
    }

    /// Configures stock batch calls to fail at the transport level.
    pub fn set_fail_on_stocks(&self, fail: bool) {
        self.state.write().unwrap().fail_stocks = fail;
    }

    /// Adds a fixed delay before every call is handled.
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap().latency = Some(latency);
    }

    /// Seeds the supplier-side stock level for a SKU.
    pub fn set_stock(&self, sku: impl Into<Sku>, quantity: u32) {
        self.state.write().unwrap().stock.insert(sku.into(), quantity);
    }

    /// Marks a SKU as failing inside stock batches with the given reason.
    pub fn set_broken_sku(&self, sku: impl Into<Sku>, reason: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .broken_skus
            .insert(sku.into(), reason.into());
    }

    /// Returns the number of placement calls, including failed ones.
    pub fn placement_calls(&self) -> u32 {
        self.state.read().unwrap().placement_calls
    }

    /// Returns the number of order-info calls, including failed ones.
    pub fn info_calls(&self) -> u32 {
        self.state.read().unwrap().info_calls
    }

    /// Returns the number of stock batch calls.
    pub fn stock_calls(&self) -> u32 {
        self.state.read().unwrap().stock_calls
    }

    /// Returns the number of placed supplier orders.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns true if a supplier order exists with the given id.
    pub fn has_order(&self, supplier_order_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .orders
            .contains_key(supplier_order_id)
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SupplierClient for InMemorySupplier {
    async fn place_order(&self, request: &PlacementRequest) -> Result<Placement, SupplierError> {
        self.simulate_latency().await;
        let mut state = self.state.write().unwrap();
        state.placement_calls += 1;

        if state.reject_placements {
            return Err(SupplierError::Rejected("out of stock".to_string()));
        }
        if state.unavailable_placements {
            return Err(SupplierError::Unavailable(
                "connection refused".to_string(),
            ));
        }

        state.next_id += 1;
        let id = format!("sup_{}", state.next_id);
        let info = SupplierOrderInfo {
            id: id.clone(),
            status: "pending".to_string(),
            shipping: request.shipping.clone(),
            lines: request
                .line_items
                .iter()
                .map(|item| SupplierLine {
                    reference: item.reference.clone(),
                    quantity: item.quantity,
                    name: None,
                })
                .collect(),
        };
        state.orders.insert(id.clone(), info);

        Ok(Placement {
            supplier_order_id: id,
            status: "pending".to_string(),
        })
    }

    async fn order_info(
        &self,
        supplier_order_id: &str,
    ) -> Result<SupplierOrderInfo, SupplierError> {
        self.simulate_latency().await;
        let mut state = self.state.write().unwrap();
        state.info_calls += 1;

        if state.fail_info {
            return Err(SupplierError::Unavailable(
                "supplier api unreachable".to_string(),
            ));
        }
        state
            .orders
            .get(supplier_order_id)
            .cloned()
            .ok_or_else(|| SupplierError::NotFound(supplier_order_id.to_string()))
    }

    async fn stocks(&self, skus: &[Sku]) -> Result<StockReport, SupplierError> {
        self.simulate_latency().await;
        let mut state = self.state.write().unwrap();
        state.stock_calls += 1;

        if state.fail_stocks {
            return Err(SupplierError::Unavailable(
                "stock api unreachable".to_string(),
            ));
        }

        let mut report = StockReport::default();
        for sku in skus {
            if let Some(reason) = state.broken_skus.get(sku) {
                report.failures.insert(sku.clone(), reason.clone());
            } else if let Some(quantity) = state.stock.get(sku) {
                report.levels.insert(sku.clone(), *quantity);
            }
        }
        Ok(report)
    }
}
