use async_trait::async_trait;
use common::OrderId;
use domain::{Fulfillment, OrderDraft, OrderRecord, PaymentView, Sku, SupplierView};

use crate::{OrderQuery, Result};

/// Persistence boundary for order records.
///
/// The store offers create, lookup, listing, and field-level updates.
/// Nothing here requires more than single-row atomicity; the checkout
/// workflow deliberately never spans rows in one transaction.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order, assigning its id and creation timestamp.
    async fn create(&self, draft: OrderDraft) -> Result<OrderRecord>;

    /// Fetches an order by id, including any persisted views.
    ///
    /// Returns None if the order doesn't exist.
    async fn find(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists orders newest first according to the query.
    async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>>;

    /// Replaces the supplier-side state of an existing order.
    ///
    /// Used when a resumed placement succeeds for an awaiting order.
    async fn set_fulfillment(&self, id: OrderId, fulfillment: &Fulfillment) -> Result<()>;

    /// Persists a fetched supplier view so later loads start warm.
    async fn save_supplier_view(&self, id: OrderId, view: &SupplierView) -> Result<()>;

    /// Persists a fetched payment view so later loads start warm.
    async fn save_payment_view(&self, id: OrderId, view: &PaymentView) -> Result<()>;
}

/// Persistence boundary for per-SKU stock levels.
///
/// Every operation touches exactly one row; SKUs are unrelated and must
/// never contend on a store-wide write lock.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns the stored quantity for a SKU.
    ///
    /// Returns None if no inventory row exists (unknown, not zero).
    async fn level(&self, sku: &Sku) -> Result<Option<u32>>;

    /// Upserts the quantity for a SKU (last write wins).
    async fn set_quantity(&self, sku: &Sku, quantity: u32) -> Result<()>;

    /// Adds `delta` to a SKU's quantity, flooring at zero.
    ///
    /// Returns the new quantity. Fails with `SkuNotFound` if no row
    /// exists for the SKU.
    async fn adjust_quantity(&self, sku: &Sku, delta: i64) -> Result<u32>;
}
