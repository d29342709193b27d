//! Read side: order lookup with lazy upstream enrichment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::OrderId;
use domain::{Money, OrderRecord, PaymentView, SupplierView};
use order_store::{OrderQuery, OrderStore};
use tokio::sync::Mutex;

use crate::error::CheckoutError;
use crate::services::payment::PaymentClient;
use crate::services::supplier::SupplierClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewKind {
    Supplier,
    Payment,
}

/// Serves stored orders and fills their upstream views on demand.
///
/// Views are fetched at most once per record instance and written back
/// to the store, so later reads of the same order start warm. Cold
/// fetches for the same order and view are single-flight: concurrent
/// readers serialize on a per-(order, view) gate and the laggards pick
/// up the stored copy instead of repeating the upstream call. A failed
/// fetch is reported to the caller and leaves the view retryable.
pub struct OrderReader<O, P, S>
where
    O: OrderStore,
    P: PaymentClient,
    S: SupplierClient,
{
    orders: O,
    payment: P,
    supplier: S,
    call_timeout: Duration,
    gates: Mutex<HashMap<(OrderId, ViewKind), Arc<Mutex<()>>>>,
}

impl<O, P, S> OrderReader<O, P, S>
where
    O: OrderStore,
    P: PaymentClient,
    S: SupplierClient,
{
    /// Creates a reader over the given store and upstream clients.
    pub fn new(orders: O, payment: P, supplier: S, call_timeout: Duration) -> Self {
        Self {
            orders,
            payment,
            supplier,
            call_timeout,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Loads one order.
    pub async fn get(&self, order_id: OrderId) -> Result<OrderRecord, CheckoutError> {
        self.orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::NotFound(order_id))
    }

    /// Lists orders without touching any upstream service.
    pub async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>, CheckoutError> {
        Ok(self.orders.list(query).await?)
    }

    /// Returns the supplier-side view of the order, fetching it on
    /// first access.
    ///
    /// Orders still awaiting fulfillment have no supplier order to look
    /// up and yield `Ok(None)`.
    #[tracing::instrument(skip(self, record), fields(order_id = %record.id()))]
    pub async fn supplier_view<'a>(
        &self,
        record: &'a mut OrderRecord,
    ) -> Result<Option<&'a SupplierView>, CheckoutError> {
        let Some(supplier_order_id) = record.supplier_order_id().map(str::to_string) else {
            return Ok(None);
        };
        if record.supplier_view().needs_fetch() {
            match self.load_supplier_view(record.id(), &supplier_order_id).await {
                Ok(view) => record.cache_supplier_view(view),
                Err(error) => {
                    record.mark_supplier_view_failed(error.to_string());
                    return Err(error);
                }
            }
        }
        Ok(record.supplier_view().loaded())
    }

    /// Returns the payment-side view of the order, fetching it on
    /// first access. Records always carry a transaction id, so a loaded
    /// view is always produced on success.
    #[tracing::instrument(skip(self, record), fields(order_id = %record.id()))]
    pub async fn payment_view<'a>(
        &self,
        record: &'a mut OrderRecord,
    ) -> Result<&'a PaymentView, CheckoutError> {
        if record.payment_view().needs_fetch() {
            let transaction_id = record.payment_transaction_id().to_string();
            match self.load_payment_view(record.id(), &transaction_id).await {
                Ok(view) => record.cache_payment_view(view),
                Err(error) => {
                    record.mark_payment_view_failed(error.to_string());
                    return Err(error);
                }
            }
        }
        record
            .payment_view()
            .loaded()
            .ok_or_else(|| CheckoutError::lookup("payment view unavailable"))
    }

    async fn load_supplier_view(
        &self,
        order_id: OrderId,
        supplier_order_id: &str,
    ) -> Result<SupplierView, CheckoutError> {
        let key = (order_id, ViewKind::Supplier);
        let gate = self.gate(key).await;
        let _held = gate.lock().await;
        let result = self.fetch_supplier_view(order_id, supplier_order_id).await;
        self.drop_gate(key).await;
        result
    }

    async fn fetch_supplier_view(
        &self,
        order_id: OrderId,
        supplier_order_id: &str,
    ) -> Result<SupplierView, CheckoutError> {
        // A concurrent reader may have fetched and saved this view
        // while the gate was held.
        if let Some(stored) = self.orders.find(order_id).await?
            && let Some(view) = stored.supplier_view().loaded()
        {
            return Ok(view.clone());
        }

        let call = self.supplier.order_info(supplier_order_id);
        let info = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(info)) => info,
            Ok(Err(error)) => return Err(CheckoutError::lookup(error)),
            Err(_) => {
                return Err(CheckoutError::lookup(format!(
                    "supplier order lookup timed out after {:?}",
                    self.call_timeout
                )));
            }
        };
        let view = SupplierView {
            id: info.id,
            status: info.status,
            shipping: info.shipping,
            products: info.lines,
        };
        if let Err(error) = self.orders.save_supplier_view(order_id, &view).await {
            tracing::warn!(%order_id, %error, "fetched supplier view could not be persisted");
        }
        Ok(view)
    }

    async fn load_payment_view(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<PaymentView, CheckoutError> {
        let key = (order_id, ViewKind::Payment);
        let gate = self.gate(key).await;
        let _held = gate.lock().await;
        let result = self.fetch_payment_view(order_id, transaction_id).await;
        self.drop_gate(key).await;
        result
    }

    async fn fetch_payment_view(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<PaymentView, CheckoutError> {
        if let Some(stored) = self.orders.find(order_id).await?
            && let Some(view) = stored.payment_view().loaded()
        {
            return Ok(view.clone());
        }

        let call = self.payment.transaction(transaction_id);
        let info = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(info)) => info,
            Ok(Err(error)) => return Err(CheckoutError::lookup(error)),
            Err(_) => {
                return Err(CheckoutError::lookup(format!(
                    "payment transaction lookup timed out after {:?}",
                    self.call_timeout
                )));
            }
        };
        // The processor reports the amount as a decimal string; a value
        // we cannot parse is as useless as no reply at all.
        let amount = Money::parse(&info.amount).map_err(CheckoutError::lookup)?;
        let view = PaymentView {
            amount,
            billing: info.billing,
            card: info.card,
            payer_email: info.payer_email,
        };
        if let Err(error) = self.orders.save_payment_view(order_id, &view).await {
            tracing::warn!(%order_id, %error, "fetched payment view could not be persisted");
        }
        Ok(view)
    }

    async fn gate(&self, key: (OrderId, ViewKind)) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        gates.entry(key).or_default().clone()
    }

    /// Removes the gate once a fetch attempt has settled. Readers that
    /// arrive later mint a fresh gate and find the stored view.
    async fn drop_gate(&self, key: (OrderId, ViewKind)) {
        self.gates.lock().await.remove(&key);
    }
}
