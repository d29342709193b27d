//! Checkout workflow orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::AttemptId;
use common::OrderId;
use domain::{Fulfillment, OrderDraft, OrderOwner, OrderRecord, Sku};
use order_store::{InventoryStore, OrderStore};
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::attempt::{CheckoutOutcome, CheckoutReceipt, CheckoutStep, StepRecord};
use crate::error::CheckoutError;
use crate::request::CheckoutRequest;
use crate::services::notification::{NotificationError, NotificationGateway, OperatorAlert};
use crate::services::payment::{Capture, CaptureRequest, PaymentClient, PaymentError};
use crate::services::supplier::{Placement, PlacementRequest, SupplierClient, SupplierError};

/// Tuning for the workflow's external calls.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Upper bound applied to every payment, supplier, and mail call.
    pub call_timeout: Duration,

    /// Total capture attempts while the gateway is unavailable.
    pub capture_attempts: u32,

    /// Fixed delay between capture attempts.
    pub capture_backoff: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            capture_attempts: 3,
            capture_backoff: Duration::from_millis(200),
        }
    }
}

/// Drives a checkout attempt end to end.
///
/// The workflow runs Validate, Capture, Place, Persist, Notify in
/// order. Capture and placement are never parallel: placement only
/// makes sense for a captured payment. A capture-phase failure aborts
/// with nothing written; from the first successful capture onwards the
/// attempt always persists exactly one order, even when the supplier
/// fails, and escalates partial failures to the operator by mail
/// instead of attempting an automatic refund.
pub struct CheckoutOrchestrator<O, I, P, S, N>
where
    O: OrderStore,
    I: InventoryStore,
    P: PaymentClient,
    S: SupplierClient,
    N: NotificationGateway,
{
    orders: Arc<O>,
    inventory: Arc<I>,
    payment: Arc<P>,
    supplier: Arc<S>,
    notifier: Arc<N>,
    config: CheckoutConfig,
    resume_gates: Arc<Mutex<HashMap<OrderId, Arc<Mutex<()>>>>>,
}

impl<O, I, P, S, N> Clone for CheckoutOrchestrator<O, I, P, S, N>
where
    O: OrderStore,
    I: InventoryStore,
    P: PaymentClient,
    S: SupplierClient,
    N: NotificationGateway,
{
    fn clone(&self) -> Self {
        Self {
            orders: Arc::clone(&self.orders),
            inventory: Arc::clone(&self.inventory),
            payment: Arc::clone(&self.payment),
            supplier: Arc::clone(&self.supplier),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
            resume_gates: Arc::clone(&self.resume_gates),
        }
    }
}

impl<O, I, P, S, N> CheckoutOrchestrator<O, I, P, S, N>
where
    O: OrderStore + 'static,
    I: InventoryStore + 'static,
    P: PaymentClient + 'static,
    S: SupplierClient + 'static,
    N: NotificationGateway + 'static,
{
    /// Creates an orchestrator with default tuning.
    pub fn new(orders: O, inventory: I, payment: P, supplier: S, notifier: N) -> Self {
        Self::with_config(
            orders,
            inventory,
            payment,
            supplier,
            notifier,
            CheckoutConfig::default(),
        )
    }

    /// Creates an orchestrator with explicit tuning.
    pub fn with_config(
        orders: O,
        inventory: I,
        payment: P,
        supplier: S,
        notifier: N,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            orders: Arc::new(orders),
            inventory: Arc::new(inventory),
            payment: Arc::new(payment),
            supplier: Arc::new(supplier),
            notifier: Arc::new(notifier),
            config,
            resume_gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Executes a checkout attempt.
    ///
    /// Returns a receipt when an order was stored, which includes the
    /// partial-failure path where the supplier placement failed after
    /// a successful capture. Payment-phase failures return an error
    /// and leave no trace beyond logs and metrics.
    #[tracing::instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_order(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let attempt_id = AttemptId::new();
        let started = std::time::Instant::now();

        // 1. Validate before any external call. A payment attempt is
        // never spent on input we can reject locally.
        if let Err(error) = self.validate(&request).await {
            tracing::warn!(%attempt_id, %error, "checkout rejected before any external call");
            return Err(error);
        }
        let steps = vec![StepRecord::completed(CheckoutStep::Validate)];

        // The rest runs on its own task: once capture succeeds, the
        // obligation to record the order outlives the caller. Dropping
        // the request future must not abandon captured money.
        let worker = self.clone();
        let attempt = tokio::spawn(
            worker
                .run_attempt(attempt_id, request, steps, started)
                .in_current_span(),
        );
        match attempt.await {
            Ok(result) => result,
            Err(error) => Err(CheckoutError::TaskFailed(error.to_string())),
        }
    }

    async fn run_attempt(
        self,
        attempt_id: AttemptId,
        request: CheckoutRequest,
        mut steps: Vec<StepRecord>,
        started: std::time::Instant,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        // 2. Capture payment. Failure here is the one place the whole
        // attempt aborts without a durable write.
        let capture_request = CaptureRequest {
            nonce: request.payment_nonce.clone(),
            amount: request.amount,
            billing: request.billing.clone(),
        };
        let capture = match self.capture_with_retry(&capture_request).await {
            Ok(capture) => capture,
            Err(error) => {
                metrics::counter!("checkout_payment_failed").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::warn!(
                    %attempt_id,
                    outcome = %CheckoutOutcome::PaymentFailedNoOrder,
                    %error,
                    "payment capture failed, nothing recorded"
                );
                return Err(error);
            }
        };
        steps.push(StepRecord::completed_with(
            CheckoutStep::CapturePayment,
            capture.transaction_id.clone(),
        ));
        tracing::info!(%attempt_id, transaction_id = %capture.transaction_id, "payment captured");

        // 3. Place the supplier order, single shot. Money is committed
        // from here on, so a failure must still leave a stored,
        // operator-visible order rather than roll anything back.
        let placement_request = PlacementRequest {
            line_items: request.items.clone(),
            shipping: request.shipping.clone(),
        };
        let (fulfillment, placement_error) = match self.place_once(&placement_request).await {
            Ok(placement) => {
                steps.push(StepRecord::completed_with(
                    CheckoutStep::PlaceSupplierOrder,
                    placement.supplier_order_id.clone(),
                ));
                (Fulfillment::fulfilled(placement.supplier_order_id), None)
            }
            Err(error) => {
                let error = CheckoutError::from_placement(error);
                steps.push(StepRecord::failed(
                    CheckoutStep::PlaceSupplierOrder,
                    error.to_string(),
                ));
                (Fulfillment::awaiting(error.to_string()), Some(error))
            }
        };

        // 4. Persist exactly one order, whichever way placement went.
        let draft = OrderDraft {
            owner: request.owner,
            payment_transaction_id: capture.transaction_id.clone(),
            fulfillment,
            products: request.items.clone(),
            shipping: request.shipping.clone(),
            contact_email: request.contact_email.clone(),
        };
        let record = match self.orders.create(draft).await {
            Ok(record) => record,
            Err(error) => {
                tracing::error!(
                    %attempt_id,
                    transaction_id = %capture.transaction_id,
                    %error,
                    "captured payment could not be recorded"
                );
                return Err(error.into());
            }
        };
        steps.push(StepRecord::completed_with(
            CheckoutStep::PersistOrder,
            record.id().to_string(),
        ));

        // 5. Notify and settle the terminal outcome. Both mails are
        // fire-and-log: a delivery failure never alters the order.
        let outcome = match placement_error {
            None => {
                steps.push(self.send_confirmation(&record).await);
                self.decrement_stock(&record).await;
                metrics::counter!("checkout_completed").increment(1);
                CheckoutOutcome::Completed
            }
            Some(error) => {
                let alert = OperatorAlert::PlacementFailed {
                    attempt_id,
                    transaction_id: capture.transaction_id.clone(),
                    error: error.to_string(),
                    line_items: record.products().to_vec(),
                    request,
                };
                self.send_operator_alert(&alert).await;
                steps.push(StepRecord::completed(CheckoutStep::Notify));
                metrics::counter!("checkout_partial_failures").increment(1);
                tracing::warn!(
                    %attempt_id,
                    order_id = %record.id(),
                    transaction_id = %capture.transaction_id,
                    %error,
                    "supplier placement failed after capture, operator alerted"
                );
                CheckoutOutcome::PartialFailureNotified
            }
        };

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        tracing::info!(%attempt_id, order_id = %record.id(), %outcome, duration, "checkout finished");

        Ok(CheckoutReceipt {
            attempt_id,
            order_id: record.id(),
            outcome,
            steps,
        })
    }

    /// Retries supplier placement for an order left awaiting fulfillment.
    ///
    /// Uses the stored snapshot, never re-captures payment, and is a
    /// no-op for orders that are already fulfilled. On another failure
    /// the stored error is refreshed and the failure is returned.
    ///
    /// Concurrent resumes of the same order serialize on a per-order
    /// gate; races through the awaiting check would otherwise place
    /// duplicate supplier orders against one captured payment. The
    /// loser of the race re-reads the record, sees it fulfilled, and
    /// no-ops.
    #[tracing::instrument(skip(self))]
    pub async fn resume_fulfillment(&self, order_id: OrderId) -> Result<OrderRecord, CheckoutError> {
        let gate = self.resume_gate(order_id).await;
        let _held = gate.lock().await;
        let result = self.resume_locked(order_id).await;
        self.drop_resume_gate(order_id).await;
        result
    }

    async fn resume_locked(&self, order_id: OrderId) -> Result<OrderRecord, CheckoutError> {
        let mut record = self
            .orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::NotFound(order_id))?;

        if record.is_fulfilled() {
            tracing::info!(%order_id, "order already fulfilled, nothing to resume");
            return Ok(record);
        }

        let placement_request = PlacementRequest {
            line_items: record.products().to_vec(),
            shipping: record.shipping().clone(),
        };
        match self.place_once(&placement_request).await {
            Ok(placement) => {
                let fulfillment = Fulfillment::fulfilled(placement.supplier_order_id);
                self.orders.set_fulfillment(order_id, &fulfillment).await?;
                record.set_fulfillment(fulfillment);
                self.decrement_stock(&record).await;
                tracing::info!(
                    %order_id,
                    supplier_order_id = ?record.supplier_order_id(),
                    "awaiting order fulfilled on resume"
                );
                Ok(record)
            }
            Err(error) => {
                let error = CheckoutError::from_placement(error);
                let fulfillment = Fulfillment::awaiting(error.to_string());
                self.orders.set_fulfillment(order_id, &fulfillment).await?;
                tracing::warn!(%order_id, %error, "resumed placement failed again");
                Err(error)
            }
        }
    }

    async fn resume_gate(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        let mut gates = self.resume_gates.lock().await;
        gates.entry(order_id).or_default().clone()
    }

    async fn drop_resume_gate(&self, order_id: OrderId) {
        let mut gates = self.resume_gates.lock().await;
        gates.remove(&order_id);
    }

    /// Rejects invalid submissions before any external call is made.
    /// Availability is checked against the summed quantity per SKU, so
    /// a cart that splits one product across several lines cannot slip
    /// past the stock check line by line.
    async fn validate(&self, request: &CheckoutRequest) -> Result<(), CheckoutError> {
        if request.items.is_empty() {
            return Err(domain::DomainError::EmptyLineItems.into());
        }
        if matches!(request.owner, OrderOwner::Guest(_)) && request.contact_email.is_none() {
            return Err(domain::DomainError::MissingContactEmail.into());
        }
        let mut required: HashMap<&Sku, u32> = HashMap::new();
        for item in &request.items {
            if item.quantity == 0 {
                return Err(domain::DomainError::InvalidQuantity {
                    reference: item.reference.to_string(),
                }
                .into());
            }
            *required.entry(&item.reference).or_default() += item.quantity;
        }
        for (reference, requested) in required {
            let available = self
                .inventory
                .level(reference)
                .await?
                .ok_or_else(|| domain::DomainError::UnknownSku {
                    reference: reference.to_string(),
                })?;
            if available < requested {
                return Err(domain::DomainError::InsufficientStock {
                    reference: reference.to_string(),
                    requested,
                    available,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Captures with the bounded retry policy: declines return
    /// immediately, only gateway unavailability is retried.
    async fn capture_with_retry(
        &self,
        request: &CaptureRequest,
    ) -> Result<Capture, CheckoutError> {
        let attempts = self.config.capture_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.capture_once(request).await {
                Ok(capture) => return Ok(capture),
                Err(PaymentError::Unavailable(reason)) if attempt < attempts => {
                    tracing::warn!(attempt, %reason, "payment capture attempt failed, retrying");
                    tokio::time::sleep(self.config.capture_backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(CheckoutError::from_capture(error)),
            }
        }
    }

    async fn capture_once(&self, request: &CaptureRequest) -> Result<Capture, PaymentError> {
        match tokio::time::timeout(self.config.call_timeout, self.payment.capture(request)).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Unavailable(format!(
                "capture timed out after {:?}",
                self.config.call_timeout
            ))),
        }
    }

    async fn place_once(&self, request: &PlacementRequest) -> Result<Placement, SupplierError> {
        match tokio::time::timeout(self.config.call_timeout, self.supplier.place_order(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SupplierError::Unavailable(format!(
                "placement timed out after {:?}",
                self.config.call_timeout
            ))),
        }
    }

    /// Sends the confirmation, escalating a failed send to the operator.
    async fn send_confirmation(&self, record: &OrderRecord) -> StepRecord {
        let Some(recipient) = record.contact_email() else {
            tracing::info!(order_id = %record.id(), "order has no contact email, confirmation skipped");
            return StepRecord::completed_with(CheckoutStep::Notify, "no recipient");
        };

        let send = self.notifier.order_confirmation(record, recipient);
        let result = match tokio::time::timeout(self.config.call_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Delivery(format!(
                "confirmation timed out after {:?}",
                self.config.call_timeout
            ))),
        };
        match result {
            Ok(()) => StepRecord::completed_with(CheckoutStep::Notify, recipient),
            Err(error) => {
                tracing::warn!(order_id = %record.id(), %error, "confirmation send failed");
                let alert = OperatorAlert::ConfirmationFailed {
                    order_id: record.id(),
                    recipient: recipient.to_string(),
                    error: error.to_string(),
                };
                self.send_operator_alert(&alert).await;
                StepRecord::failed(CheckoutStep::Notify, error.to_string())
            }
        }
    }

    async fn send_operator_alert(&self, alert: &OperatorAlert) {
        let send = self.notifier.operator_alert(alert);
        match tokio::time::timeout(self.config.call_timeout, send).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::error!(%error, "operator alert could not be delivered");
            }
            Err(_) => tracing::error!("operator alert timed out"),
        }
    }

    /// Applies the stock side effect for a fulfilled order, one row at
    /// a time. A failed row is logged and skipped, never fatal.
    async fn decrement_stock(&self, record: &OrderRecord) {
        for item in record.products() {
            let delta = -i64::from(item.quantity);
            if let Err(error) = self.inventory.adjust_quantity(&item.reference, delta).await {
                tracing::warn!(
                    order_id = %record.id(),
                    sku = %item.reference,
                    %error,
                    "stock decrement failed"
                );
            }
        }
    }
}
