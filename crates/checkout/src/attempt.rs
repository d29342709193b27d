//! Checkout attempt outcome and step records.

use common::{AttemptId, OrderId};
use serde::{Deserialize, Serialize};

/// Workflow phases of one checkout attempt, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Input checks before any external call.
    Validate,

    /// Payment capture against the processor.
    CapturePayment,

    /// Fulfillment order placement with the supplier.
    PlaceSupplierOrder,

    /// Durable write of the order record.
    PersistOrder,

    /// Confirmation or operator notification.
    Notify,
}

impl CheckoutStep {
    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Validate => "validate",
            CheckoutStep::CapturePayment => "capture_payment",
            CheckoutStep::PlaceSupplierOrder => "place_supplier_order",
            CheckoutStep::PersistOrder => "persist_order",
            CheckoutStep::Notify => "notify",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a workflow phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The phase did what it set out to do.
    Completed,

    /// The phase failed; the detail carries the error.
    Failed,
}

/// Recorded outcome of one workflow phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// The phase that ran.
    pub step: CheckoutStep,

    /// How it ended.
    pub status: StepStatus,

    /// Step detail: an id on success, the error text on failure.
    pub detail: Option<String>,
}

impl StepRecord {
    /// Records a completed step with no detail.
    pub fn completed(step: CheckoutStep) -> Self {
        Self {
            step,
            status: StepStatus::Completed,
            detail: None,
        }
    }

    /// Records a completed step carrying an id or similar detail.
    pub fn completed_with(step: CheckoutStep, detail: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Completed,
            detail: Some(detail.into()),
        }
    }

    /// Records a failed step with the error text.
    pub fn failed(step: CheckoutStep, error: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            detail: Some(error.into()),
        }
    }
}

/// Terminal state of a checkout attempt.
///
/// Attempts that never get past payment terminate as
/// `PaymentFailedNoOrder` and surface as an error with no receipt, so
/// a receipt only ever carries the other two outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutOutcome {
    /// Payment captured, supplier order placed, record stored.
    Completed,

    /// Payment never succeeded; nothing durable was written.
    PaymentFailedNoOrder,

    /// Payment captured but placement failed; the order is stored
    /// awaiting fulfillment and the operator has been alerted.
    PartialFailureNotified,
}

impl CheckoutOutcome {
    /// Returns true when the attempt left a durable order behind.
    pub fn created_order(&self) -> bool {
        matches!(
            self,
            CheckoutOutcome::Completed | CheckoutOutcome::PartialFailureNotified
        )
    }

    /// Returns the outcome name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutOutcome::Completed => "Completed",
            CheckoutOutcome::PaymentFailedNoOrder => "PaymentFailedNoOrder",
            CheckoutOutcome::PartialFailureNotified => "PartialFailureNotified",
        }
    }
}

impl std::fmt::Display for CheckoutOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the caller gets back from a checkout that produced an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    /// Correlates logs and alerts for this attempt.
    pub attempt_id: AttemptId,

    /// The stored order.
    pub order_id: OrderId,

    /// How the attempt ended.
    pub outcome: CheckoutOutcome,

    /// Every phase that ran, in order.
    pub steps: Vec<StepRecord>,
}
