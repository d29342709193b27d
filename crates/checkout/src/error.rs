//! Checkout error taxonomy.

use common::OrderId;
use domain::DomainError;
use order_store::StoreError;
use thiserror::Error;

use crate::services::{PaymentError, SupplierError};

/// Errors surfaced by the checkout workflow and its read paths.
///
/// Capture-phase failures abort before anything durable is written.
/// Placement-phase failures never do: the captured payment obliges a
/// stored order, so they reach callers only through resumed placements
/// and operator alerts, not from `place_order` itself.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Invalid input, rejected before any external call.
    #[error("bad request: {0}")]
    BadRequest(#[from] DomainError),

    /// The processor refused the charge. Not retried.
    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    /// The processor stayed unreachable through the attempt budget.
    #[error("payment gateway unavailable: {0}")]
    PaymentGatewayUnavailable(String),

    /// The supplier refused the placement.
    #[error("supplier rejected the order: {0}")]
    SupplierRejected(String),

    /// The supplier could not be reached.
    #[error("supplier unavailable: {0}")]
    SupplierUnavailable(String),

    /// An enrichment fetch failed; the cached view stays unloaded.
    #[error("upstream lookup failed: {0}")]
    UpstreamLookupFailed(String),

    /// The requested order does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The order or inventory store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The detached checkout task could not be joined.
    #[error("checkout task failed: {0}")]
    TaskFailed(String),
}

impl CheckoutError {
    /// Maps a capture-phase gateway failure onto the taxonomy.
    pub(crate) fn from_capture(error: PaymentError) -> Self {
        match error {
            PaymentError::Declined(reason) => CheckoutError::PaymentDeclined(reason),
            PaymentError::Unavailable(reason) => CheckoutError::PaymentGatewayUnavailable(reason),
            PaymentError::NotFound(id) => {
                CheckoutError::PaymentGatewayUnavailable(format!("unexpected reply: {id} not found"))
            }
        }
    }

    /// Maps a placement-phase supplier failure onto the taxonomy.
    pub(crate) fn from_placement(error: SupplierError) -> Self {
        match error {
            SupplierError::Rejected(reason) => CheckoutError::SupplierRejected(reason),
            SupplierError::Unavailable(reason) => CheckoutError::SupplierUnavailable(reason),
            SupplierError::NotFound(id) => {
                CheckoutError::SupplierUnavailable(format!("unexpected reply: {id} not found"))
            }
        }
    }

    /// Wraps any enrichment fetch failure as a lookup failure.
    pub(crate) fn lookup(error: impl std::fmt::Display) -> Self {
        CheckoutError::UpstreamLookupFailed(error.to_string())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
