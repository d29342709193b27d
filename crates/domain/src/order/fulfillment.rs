//! Fulfillment state of a persisted order.

use serde::{Deserialize, Serialize};

/// Supplier-side progress of an order whose payment is already captured.
///
/// An order is persisted in one of these states and only ever moves in
/// one direction:
/// ```text
/// AwaitingFulfillment ──► Fulfilled
/// ```
/// Orders whose placement succeeded during checkout are created directly
/// as `Fulfilled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fulfillment {
    /// Payment was captured but supplier placement failed; the order
    /// needs operator or job-driven resolution.
    AwaitingFulfillment {
        /// Message captured from the failed placement attempt.
        error: String,
    },

    /// The supplier accepted the placement.
    Fulfilled {
        /// Order identifier assigned by the supplier.
        supplier_order_id: String,
    },
}

impl Fulfillment {
    /// Creates the awaiting state from a placement failure message.
    pub fn awaiting(error: impl Into<String>) -> Self {
        Fulfillment::AwaitingFulfillment {
            error: error.into(),
        }
    }

    /// Creates the fulfilled state from a supplier order id.
    pub fn fulfilled(supplier_order_id: impl Into<String>) -> Self {
        Fulfillment::Fulfilled {
            supplier_order_id: supplier_order_id.into(),
        }
    }

    /// Returns true once the supplier has accepted the order.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Fulfillment::Fulfilled { .. })
    }

    /// Returns true while supplier placement is still outstanding.
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Fulfillment::AwaitingFulfillment { .. })
    }

    /// Returns the supplier order id, if placement succeeded.
    pub fn supplier_order_id(&self) -> Option<&str> {
        match self {
            Fulfillment::Fulfilled { supplier_order_id } => Some(supplier_order_id),
            Fulfillment::AwaitingFulfillment { .. } => None,
        }
    }

    /// Returns the recorded placement failure, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Fulfillment::AwaitingFulfillment { error } => Some(error),
            Fulfillment::Fulfilled { .. } => None,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Fulfillment::AwaitingFulfillment { .. } => "AwaitingFulfillment",
            Fulfillment::Fulfilled { .. } => "Fulfilled",
        }
    }
}

impl std::fmt::Display for Fulfillment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfilled_carries_supplier_order_id() {
        let fulfillment = Fulfillment::fulfilled("sup_1");
        assert!(fulfillment.is_fulfilled());
        assert!(!fulfillment.is_awaiting());
        assert_eq!(fulfillment.supplier_order_id(), Some("sup_1"));
        assert_eq!(fulfillment.failure_reason(), None);
    }

    #[test]
    fn test_awaiting_carries_failure_reason() {
        let fulfillment = Fulfillment::awaiting("supplier unavailable");
        assert!(fulfillment.is_awaiting());
        assert!(!fulfillment.is_fulfilled());
        assert_eq!(fulfillment.supplier_order_id(), None);
        assert_eq!(fulfillment.failure_reason(), Some("supplier unavailable"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Fulfillment::awaiting("timeout").to_string(),
            "AwaitingFulfillment"
        );
        assert_eq!(Fulfillment::fulfilled("sup_1").to_string(), "Fulfilled");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let fulfillment = Fulfillment::fulfilled("sup_9");
        let json = serde_json::to_string(&fulfillment).unwrap();
        let deserialized: Fulfillment = serde_json::from_str(&json).unwrap();
        assert_eq!(fulfillment, deserialized);
    }
}
