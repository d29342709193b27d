//! Mail gateway contract and in-memory double.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{AttemptId, OrderId};
use domain::{LineItem, OrderRecord};
use thiserror::Error;

use crate::request::CheckoutRequest;

/// Failures surfaced by the mail boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The message could not be handed to the mail provider.
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Operator-facing alert raised when checkout cannot finish cleanly.
#[derive(Debug, Clone)]
pub enum OperatorAlert {
    /// Payment was captured but the supplier placement failed. The
    /// full payload travels with the alert so the order can be placed
    /// by hand without digging through logs.
    PlacementFailed {
        attempt_id: AttemptId,
        request: CheckoutRequest,
        transaction_id: String,
        error: String,
        line_items: Vec<LineItem>,
    },

    /// The order confirmation could not be sent to the buyer.
    ConfirmationFailed {
        order_id: OrderId,
        recipient: String,
        error: String,
    },
}

impl OperatorAlert {
    /// Returns the payment transaction id for placement alerts.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            OperatorAlert::PlacementFailed { transaction_id, .. } => Some(transaction_id),
            OperatorAlert::ConfirmationFailed { .. } => None,
        }
    }
}

/// Contract for transactional mail.
///
/// Both calls are fire-and-log from the orchestrator's point of view:
/// a delivery failure never changes a stored order or a receipt.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Sends the order confirmation to the buyer.
    async fn order_confirmation(
        &self,
        order: &OrderRecord,
        recipient: &str,
    ) -> Result<(), NotificationError>;

    /// Sends an alert to the operator inbox.
    async fn operator_alert(&self, alert: &OperatorAlert) -> Result<(), NotificationError>;
}

/// A confirmation recorded by the in-memory notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    /// The confirmed order.
    pub order_id: OrderId,

    /// Where the confirmation went.
    pub recipient: String,
}

#[derive(Debug, Default)]
struct NotifierState {
    confirmations: Vec<SentConfirmation>,
    alerts: Vec<OperatorAlert>,
    fail_confirmations: bool,
    fail_alerts: bool,
}

/// In-memory notifier for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<NotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures confirmation sends to fail.
    pub fn set_fail_confirmations(&self, fail: bool) {
        self.state.write().unwrap().fail_confirmations = fail;
    }

    /// Configures operator alerts to fail.
    pub fn set_fail_alerts(&self, fail: bool) {
        self.state.write().unwrap().fail_alerts = fail;
    }

    /// Returns the number of delivered confirmations.
    pub fn confirmation_count(&self) -> usize {
        self.state.read().unwrap().confirmations.len()
    }

    /// Returns the number of delivered operator alerts.
    pub fn alert_count(&self) -> usize {
        self.state.read().unwrap().alerts.len()
    }

    /// Returns the delivered confirmations.
    pub fn confirmations(&self) -> Vec<SentConfirmation> {
        self.state.read().unwrap().confirmations.clone()
    }

    /// Returns the delivered operator alerts.
    pub fn alerts(&self) -> Vec<OperatorAlert> {
        self.state.read().unwrap().alerts.clone()
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotifier {
    async fn order_confirmation(
        &self,
        order: &OrderRecord,
        recipient: &str,
    ) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();

        if state.fail_confirmations {
            return Err(NotificationError::Delivery(
                "smtp connection refused".to_string(),
            ));
        }
        state.confirmations.push(SentConfirmation {
            order_id: order.id(),
            recipient: recipient.to_string(),
        });
        Ok(())
    }

    async fn operator_alert(&self, alert: &OperatorAlert) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();

        if state.fail_alerts {
            return Err(NotificationError::Delivery(
                "smtp connection refused".to_string(),
            ));
        }
        state.alerts.push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{Fulfillment, OrderDraft, OrderOwner, ShippingAddress};

    fn order() -> OrderRecord {
        let draft = OrderDraft {
            owner: OrderOwner::Anonymous,
            payment_transaction_id: "tx_1".to_string(),
            fulfillment: Fulfillment::fulfilled("sup_1"),
            products: vec![LineItem::new("SKU1", 2)],
            shipping: ShippingAddress {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                country: "GB".to_string(),
                postal_code: "SW1".to_string(),
                locality: "London".to_string(),
                address: "1 Analytical Way".to_string(),
                phone: "+44 1234".to_string(),
            },
            contact_email: Some("ada@example.com".to_string()),
        };
        OrderRecord::new(OrderId::new(1), draft, Utc::now())
    }

    #[tokio::test]
    async fn confirmation_is_recorded() {
        let notifier = InMemoryNotifier::new();

        notifier
            .order_confirmation(&order(), "ada@example.com")
            .await
            .unwrap();

        assert_eq!(notifier.confirmation_count(), 1);
        let sent = &notifier.confirmations()[0];
        assert_eq!(sent.order_id, OrderId::new(1));
        assert_eq!(sent.recipient, "ada@example.com");
    }

    #[tokio::test]
    async fn failed_confirmation_records_nothing() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail_confirmations(true);

        let result = notifier.order_confirmation(&order(), "ada@example.com").await;

        assert!(matches!(result, Err(NotificationError::Delivery(_))));
        assert_eq!(notifier.confirmation_count(), 0);
    }

    #[tokio::test]
    async fn alert_is_recorded_with_its_transaction_id() {
        let notifier = InMemoryNotifier::new();
        let alert = OperatorAlert::ConfirmationFailed {
            order_id: OrderId::new(3),
            recipient: "ada@example.com".to_string(),
            error: "smtp down".to_string(),
        };

        notifier.operator_alert(&alert).await.unwrap();

        assert_eq!(notifier.alert_count(), 1);
        assert_eq!(notifier.alerts()[0].transaction_id(), None);
    }
}
