//! Payment processor contract and in-memory double.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{BillingAddress, CardSummary, Money};
use thiserror::Error;

/// Failures surfaced by the payment processor boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The processor refused the charge. A business outcome, never retried.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The processor could not be reached or answered with a fault.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// No transaction exists under the requested id.
    #[error("transaction not found: {0}")]
    NotFound(String),
}

/// Charge submission for one checkout attempt.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Single-use token produced by the payment form.
    pub nonce: String,

    /// Amount to capture.
    pub amount: Money,

    /// Billing address submitted with the payment method.
    pub billing: BillingAddress,
}

/// Result of a successful capture.
#[derive(Debug, Clone)]
pub struct Capture {
    /// Transaction id assigned by the processor.
    pub transaction_id: String,
}

/// Transaction state as reported by the processor.
///
/// The amount arrives in the processor's decimal-string form and is
/// parsed into [`Money`] when the view is built.
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    /// Captured amount as a decimal string such as `"119.90"`.
    pub amount: String,

    /// Billing address recorded with the transaction.
    pub billing: BillingAddress,

    /// Card summary, absent for wallet-style payments.
    pub card: Option<CardSummary>,

    /// Payer email, present for wallet-style payments.
    pub payer_email: Option<String>,
}

/// Client contract for the payment processor.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Captures funds for a checkout attempt.
    async fn capture(&self, request: &CaptureRequest) -> Result<Capture, PaymentError>;

    /// Fetches the state of a previously captured transaction.
    async fn transaction(&self, transaction_id: &str) -> Result<TransactionInfo, PaymentError>;
}

#[derive(Debug, Default)]
struct GatewayState {
    transactions: HashMap<String, TransactionInfo>,
    captured_nonces: HashMap<String, String>,
    next_id: u32,
    capture_calls: u32,
    lookup_calls: u32,
    decline: bool,
    unavailable_captures: u32,
    fail_lookups: bool,
}

/// In-memory payment gateway for tests and local runs.
///
/// Mints sequential transaction ids (`tx_1`, `tx_2`, ...) and treats a
/// repeated nonce as the same capture, returning the original id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every capture.
    pub fn set_decline(&self, decline: bool) {
        self.state.write().unwrap().decline = decline;
    }

    /// Makes the next `count` captures fail as unavailable.
    pub fn fail_next_captures(&self, count: u32) {
        self.state.write().unwrap().unavailable_captures = count;
    }

    /// Configures transaction lookups to fail as unavailable.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_lookups = fail;
    }

    /// Returns the number of capture calls, including failed ones.
    pub fn capture_calls(&self) -> u32 {
        self.state.read().unwrap().capture_calls
    }

    /// Returns the number of transaction lookup calls.
    pub fn lookup_calls(&self) -> u32 {
        self.state.read().unwrap().lookup_calls
    }

    /// Returns the number of captured transactions.
    pub fn transaction_count(&self) -> usize {
        self.state.read().unwrap().transactions.len()
    }

    /// Returns true if a transaction exists with the given id.
    pub fn has_transaction(&self, transaction_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .transactions
            .contains_key(transaction_id)
    }
}

#[async_trait]
impl PaymentClient for InMemoryPaymentGateway {
    async fn capture(&self, request: &CaptureRequest) -> Result<Capture, PaymentError> {
        let mut state = self.state.write().unwrap();
        state.capture_calls += 1;

        if state.decline {
            return Err(PaymentError::Declined("card declined".to_string()));
        }
        if state.unavailable_captures > 0 {
            state.unavailable_captures -= 1;
            return Err(PaymentError::Unavailable("gateway timeout".to_string()));
        }
        if let Some(existing) = state.captured_nonces.get(&request.nonce) {
            return Ok(Capture {
                transaction_id: existing.clone(),
            });
        }

        state.next_id += 1;
        let transaction_id = format!("tx_{}", state.next_id);
        state.transactions.insert(
            transaction_id.clone(),
            TransactionInfo {
                amount: request.amount.as_decimal_string(),
                billing: request.billing.clone(),
                card: Some(CardSummary {
                    card_type: "Visa".to_string(),
                    last4: "4242".to_string(),
                }),
                payer_email: None,
            },
        );
        state
            .captured_nonces
            .insert(request.nonce.clone(), transaction_id.clone());

        Ok(Capture { transaction_id })
    }

    async fn transaction(&self, transaction_id: &str) -> Result<TransactionInfo, PaymentError> {
        let mut state = self.state.write().unwrap();
        state.lookup_calls += 1;

        if state.fail_lookups {
            return Err(PaymentError::Unavailable(
                "gateway unreachable".to_string(),
            ));
        }
        state
            .transactions
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(transaction_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn billing() -> BillingAddress {
        BillingAddress {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            country: "GB".to_string(),
            postal_code: "SW1".to_string(),
            locality: "London".to_string(),
            address_line1: "1 Analytical Way".to_string(),
            address_line2: None,
        }
    }

    fn request(nonce: &str) -> CaptureRequest {
        CaptureRequest {
            nonce: nonce.to_string(),
            amount: Money::from_cents(1999),
            billing: billing(),
        }
    }

    #[tokio::test]
    async fn capture_assigns_sequential_transaction_ids() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.capture(&request("nonce-a")).await.unwrap();
        let second = gateway.capture(&request("nonce-b")).await.unwrap();

        assert_eq!(first.transaction_id, "tx_1");
        assert_eq!(second.transaction_id, "tx_2");
        assert_eq!(gateway.transaction_count(), 2);
    }

    #[tokio::test]
    async fn repeated_nonce_returns_the_same_transaction() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.capture(&request("nonce-a")).await.unwrap();
        let second = gateway.capture(&request("nonce-a")).await.unwrap();

        assert_eq!(first.transaction_id, second.transaction_id);
        assert_eq!(gateway.transaction_count(), 1);
    }

    #[tokio::test]
    async fn declined_capture_stores_nothing() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_decline(true);

        let result = gateway.capture(&request("nonce-a")).await;

        assert!(matches!(result, Err(PaymentError::Declined(_))));
        assert_eq!(gateway.transaction_count(), 0);
        assert_eq!(gateway.capture_calls(), 1);
    }

    #[tokio::test]
    async fn gateway_recovers_after_configured_outage() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.fail_next_captures(1);

        let first = gateway.capture(&request("nonce-a")).await;
        assert!(matches!(first, Err(PaymentError::Unavailable(_))));

        let second = gateway.capture(&request("nonce-a")).await.unwrap();
        assert_eq!(second.transaction_id, "tx_1");
    }

    #[tokio::test]
    async fn transaction_lookup_returns_captured_state() {
        let gateway = InMemoryPaymentGateway::new();
        let capture = gateway.capture(&request("nonce-a")).await.unwrap();

        let info = gateway.transaction(&capture.transaction_id).await.unwrap();
        assert_eq!(info.amount, "19.99");
        assert_eq!(info.billing.first_name, "Ada");
        assert_eq!(info.card.unwrap().last4, "4242");
        assert_eq!(gateway.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let gateway = InMemoryPaymentGateway::new();
        let result = gateway.transaction("tx_404").await;
        assert!(matches!(result, Err(PaymentError::NotFound(_))));
    }
}
