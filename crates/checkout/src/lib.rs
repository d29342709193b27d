//! Checkout workflow for the dropship order backend.
//!
//! This crate owns the write side of the system: taking a validated
//! cart through payment capture, supplier placement, durable order
//! persistence, and notification, in that order. It also carries the
//! two read-side companions: lazy enrichment of stored orders with
//! upstream payment/supplier state, and supplier-to-local stock sync.
//!
//! The cardinal rule is that captured money is never lost silently.
//! Failures before capture abort with nothing written; failures after
//! capture still produce a stored order and an operator alert.

pub mod attempt;
pub mod error;
pub mod orchestrator;
pub mod reader;
pub mod request;
pub mod services;
pub mod sync;

pub use attempt::{CheckoutOutcome, CheckoutReceipt, CheckoutStep, StepRecord, StepStatus};
pub use error::{CheckoutError, Result};
pub use orchestrator::{CheckoutConfig, CheckoutOrchestrator};
pub use reader::OrderReader;
pub use request::CheckoutRequest;
pub use services::notification::{
    InMemoryNotifier, NotificationError, NotificationGateway, OperatorAlert, SentConfirmation,
};
pub use services::payment::{
    Capture, CaptureRequest, InMemoryPaymentGateway, PaymentClient, PaymentError, TransactionInfo,
};
pub use services::supplier::{
    InMemorySupplier, Placement, PlacementRequest, StockReport, SupplierClient, SupplierError,
    SupplierOrderInfo,
};
pub use sync::{InventorySync, SkuFailure, SyncReport};
