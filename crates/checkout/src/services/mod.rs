//! External collaborator contracts and their in-memory doubles.

pub mod notification;
pub mod payment;
pub mod supplier;

pub use notification::{
    InMemoryNotifier, NotificationError, NotificationGateway, OperatorAlert, SentConfirmation,
};
pub use payment::{
    Capture, CaptureRequest, InMemoryPaymentGateway, PaymentClient, PaymentError, TransactionInfo,
};
pub use supplier::{
    InMemorySupplier, Placement, PlacementRequest, StockReport, SupplierClient, SupplierError,
    SupplierOrderInfo,
};
