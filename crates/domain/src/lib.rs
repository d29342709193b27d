//! Domain model for the dropship order backend.
//!
//! This crate provides the order-side domain types:
//! - `OrderRecord` with its tagged owner and fulfillment state
//! - Cached enrichment views of upstream payment and supplier state
//! - Value objects shared across the workspace (money, SKUs, addresses)
//! - Local stock levels consumed by inventory sync

pub mod error;
pub mod inventory;
pub mod order;

pub use error::DomainError;
pub use inventory::StockLevel;
pub use order::{
    BillingAddress, CachedView, CardSummary, CustomerId, Fulfillment, GuestId, LineItem, Money,
    OrderDraft, OrderOwner, OrderRecord, PaymentView, ShippingAddress, Sku, SupplierLine,
    SupplierView,
};
