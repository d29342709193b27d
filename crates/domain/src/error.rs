//! Domain error types.

use thiserror::Error;

/// Violations of domain-level rules, raised before any external call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A money string could not be parsed.
    #[error("invalid money amount: {input:?}")]
    InvalidAmount { input: String },

    /// Checkout was submitted without line items.
    #[error("checkout has no line items")]
    EmptyLineItems,

    /// A line item carries a zero quantity.
    #[error("invalid quantity for {reference}: must be greater than 0")]
    InvalidQuantity { reference: String },

    /// A line item references a SKU with no local inventory row.
    #[error("unknown SKU: {reference}")]
    UnknownSku { reference: String },

    /// The local inventory cannot cover a line item.
    #[error("insufficient stock for {reference}: requested {requested}, available {available}")]
    InsufficientStock {
        reference: String,
        requested: u32,
        available: u32,
    },

    /// Guest checkouts must carry a contact email for the confirmation.
    #[error("guest checkout requires a contact email")]
    MissingContactEmail,
}
