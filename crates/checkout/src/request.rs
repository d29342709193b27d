//! Checkout submission payload.

use domain::{BillingAddress, LineItem, Money, OrderOwner, ShippingAddress};
use serde::{Deserialize, Serialize};

/// A checkout as submitted by the storefront.
///
/// Carries everything the workflow needs up front: the cart snapshot,
/// both addresses, the payment nonce, and the amount to capture. The
/// same payload is embedded verbatim in operator alerts so a failed
/// placement can be replayed by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Who is purchasing.
    pub owner: OrderOwner,

    /// Line items to order.
    pub items: Vec<LineItem>,

    /// Delivery address for the supplier placement.
    pub shipping: ShippingAddress,

    /// Billing address for the payment capture.
    pub billing: BillingAddress,

    /// Single-use token produced by the payment form.
    pub payment_nonce: String,

    /// Total to capture.
    pub amount: Money,

    /// Recipient for the order confirmation. Required for guests.
    pub contact_email: Option<String>,
}
