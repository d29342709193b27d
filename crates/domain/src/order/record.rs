//! Durable order record.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{
    CachedView, CustomerId, Fulfillment, GuestId, LineItem, PaymentView, ShippingAddress,
    SupplierView,
};

/// Who placed the order.
///
/// Carrying the owner as a tagged value makes "customer and guest are
/// never both set" hold by construction instead of by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderOwner {
    /// A registered customer account.
    Customer(CustomerId),

    /// A guest identified only for this purchase.
    Guest(GuestId),

    /// No owner reference was recorded.
    Anonymous,
}

impl OrderOwner {
    /// Returns the customer id for customer-owned orders.
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            OrderOwner::Customer(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the guest id for guest-owned orders.
    pub fn guest_id(&self) -> Option<GuestId> {
        match self {
            OrderOwner::Guest(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns true when no owner reference is recorded.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, OrderOwner::Anonymous)
    }
}

/// Insert payload for a new order; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    /// Who placed the order.
    pub owner: OrderOwner,

    /// Transaction id from the successful payment capture.
    pub payment_transaction_id: String,

    /// Supplier-side outcome at creation time.
    pub fulfillment: Fulfillment,

    /// Line items exactly as submitted at checkout.
    pub products: Vec<LineItem>,

    /// Delivery address submitted at checkout.
    pub shipping: ShippingAddress,

    /// Address for the order confirmation, when one is known.
    pub contact_email: Option<String>,
}

/// A placed order as persisted locally.
///
/// A record exists only once payment capture has succeeded, so the
/// payment transaction id is always present; the supplier order id
/// lives inside [`Fulfillment`] and is present only after a successful
/// placement. The two cached views hold lazily fetched upstream state
/// and are never part of equality or the durable identity of the order.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    /// Store-assigned identifier.
    id: OrderId,

    /// Who placed the order.
    owner: OrderOwner,

    /// Transaction id from the payment capture.
    payment_transaction_id: String,

    /// Supplier-side state.
    fulfillment: Fulfillment,

    /// Immutable line-item snapshot.
    products: Vec<LineItem>,

    /// Delivery address submitted at checkout.
    shipping: ShippingAddress,

    /// Confirmation recipient, when known.
    contact_email: Option<String>,

    /// When the order was persisted.
    created_at: DateTime<Utc>,

    /// Lazily fetched supplier order state.
    supplier_view: CachedView<SupplierView>,

    /// Lazily fetched payment transaction state.
    payment_view: CachedView<PaymentView>,
}

impl OrderRecord {
    /// Materializes a record from an insert payload, views unloaded.
    pub fn new(id: OrderId, draft: OrderDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: draft.owner,
            payment_transaction_id: draft.payment_transaction_id,
            fulfillment: draft.fulfillment,
            products: draft.products,
            shipping: draft.shipping,
            contact_email: draft.contact_email,
            created_at,
            supplier_view: CachedView::NotLoaded,
            payment_view: CachedView::NotLoaded,
        }
    }

    /// Restores previously persisted views onto a freshly loaded record.
    pub fn with_views(
        mut self,
        supplier_view: Option<SupplierView>,
        payment_view: Option<PaymentView>,
    ) -> Self {
        self.supplier_view = CachedView::from_option(supplier_view);
        self.payment_view = CachedView::from_option(payment_view);
        self
    }
}

// Query methods
impl OrderRecord {
    /// Returns the local order id.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the owner reference.
    pub fn owner(&self) -> OrderOwner {
        self.owner
    }

    /// Returns the payment transaction id.
    pub fn payment_transaction_id(&self) -> &str {
        &self.payment_transaction_id
    }

    /// Returns the supplier-side state.
    pub fn fulfillment(&self) -> &Fulfillment {
        &self.fulfillment
    }

    /// Returns the supplier order id, if placement succeeded.
    pub fn supplier_order_id(&self) -> Option<&str> {
        self.fulfillment.supplier_order_id()
    }

    /// Returns true once the supplier has accepted the order.
    pub fn is_fulfilled(&self) -> bool {
        self.fulfillment.is_fulfilled()
    }

    /// Returns the line items as submitted at checkout.
    pub fn products(&self) -> &[LineItem] {
        &self.products
    }

    /// Returns the delivery address.
    pub fn shipping(&self) -> &ShippingAddress {
        &self.shipping
    }

    /// Returns the confirmation recipient, when known.
    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    /// Returns when the order was persisted.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the total quantity across all line items.
    pub fn total_quantity(&self) -> u32 {
        self.products.iter().map(|item| item.quantity).sum()
    }

    /// Returns the cached supplier view holder.
    pub fn supplier_view(&self) -> &CachedView<SupplierView> {
        &self.supplier_view
    }

    /// Returns the cached payment view holder.
    pub fn payment_view(&self) -> &CachedView<PaymentView> {
        &self.payment_view
    }
}

// Mutators
impl OrderRecord {
    /// Replaces the supplier-side state.
    pub fn set_fulfillment(&mut self, fulfillment: Fulfillment) {
        self.fulfillment = fulfillment;
    }

    /// Records a successful supplier placement for an awaiting order.
    pub fn mark_fulfilled(&mut self, supplier_order_id: impl Into<String>) {
        self.fulfillment = Fulfillment::fulfilled(supplier_order_id);
    }

    /// Caches a freshly fetched supplier view on this instance.
    pub fn cache_supplier_view(&mut self, view: SupplierView) {
        self.supplier_view = CachedView::Loaded(view);
    }

    /// Marks the supplier view fetch as failed, leaving it retryable.
    pub fn mark_supplier_view_failed(&mut self, error: impl Into<String>) {
        self.supplier_view = CachedView::LoadFailed {
            error: error.into(),
        };
    }

    /// Caches a freshly fetched payment view on this instance.
    pub fn cache_payment_view(&mut self, view: PaymentView) {
        self.payment_view = CachedView::Loaded(view);
    }

    /// Marks the payment view fetch as failed, leaving it retryable.
    pub fn mark_payment_view_failed(&mut self, error: impl Into<String>) {
        self.payment_view = CachedView::LoadFailed {
            error: error.into(),
        };
    }
}
