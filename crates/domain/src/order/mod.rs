//! Order record and related types.

mod fulfillment;
mod record;
mod value_objects;
mod views;

pub use fulfillment::Fulfillment;
pub use record::{OrderDraft, OrderOwner, OrderRecord};
pub use value_objects::{
    BillingAddress, CardSummary, CustomerId, GuestId, LineItem, Money, ShippingAddress, Sku,
};
pub use views::{CachedView, PaymentView, SupplierLine, SupplierView};
