//! Cached projections of upstream payment and supplier state.

use serde::{Deserialize, Serialize};

use super::{BillingAddress, CardSummary, Money, ShippingAddress, Sku};

/// Memoized holder for a lazily fetched upstream view.
///
/// Each order instance fetches a view at most once: once `Loaded`, the
/// value is reused without another upstream call. A failed fetch parks
/// the holder in `LoadFailed`, which stays eligible for a fresh attempt
/// on the next access instead of poisoning the field.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedView<T> {
    /// No fetch has been attempted on this instance.
    NotLoaded,

    /// The upstream state, mapped into the local shape.
    Loaded(T),

    /// The last fetch failed; the next access may retry.
    LoadFailed { error: String },
}

impl<T> Default for CachedView<T> {
    fn default() -> Self {
        CachedView::NotLoaded
    }
}

impl<T> CachedView<T> {
    /// Builds a holder from a stored value, `NotLoaded` when absent.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => CachedView::Loaded(v),
            None => CachedView::NotLoaded,
        }
    }

    /// Returns the cached value, if loaded.
    pub fn loaded(&self) -> Option<&T> {
        match self {
            CachedView::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if a value is cached.
    pub fn is_loaded(&self) -> bool {
        matches!(self, CachedView::Loaded(_))
    }

    /// Returns true if the next access should fetch upstream.
    pub fn needs_fetch(&self) -> bool {
        !self.is_loaded()
    }

    /// Returns the last fetch failure, if that is the current state.
    pub fn failure(&self) -> Option<&str> {
        match self {
            CachedView::LoadFailed { error } => Some(error),
            _ => None,
        }
    }
}

/// One product line as reported by the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierLine {
    /// Supplier-facing product reference.
    pub reference: Sku,

    /// Quantity in the supplier order.
    pub quantity: u32,

    /// Product name, when the supplier reports one.
    pub name: Option<String>,
}

/// Supplier-side order state, mapped from the supplier's order-info shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierView {
    /// Order identifier on the supplier side.
    pub id: String,

    /// Supplier-reported status (e.g. "pending", "shipped").
    pub status: String,

    /// Delivery address echoed by the supplier.
    pub shipping: ShippingAddress,

    /// Product lines in the supplier order.
    pub products: Vec<SupplierLine>,
}

/// Payment-side transaction state, mapped from the processor's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentView {
    /// Captured amount.
    pub amount: Money,

    /// Billing address recorded with the transaction.
    pub billing: BillingAddress,

    /// Card summary, absent for wallet-style payments.
    pub card: Option<CardSummary>,

    /// Payer email for wallet-style payments.
    pub payer_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_loaded() {
        let view: CachedView<SupplierView> = CachedView::default();
        assert!(view.needs_fetch());
        assert!(!view.is_loaded());
        assert!(view.loaded().is_none());
    }

    #[test]
    fn test_loaded_value_is_returned_without_refetch() {
        let view = CachedView::Loaded(42);
        assert!(!view.needs_fetch());
        assert_eq!(view.loaded(), Some(&42));
    }

    #[test]
    fn test_load_failed_stays_eligible_for_retry() {
        let view: CachedView<i32> = CachedView::LoadFailed {
            error: "gateway timeout".to_string(),
        };
        assert!(view.needs_fetch());
        assert!(view.loaded().is_none());
        assert_eq!(view.failure(), Some("gateway timeout"));
    }

    #[test]
    fn test_from_option() {
        assert!(CachedView::from_option(Some(1)).is_loaded());
        assert!(CachedView::<i32>::from_option(None).needs_fetch());
    }
}
