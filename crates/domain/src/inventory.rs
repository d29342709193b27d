//! Local stock levels.

use serde::{Deserialize, Serialize};

use crate::order::Sku;

/// Stock row for one SKU.
///
/// Quantities are non-negative; the supplier is the source of truth and
/// sync only ever overwrites with supplier-reported values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Product reference.
    pub sku: Sku,

    /// Units on hand according to the last sync.
    pub quantity: u32,
}

impl StockLevel {
    /// Creates a stock row.
    pub fn new(sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}
