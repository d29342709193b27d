//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a registered customer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

impl CustomerId {
    /// Creates a customer ID from its numeric key.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CustomerId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Identifier of a guest purchaser, recorded for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(i64);

impl GuestId {
    /// Creates a guest ID from its numeric key.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for GuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GuestId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Product reference (SKU) as used by both the catalog and the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Creates a new SKU from a string.
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sku {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Sku {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Money amount represented in cents to avoid floating point issues.
///
/// The payment processor exchanges amounts as decimal strings
/// (e.g. `"119.90"`); [`Money::parse`] and [`Money::as_decimal_string`]
/// convert at that boundary while all arithmetic stays on integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Parses a non-negative decimal string such as `"119.90"`, `"5"`, or `"0.5"`.
    ///
    /// At most two fraction digits are accepted.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidAmount {
            input: input.to_string(),
        };

        let (whole, fraction) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
            || (input.contains('.') && (fraction.is_empty() || fraction.len() > 2))
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction_cents))
            .map(Self::from_cents)
            .ok_or_else(invalid)
    }

    /// Renders the amount in the decimal form the payment boundary expects.
    pub fn as_decimal_string(&self) -> String {
        if self.cents < 0 {
            format!("-{}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            format!("{}.{:02}", self.dollars(), self.cents_part())
        }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

/// A line item as submitted at checkout time.
///
/// Immutable once captured on an order; supplier-side changes never
/// rewrite the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Supplier-facing product reference.
    pub reference: Sku,

    /// Quantity ordered.
    pub quantity: u32,

    /// Local catalog identifier, when the item maps to a catalog row.
    pub internal_reference: Option<String>,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(reference: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            reference: reference.into(),
            quantity,
            internal_reference: None,
        }
    }

    /// Attaches the local catalog identifier.
    pub fn with_internal_reference(mut self, internal_reference: impl Into<String>) -> Self {
        self.internal_reference = Some(internal_reference.into());
        self
    }
}

/// Delivery address sent with a supplier placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub postal_code: String,
    pub locality: String,
    pub address: String,
    pub phone: String,
}

/// Billing address as exchanged with the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub postal_code: String,
    pub locality: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
}

/// Card summary returned by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub card_type: String,
    pub last4: String,
}
