use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local identifier of a persisted order record.
///
/// Assigned by the order store on insert. Wrapping the integer prevents
/// mixing order ids with customer ids or other numeric identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Creates an order ID from a store-assigned value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<OrderId> for i64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Unique identifier for one checkout attempt.
///
/// Minted before any external call is made, so every log line, alert,
/// and step record produced by the attempt can be correlated even when
/// the attempt never yields a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Creates a new random attempt ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an attempt ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AttemptId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AttemptId> for Uuid {
    fn from(id: AttemptId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_preserves_value() {
        let id = OrderId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn order_id_serializes_as_bare_number() {
        let id = OrderId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn order_id_orders_numerically() {
        assert!(OrderId::new(2) < OrderId::new(10));
    }

    #[test]
    fn attempt_id_new_creates_unique_ids() {
        let id1 = AttemptId::new();
        let id2 = AttemptId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn attempt_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = AttemptId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn attempt_id_serialization_roundtrip() {
        let id = AttemptId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: AttemptId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
