//! Persistence boundary for orders and inventory.
//!
//! Two trait pairs with matching in-memory and PostgreSQL
//! implementations: [`OrderStore`] for durable order records with
//! field-level view updates, and [`InventoryStore`] for per-SKU stock
//! rows with row-independent updates.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::OrderId;
pub use error::{Result, StoreError};
pub use memory::{InMemoryInventoryStore, InMemoryOrderStore};
pub use postgres::{PostgresInventoryStore, PostgresOrderStore};
pub use query::{DEFAULT_LIMIT, MAX_LIMIT, OrderQuery};
pub use store::{InventoryStore, OrderStore};
