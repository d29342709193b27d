use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{Fulfillment, OrderDraft, OrderRecord, PaymentView, Sku, SupplierView};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, Result, StoreError,
    store::{InventoryStore, OrderStore},
};

#[derive(Default)]
struct OrderStoreState {
    next_id: i64,
    orders: BTreeMap<i64, OrderRecord>,
}

/// In-memory order store for tests and DATABASE_URL-less deployments.
///
/// Provides the same interface and semantics as the PostgreSQL
/// implementation, including store-assigned ids and persisted views.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderStoreState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.next_id = 0;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<OrderRecord> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = OrderId::new(state.next_id);
        let record = OrderRecord::new(id, draft, Utc::now());
        state.orders.insert(id.value(), record.clone());
        Ok(record)
    }

    async fn find(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id.value()).cloned())
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let records = state
            .orders
            .values()
            .rev()
            .filter(|record| {
                if query.awaiting_only && record.is_fulfilled() {
                    return false;
                }
                if let Some(customer_id) = query.customer_id
                    && record.owner().customer_id() != Some(customer_id)
                {
                    return false;
                }
                true
            })
            .skip(query.offset())
            .take(query.limit)
            .cloned()
            .collect();
        Ok(records)
    }

    async fn set_fulfillment(&self, id: OrderId, fulfillment: &Fulfillment) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .orders
            .get_mut(&id.value())
            .ok_or(StoreError::OrderNotFound(id))?;
        record.set_fulfillment(fulfillment.clone());
        Ok(())
    }

    async fn save_supplier_view(&self, id: OrderId, view: &SupplierView) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .orders
            .get_mut(&id.value())
            .ok_or(StoreError::OrderNotFound(id))?;
        record.cache_supplier_view(view.clone());
        Ok(())
    }

    async fn save_payment_view(&self, id: OrderId, view: &PaymentView) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .orders
            .get_mut(&id.value())
            .ok_or(StoreError::OrderNotFound(id))?;
        record.cache_payment_view(view.clone());
        Ok(())
    }
}

/// In-memory inventory store with one lock per SKU row.
///
/// The outer map lock is held only long enough to find or insert the
/// row; quantity reads and writes contend on the row lock alone, so
/// updates to unrelated SKUs proceed independently.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    rows: Arc<RwLock<HashMap<Sku, Arc<RwLock<u32>>>>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of SKU rows.
    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }

    async fn row(&self, sku: &Sku) -> Option<Arc<RwLock<u32>>> {
        self.rows.read().await.get(sku).cloned()
    }

    async fn row_or_insert(&self, sku: &Sku) -> Arc<RwLock<u32>> {
        if let Some(row) = self.row(sku).await {
            return row;
        }
        let mut rows = self.rows.write().await;
        rows.entry(sku.clone())
            .or_insert_with(|| Arc::new(RwLock::new(0)))
            .clone()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn level(&self, sku: &Sku) -> Result<Option<u32>> {
        match self.row(sku).await {
            Some(row) => Ok(Some(*row.read().await)),
            None => Ok(None),
        }
    }

    async fn set_quantity(&self, sku: &Sku, quantity: u32) -> Result<()> {
        let row = self.row_or_insert(sku).await;
        *row.write().await = quantity;
        Ok(())
    }

    async fn adjust_quantity(&self, sku: &Sku, delta: i64) -> Result<u32> {
        let row = self
            .row(sku)
            .await
            .ok_or_else(|| StoreError::SkuNotFound(sku.as_str().to_string()))?;
        let mut quantity = row.write().await;
        let adjusted = (*quantity as i64 + delta).max(0);
        *quantity = adjusted as u32;
        Ok(*quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CustomerId, LineItem, OrderOwner, ShippingAddress};

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            country: "US".to_string(),
            postal_code: "22201".to_string(),
            locality: "Arlington".to_string(),
            address: "1 Navy Way".to_string(),
            phone: "+1 555 0100".to_string(),
        }
    }

    fn draft(transaction_id: &str, fulfillment: Fulfillment) -> OrderDraft {
        OrderDraft {
            owner: OrderOwner::Customer(CustomerId::new(1)),
            payment_transaction_id: transaction_id.to_string(),
            fulfillment,
            products: vec![LineItem::new("SKU1", 2)],
            shipping: shipping(),
            contact_email: Some("grace@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = InMemoryOrderStore::new();

        let first = store
            .create(draft("tx_1", Fulfillment::fulfilled("sup_1")))
            .await
            .unwrap();
        let second = store
            .create(draft("tx_2", Fulfillment::fulfilled("sup_2")))
            .await
            .unwrap();

        assert_eq!(first.id().value(), 1);
        assert_eq!(second.id().value(), 2);
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn find_returns_none_for_unknown_order() {
        let store = InMemoryOrderStore::new();
        let result = store.find(OrderId::new(99)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first_with_pagination() {
        let store = InMemoryOrderStore::new();
        for i in 1..=5 {
            store
                .create(draft(&format!("tx_{i}"), Fulfillment::fulfilled("sup")))
                .await
                .unwrap();
        }

        let page = store
            .list(OrderQuery::new().page(1).limit(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].payment_transaction_id(), "tx_5");
        assert_eq!(page[1].payment_transaction_id(), "tx_4");

        let page2 = store
            .list(OrderQuery::new().page(2).limit(2))
            .await
            .unwrap();
        assert_eq!(page2[0].payment_transaction_id(), "tx_3");
    }

    #[tokio::test]
    async fn list_filters_awaiting_orders() {
        let store = InMemoryOrderStore::new();
        store
            .create(draft("tx_1", Fulfillment::fulfilled("sup_1")))
            .await
            .unwrap();
        store
            .create(draft("tx_2", Fulfillment::awaiting("supplier down")))
            .await
            .unwrap();

        let awaiting = store
            .list(OrderQuery::new().awaiting_only())
            .await
            .unwrap();
        assert_eq!(awaiting.len(), 1);
        assert_eq!(awaiting[0].payment_transaction_id(), "tx_2");
    }

    #[tokio::test]
    async fn set_fulfillment_updates_existing_order() {
        let store = InMemoryOrderStore::new();
        let record = store
            .create(draft("tx_1", Fulfillment::awaiting("timeout")))
            .await
            .unwrap();

        store
            .set_fulfillment(record.id(), &Fulfillment::fulfilled("sup_9"))
            .await
            .unwrap();

        let reloaded = store.find(record.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.supplier_order_id(), Some("sup_9"));
    }

    #[tokio::test]
    async fn set_fulfillment_fails_for_unknown_order() {
        let store = InMemoryOrderStore::new();
        let result = store
            .set_fulfillment(OrderId::new(404), &Fulfillment::fulfilled("sup_1"))
            .await;
        assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn saved_views_survive_reload() {
        let store = InMemoryOrderStore::new();
        let record = store
            .create(draft("tx_1", Fulfillment::fulfilled("sup_1")))
            .await
            .unwrap();

        let view = SupplierView {
            id: "sup_1".to_string(),
            status: "pending".to_string(),
            shipping: shipping(),
            products: vec![],
        };
        store.save_supplier_view(record.id(), &view).await.unwrap();

        let reloaded = store.find(record.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.supplier_view().loaded(), Some(&view));
        assert!(reloaded.payment_view().needs_fetch());
    }

    #[tokio::test]
    async fn inventory_level_distinguishes_unknown_from_zero() {
        let store = InMemoryInventoryStore::new();
        let sku = Sku::new("SKU1");

        assert_eq!(store.level(&sku).await.unwrap(), None);

        store.set_quantity(&sku, 0).await.unwrap();
        assert_eq!(store.level(&sku).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn set_quantity_is_last_write_wins() {
        let store = InMemoryInventoryStore::new();
        let sku = Sku::new("SKU1");

        store.set_quantity(&sku, 5).await.unwrap();
        store.set_quantity(&sku, 3).await.unwrap();
        assert_eq!(store.level(&sku).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn adjust_quantity_floors_at_zero() {
        let store = InMemoryInventoryStore::new();
        let sku = Sku::new("SKU1");
        store.set_quantity(&sku, 3).await.unwrap();

        let remaining = store.adjust_quantity(&sku, -5).await.unwrap();
        assert_eq!(remaining, 0);
        assert_eq!(store.level(&sku).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn adjust_quantity_requires_existing_row() {
        let store = InMemoryInventoryStore::new();
        let result = store.adjust_quantity(&Sku::new("NOPE"), -1).await;
        assert!(matches!(result, Err(StoreError::SkuNotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_adjustments_on_one_sku_are_serialized() {
        let store = InMemoryInventoryStore::new();
        let sku = Sku::new("SKU1");
        store.set_quantity(&sku, 100).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..30 {
            let store = store.clone();
            let sku = sku.clone();
            handles.push(tokio::spawn(async move {
                store.adjust_quantity(&sku, -2).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.level(&sku).await.unwrap(), Some(40));
    }
}
