use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    CustomerId, Fulfillment, GuestId, OrderDraft, OrderOwner, OrderRecord, PaymentView, Sku,
    SupplierView,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    OrderQuery, Result, StoreError,
    store::{InventoryStore, OrderStore},
};

const ORDER_COLUMNS: &str = "id, customer_id, guest_id, payment_transaction_id, \
     fulfillment_status, supplier_order_id, fulfillment_error, products, shipping, \
     contact_email, created_at, supplier_view, payment_view";

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: PgRow) -> Result<OrderRecord> {
        let id: i64 = row.try_get("id")?;

        let owner = match (
            row.try_get::<Option<i64>, _>("customer_id")?,
            row.try_get::<Option<i64>, _>("guest_id")?,
        ) {
            (Some(customer), None) => OrderOwner::Customer(CustomerId::new(customer)),
            (None, Some(guest)) => OrderOwner::Guest(GuestId::new(guest)),
            (None, None) => OrderOwner::Anonymous,
            (Some(_), Some(_)) => {
                return Err(StoreError::InconsistentRow {
                    id,
                    reason: "both customer_id and guest_id set".to_string(),
                });
            }
        };

        let status: String = row.try_get("fulfillment_status")?;
        let supplier_order_id: Option<String> = row.try_get("supplier_order_id")?;
        let fulfillment_error: Option<String> = row.try_get("fulfillment_error")?;
        let fulfillment = match status.as_str() {
            "Fulfilled" => {
                let supplier_order_id =
                    supplier_order_id.ok_or_else(|| StoreError::InconsistentRow {
                        id,
                        reason: "fulfilled order without supplier_order_id".to_string(),
                    })?;
                Fulfillment::fulfilled(supplier_order_id)
            }
            "AwaitingFulfillment" => Fulfillment::awaiting(fulfillment_error.unwrap_or_default()),
            other => {
                return Err(StoreError::InconsistentRow {
                    id,
                    reason: format!("unknown fulfillment status {other:?}"),
                });
            }
        };

        let products = serde_json::from_value(row.try_get("products")?)?;
        let shipping = serde_json::from_value(row.try_get("shipping")?)?;
        let supplier_view = row
            .try_get::<Option<serde_json::Value>, _>("supplier_view")?
            .map(serde_json::from_value::<SupplierView>)
            .transpose()?;
        let payment_view = row
            .try_get::<Option<serde_json::Value>, _>("payment_view")?
            .map(serde_json::from_value::<PaymentView>)
            .transpose()?;

        let draft = OrderDraft {
            owner,
            payment_transaction_id: row.try_get("payment_transaction_id")?,
            fulfillment,
            products,
            shipping,
            contact_email: row.try_get("contact_email")?,
        };
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(OrderRecord::new(OrderId::new(id), draft, created_at)
            .with_views(supplier_view, payment_view))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<OrderRecord> {
        let products = serde_json::to_value(&draft.products)?;
        let shipping = serde_json::to_value(&draft.shipping)?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_id, guest_id, payment_transaction_id,
                fulfillment_status, supplier_order_id, fulfillment_error,
                products, shipping, contact_email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, created_at
            "#,
        )
        .bind(draft.owner.customer_id().map(|id| id.value()))
        .bind(draft.owner.guest_id().map(|id| id.value()))
        .bind(&draft.payment_transaction_id)
        .bind(draft.fulfillment.as_str())
        .bind(draft.fulfillment.supplier_order_id())
        .bind(draft.fulfillment.failure_reason())
        .bind(products)
        .bind(shipping)
        .bind(&draft.contact_email)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        tracing::debug!(order_id = id, "order row inserted");

        Ok(OrderRecord::new(OrderId::new(id), draft, created_at))
    }

    async fn find(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if query.awaiting_only {
            sql.push_str(" AND fulfillment_status = 'AwaitingFulfillment'");
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");
        param_count += 1;
        sql.push_str(&format!(" LIMIT ${param_count}"));
        param_count += 1;
        sql.push_str(&format!(" OFFSET ${param_count}"));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id.value());
        }
        sqlx_query = sqlx_query
            .bind(query.limit as i64)
            .bind(query.offset() as i64);

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn set_fulfillment(&self, id: OrderId, fulfillment: &Fulfillment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET fulfillment_status = $2, supplier_order_id = $3, fulfillment_error = $4
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .bind(fulfillment.as_str())
        .bind(fulfillment.supplier_order_id())
        .bind(fulfillment.failure_reason())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        tracing::debug!(order_id = id.value(), status = fulfillment.as_str(), "fulfillment updated");
        Ok(())
    }

    async fn save_supplier_view(&self, id: OrderId, view: &SupplierView) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET supplier_view = $2 WHERE id = $1")
            .bind(id.value())
            .bind(serde_json::to_value(view)?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn save_payment_view(&self, id: OrderId, view: &PaymentView) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET payment_view = $2 WHERE id = $1")
            .bind(id.value())
            .bind(serde_json::to_value(view)?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }
}

/// PostgreSQL-backed inventory store.
///
/// Every operation is a single-row statement, so unrelated SKUs never
/// serialize behind each other.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn level(&self, sku: &Sku) -> Result<Option<u32>> {
        let quantity: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM inventory WHERE sku = $1")
                .bind(sku.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(quantity.map(|q| q.max(0) as u32))
    }

    async fn set_quantity(&self, sku: &Sku, quantity: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (sku, quantity)
            VALUES ($1, $2)
            ON CONFLICT (sku) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                updated_at = now()
            "#,
        )
        .bind(sku.as_str())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn adjust_quantity(&self, sku: &Sku, delta: i64) -> Result<u32> {
        let quantity: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity = GREATEST(quantity + $2, 0), updated_at = now()
            WHERE sku = $1
            RETURNING quantity
            "#,
        )
        .bind(sku.as_str())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        quantity
            .map(|q| q.max(0) as u32)
            .ok_or_else(|| StoreError::SkuNotFound(sku.as_str().to_string()))
    }
}
