//! PostgreSQL integration tests
//!
//! These tests share a single PostgreSQL container for efficiency and
//! are serialized because each one truncates the tables. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use domain::{
    CustomerId, Fulfillment, GuestId, LineItem, Money, OrderDraft, OrderOwner, PaymentView,
    ShippingAddress, Sku, SupplierLine, SupplierView,
};
use order_store::{
    InventoryStore, OrderId, OrderQuery, OrderStore, PostgresInventoryStore, PostgresOrderStore,
    StoreError,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_create_orders_table.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/002_create_inventory_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get fresh stores with their own pool and cleared tables
async fn get_stores() -> (PostgresOrderStore, PostgresInventoryStore) {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders, inventory RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    (
        PostgresOrderStore::new(pool.clone()),
        PostgresInventoryStore::new(pool),
    )
}

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
        products: vec![
            LineItem::new("SKU1", 2).with_internal_reference("p-1"),
            LineItem::new("SKU2", 1),
        ],
        shipping: shipping(),
        contact_email: Some("grace@example.com".to_string()),
    }
}

#[tokio::test]
#[serial]
async fn create_and_find_fulfilled_order() {
    let (orders, _) = get_stores().await;

    let created = orders
        .create(draft("tx_1", Fulfillment::fulfilled("sup_1")))
        .await
        .unwrap();

    let found = orders.find(created.id()).await.unwrap().unwrap();
    assert_eq!(found.payment_transaction_id(), "tx_1");
    assert_eq!(found.supplier_order_id(), Some("sup_1"));
    assert_eq!(found.products().len(), 2);
    assert_eq!(found.products()[0].internal_reference.as_deref(), Some("p-1"));
    assert_eq!(found.shipping().locality, "Arlington");
    assert_eq!(found.contact_email(), Some("grace@example.com"));
    assert!(found.supplier_view().needs_fetch());
    assert!(found.payment_view().needs_fetch());
}

#[tokio::test]
#[serial]
async fn create_and_find_awaiting_order() {
    let (orders, _) = get_stores().await;

    let created = orders
        .create(draft("tx_2", Fulfillment::awaiting("supplier unavailable")))
        .await
        .unwrap();

    let found = orders.find(created.id()).await.unwrap().unwrap();
    assert!(!found.is_fulfilled());
    assert_eq!(found.supplier_order_id(), None);
    assert_eq!(
        found.fulfillment().failure_reason(),
        Some("supplier unavailable")
    );
}

#[tokio::test]
#[serial]
async fn find_returns_none_for_unknown_order() {
    let (orders, _) = get_stores().await;
    assert!(orders.find(OrderId::new(424242)).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn owner_variants_roundtrip() {
    let (orders, _) = get_stores().await;

    let customer = orders
        .create(draft("tx_c", Fulfillment::fulfilled("sup_c")))
        .await
        .unwrap();

    let mut guest_draft = draft("tx_g", Fulfillment::fulfilled("sup_g"));
    guest_draft.owner = OrderOwner::Guest(GuestId::new(9));
    let guest = orders.create(guest_draft).await.unwrap();

    let mut anon_draft = draft("tx_a", Fulfillment::fulfilled("sup_a"));
    anon_draft.owner = OrderOwner::Anonymous;
    let anon = orders.create(anon_draft).await.unwrap();

    let customer = orders.find(customer.id()).await.unwrap().unwrap();
    assert_eq!(customer.owner().customer_id(), Some(CustomerId::new(1)));

    let guest = orders.find(guest.id()).await.unwrap().unwrap();
    assert_eq!(guest.owner().guest_id(), Some(GuestId::new(9)));

    let anon = orders.find(anon.id()).await.unwrap().unwrap();
    assert!(anon.owner().is_anonymous());
}

#[tokio::test]
#[serial]
async fn list_paginates_newest_first() {
    let (orders, _) = get_stores().await;
    for i in 1..=5 {
        orders
            .create(draft(&format!("tx_{i}"), Fulfillment::fulfilled("sup")))
            .await
            .unwrap();
    }

    let page = orders
        .list(OrderQuery::new().page(1).limit(2))
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].payment_transaction_id(), "tx_5");
    assert_eq!(page[1].payment_transaction_id(), "tx_4");

    let page3 = orders
        .list(OrderQuery::new().page(3).limit(2))
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);
    assert_eq!(page3[0].payment_transaction_id(), "tx_1");
}

#[tokio::test]
#[serial]
async fn list_filters_awaiting_and_customer() {
    let (orders, _) = get_stores().await;

    orders
        .create(draft("tx_1", Fulfillment::fulfilled("sup_1")))
        .await
        .unwrap();
    orders
        .create(draft("tx_2", Fulfillment::awaiting("rejected")))
        .await
        .unwrap();
    let mut other = draft("tx_3", Fulfillment::awaiting("timeout"));
    other.owner = OrderOwner::Customer(CustomerId::new(2));
    orders.create(other).await.unwrap();

    let awaiting = orders
        .list(OrderQuery::new().awaiting_only())
        .await
        .unwrap();
    assert_eq!(awaiting.len(), 2);

    let for_customer = orders
        .list(OrderQuery::new().for_customer(CustomerId::new(2)))
        .await
        .unwrap();
    assert_eq!(for_customer.len(), 1);
    assert_eq!(for_customer[0].payment_transaction_id(), "tx_3");
}

#[tokio::test]
#[serial]
async fn set_fulfillment_flips_awaiting_to_fulfilled() {
    let (orders, _) = get_stores().await;
    let created = orders
        .create(draft("tx_1", Fulfillment::awaiting("timeout")))
        .await
        .unwrap();

    orders
        .set_fulfillment(created.id(), &Fulfillment::fulfilled("sup_9"))
        .await
        .unwrap();

    let found = orders.find(created.id()).await.unwrap().unwrap();
    assert!(found.is_fulfilled());
    assert_eq!(found.supplier_order_id(), Some("sup_9"));
    assert_eq!(found.fulfillment().failure_reason(), None);
}

#[tokio::test]
#[serial]
async fn set_fulfillment_fails_for_unknown_order() {
    let (orders, _) = get_stores().await;
    let result = orders
        .set_fulfillment(OrderId::new(404), &Fulfillment::fulfilled("sup_1"))
        .await;
    assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
}

#[tokio::test]
#[serial]
async fn saved_views_reload_warm() {
    let (orders, _) = get_stores().await;
    let created = orders
        .create(draft("tx_1", Fulfillment::fulfilled("sup_1")))
        .await
        .unwrap();

    let supplier_view = SupplierView {
        id: "sup_1".to_string(),
        status: "shipped".to_string(),
        shipping: shipping(),
        products: vec![SupplierLine {
            reference: Sku::new("SKU1"),
            quantity: 2,
            name: Some("Widget".to_string()),
        }],
    };
    orders
        .save_supplier_view(created.id(), &supplier_view)
        .await
        .unwrap();

    let payment_view = PaymentView {
        amount: Money::from_cents(11990),
        billing: domain::BillingAddress {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            country: "US".to_string(),
            postal_code: "22201".to_string(),
            locality: "Arlington".to_string(),
            address_line1: "1 Navy Way".to_string(),
            address_line2: None,
        },
        card: Some(domain::CardSummary {
            card_type: "Visa".to_string(),
            last4: "4242".to_string(),
        }),
        payer_email: None,
    };
    orders
        .save_payment_view(created.id(), &payment_view)
        .await
        .unwrap();

    let found = orders.find(created.id()).await.unwrap().unwrap();
    assert_eq!(found.supplier_view().loaded(), Some(&supplier_view));
    assert_eq!(found.payment_view().loaded(), Some(&payment_view));
}

#[tokio::test]
#[serial]
async fn inventory_level_distinguishes_unknown_from_zero() {
    let (_, inventory) = get_stores().await;
    let sku = Sku::new("SKU1");

    assert_eq!(inventory.level(&sku).await.unwrap(), None);

    inventory.set_quantity(&sku, 0).await.unwrap();
    assert_eq!(inventory.level(&sku).await.unwrap(), Some(0));
}

#[tokio::test]
#[serial]
async fn inventory_set_quantity_upserts() {
    let (_, inventory) = get_stores().await;
    let sku = Sku::new("SKU1");

    inventory.set_quantity(&sku, 5).await.unwrap();
    inventory.set_quantity(&sku, 3).await.unwrap();
    assert_eq!(inventory.level(&sku).await.unwrap(), Some(3));
}

#[tokio::test]
#[serial]
async fn inventory_adjust_floors_at_zero() {
    let (_, inventory) = get_stores().await;
    let sku = Sku::new("SKU1");
    inventory.set_quantity(&sku, 3).await.unwrap();

    let remaining = inventory.adjust_quantity(&sku, -10).await.unwrap();
    assert_eq!(remaining, 0);
    assert_eq!(inventory.level(&sku).await.unwrap(), Some(0));
}

#[tokio::test]
#[serial]
async fn inventory_adjust_requires_existing_row() {
    let (_, inventory) = get_stores().await;
    let result = inventory.adjust_quantity(&Sku::new("NOPE"), -1).await;
    assert!(matches!(result, Err(StoreError::SkuNotFound(_))));
}
