//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency; they
//! truncate the tables between cases, so they are marked serial.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{CustomerId, OrderId};
use domain::{Message, Money, Order, OrderItem, OrderStatus, SenderRole};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    ConversationStore, CounterOp, OrderStore, PostgresConversationStore, PostgresOrderStore,
    StoreError, SummaryPatch,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

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

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/0001_fulfillment_tables.sql"))
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

/// Fresh stores over a fresh pool with cleared tables
async fn get_test_stores() -> (PostgresOrderStore, PostgresConversationStore) {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders, conversations, messages")
        .execute(&pool)
        .await
        .unwrap();

    (
        PostgresOrderStore::new(pool.clone()),
        PostgresConversationStore::new(pool),
    )
}

fn placed_order(id: &str) -> Order {
    let mut order = Order::place(
        OrderId::new(id),
        CustomerId::new("user-1"),
        vec![
            OrderItem::new("Bamboo Chair", 2, Money::from_pesos(750)),
            OrderItem::new("Rattan Lamp", 1, Money::from_pesos(500)),
        ],
        Money::from_pesos(2000),
    );
    order.customer_email = Some("maria@example.com".to_string());
    order.delivery_address = Some("123 Mabini St, Quezon City".to_string());
    order.payment_method = Some("gcash".to_string());
    order
}

#[tokio::test]
#[serial]
async fn order_round_trip() {
    let (orders, _) = get_test_stores().await;
    let order = placed_order("order-1");
    orders.insert(order.clone()).await.unwrap();

    let stored = orders.get(&order.id).await.unwrap();
    assert_eq!(stored.id, order.id);
    assert_eq!(stored.status, OrderStatus::Confirmation);
    assert_eq!(stored.status_history.len(), 1);
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.total_amount, Money::from_pesos(2000));
    assert_eq!(stored.customer_email.as_deref(), Some("maria@example.com"));
    assert_eq!(
        stored.delivery_address.as_deref(),
        Some("123 Mabini St, Quezon City")
    );
}

#[tokio::test]
#[serial]
async fn get_missing_order() {
    let (orders, _) = get_test_stores().await;
    let result = orders.get(&OrderId::new("missing")).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn list_orders_newest_first() {
    let (orders, _) = get_test_stores().await;

    let mut older = placed_order("order-old");
    older.order_date = Utc::now() - Duration::hours(2);
    orders.insert(older).await.unwrap();
    orders.insert(placed_order("order-new")).await.unwrap();

    let listed = orders.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id.as_str(), "order-new");
    assert_eq!(listed[1].id.as_str(), "order-old");
}

#[tokio::test]
#[serial]
async fn conditional_update_moves_status_and_history() {
    let (orders, _) = get_test_stores().await;
    let order = placed_order("order-1");
    let (next, entry) = order.advance().unwrap();
    orders.insert(order.clone()).await.unwrap();

    orders
        .update_status(&order.id, OrderStatus::Confirmation, next, entry)
        .await
        .unwrap();

    let stored = orders.get(&order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Shipping);
    assert_eq!(stored.status_history.len(), 2);
    assert_eq!(stored.status_history[1].status, OrderStatus::Shipping);
}

#[tokio::test]
#[serial]
async fn conditional_update_conflict_reports_actual_status() {
    let (orders, _) = get_test_stores().await;
    let order = placed_order("order-1");
    let (next, entry) = order.advance().unwrap();
    orders.insert(order.clone()).await.unwrap();

    let result = orders
        .update_status(&order.id, OrderStatus::Shipping, next, entry)
        .await;

    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict {
            expected: OrderStatus::Shipping,
            actual: OrderStatus::Confirmation,
        })
    ));

    let stored = orders.get(&order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Confirmation);
    assert_eq!(stored.status_history.len(), 1);
}

#[tokio::test]
#[serial]
async fn concurrent_advances_have_one_winner() {
    let (orders, _) = get_test_stores().await;
    let order = placed_order("order-1");
    orders.insert(order.clone()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orders = orders.clone();
        let order = order.clone();
        handles.push(tokio::spawn(async move {
            let (next, entry) = order.advance().unwrap();
            orders
                .update_status(&order.id, order.status, next, entry)
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    let stored = orders.get(&order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Shipping);
    assert_eq!(stored.status_history.len(), 2);
}

#[tokio::test]
#[serial]
async fn message_round_trip_with_order_snapshot() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");
    let order = placed_order("order-1");

    conversations
        .append(&customer, Message::order_placed(&order))
        .await
        .unwrap();
    conversations
        .append(&customer, Message::text(SenderRole::Admin, "On its way"))
        .await
        .unwrap();

    let messages = conversations.messages(&customer).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text.as_deref(), Some("New Order Placed"));
    assert!(messages[0].order_related);
    let snapshot = messages[0].order_snapshot.as_ref().unwrap();
    assert_eq!(snapshot.order_id, order.id);
    assert_eq!(snapshot.total_amount, order.total_amount);
    assert_eq!(messages[1].sender, SenderRole::Admin);
}

#[tokio::test]
#[serial]
async fn upsert_creates_then_merges() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");

    conversations
        .upsert_summary(&customer, SummaryPatch::new().customer_name("maria"))
        .await
        .unwrap();
    conversations
        .upsert_summary(
            &customer,
            SummaryPatch::tail("hello", Utc::now()).unread_by_user(CounterOp::Increment),
        )
        .await
        .unwrap();

    let summary = conversations.get_summary(&customer).await.unwrap().unwrap();
    assert_eq!(summary.customer_name, "maria");
    assert_eq!(summary.last_message.as_deref(), Some("hello"));
    assert_eq!(summary.unread_by_user, 1);
    assert_eq!(summary.unread_by_admin, 0);
}

#[tokio::test]
#[serial]
async fn concurrent_increments_all_land() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let conversations = conversations.clone();
        let customer = customer.clone();
        handles.push(tokio::spawn(async move {
            conversations
                .upsert_summary(
                    &customer,
                    SummaryPatch::new().unread_by_user(CounterOp::Increment),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let summary = conversations.get_summary(&customer).await.unwrap().unwrap();
    assert_eq!(summary.unread_by_user, 16);
}

#[tokio::test]
#[serial]
async fn racing_upserts_create_one_row() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let conversations = conversations.clone();
        let customer = customer.clone();
        handles.push(tokio::spawn(async move {
            conversations
                .upsert_summary(&customer, SummaryPatch::tail("hi", Utc::now()))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(conversations.list_summaries().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn mark_read_zeroes_one_side_only() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");

    conversations
        .upsert_summary(
            &customer,
            SummaryPatch::new()
                .unread_by_admin(CounterOp::Set(3))
                .unread_by_user(CounterOp::Set(2)),
        )
        .await
        .unwrap();

    conversations
        .mark_read(&customer, SenderRole::Admin)
        .await
        .unwrap();

    let summary = conversations.get_summary(&customer).await.unwrap().unwrap();
    assert_eq!(summary.unread_by_admin, 0);
    assert_eq!(summary.unread_by_user, 2);
}

#[tokio::test]
#[serial]
async fn mark_read_on_missing_conversation() {
    let (_, conversations) = get_test_stores().await;
    let result = conversations
        .mark_read(&CustomerId::new("missing"), SenderRole::Admin)
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn clear_new_order_flag_resets_both_fields() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");

    conversations
        .upsert_summary(
            &customer,
            SummaryPatch::new().new_order(OrderId::new("order-1")),
        )
        .await
        .unwrap();
    conversations.clear_new_order_flag(&customer).await.unwrap();

    let summary = conversations.get_summary(&customer).await.unwrap().unwrap();
    assert!(!summary.has_new_order);
    assert!(summary.pending_order_id.is_none());
}

#[tokio::test]
#[serial]
async fn set_instructions_sent_flags_the_message() {
    let (_, conversations) = get_test_stores().await;
    let customer = CustomerId::new("user-1");
    let order = placed_order("order-1");

    let message_id = conversations
        .append(&customer, Message::order_placed(&order))
        .await
        .unwrap();
    conversations
        .set_instructions_sent(&customer, &message_id)
        .await
        .unwrap();

    let messages = conversations.messages(&customer).await.unwrap();
    assert!(messages[0].instructions_sent);
}

#[tokio::test]
#[serial]
async fn summaries_sorted_by_recency() {
    let (_, conversations) = get_test_stores().await;

    conversations
        .upsert_summary(
            &CustomerId::new("user-a"),
            SummaryPatch::tail("old", Utc::now() - Duration::minutes(10)),
        )
        .await
        .unwrap();
    conversations
        .upsert_summary(
            &CustomerId::new("user-b"),
            SummaryPatch::tail("new", Utc::now()),
        )
        .await
        .unwrap();

    let summaries = conversations.list_summaries().await.unwrap();
    assert_eq!(summaries[0].customer_id.as_str(), "user-b");
    assert_eq!(summaries[1].customer_id.as_str(), "user-a");
}
