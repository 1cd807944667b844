use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, MessageId, OrderId};
use domain::{
    Conversation, Message, Money, Order, OrderStatus, SenderRole, StatusHistoryEntry,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    ConversationStore, CounterOp, MessageFeed, OrderFeed, OrderStore, Result, StoreError,
    SummaryFeed, SummaryPatch, feed::Hub,
};

fn invalid_column(message: String) -> StoreError {
    StoreError::Serialization(serde_json::Error::io(std::io::Error::other(message)))
}

/// PostgreSQL-backed order store.
///
/// Subscriptions are fed by writes going through this process; the feed is
/// refreshed from the database after each write.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    feed: Arc<watch::Sender<Vec<Order>>>,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            pool,
            feed: Arc::new(feed),
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status.parse().map_err(invalid_column)?;
        let history: serde_json::Value = row.try_get("status_history")?;
        let items: serde_json::Value = row.try_get("items")?;

        Ok(Order {
            id: OrderId::new(row.try_get::<String, _>("id")?),
            customer_id: CustomerId::new(row.try_get::<String, _>("customer_id")?),
            customer_email: row.try_get("customer_email")?,
            status,
            status_history: serde_json::from_value(history)?,
            items: serde_json::from_value(items)?,
            total_amount: Money::from_cents(row.try_get("total_amount")?),
            delivery_address: row.try_get("delivery_address")?,
            payment_method: row.try_get("payment_method")?,
            order_date: row.try_get("order_date")?,
        })
    }

    async fn fetch_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, customer_email, status, status_history, items,
                   total_amount, delivery_address, payment_method, order_date
            FROM orders
            ORDER BY order_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn refresh_feed(&self) -> Result<()> {
        if self.feed.receiver_count() > 0 {
            let snapshot = self.fetch_all().await?;
            self.feed.send_replace(snapshot);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, customer_email, status, status_history,
                                items, total_amount, delivery_address, payment_method, order_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                customer_email = EXCLUDED.customer_email,
                status = EXCLUDED.status,
                status_history = EXCLUDED.status_history,
                items = EXCLUDED.items,
                total_amount = EXCLUDED.total_amount,
                delivery_address = EXCLUDED.delivery_address,
                payment_method = EXCLUDED.payment_method,
                order_date = EXCLUDED.order_date
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.customer_id.as_str())
        .bind(&order.customer_email)
        .bind(order.status.as_str())
        .bind(serde_json::to_value(&order.status_history)?)
        .bind(serde_json::to_value(&order.items)?)
        .bind(order.total_amount.cents())
        .bind(&order.delivery_address)
        .bind(&order.payment_method)
        .bind(order.order_date)
        .execute(&self.pool)
        .await?;

        metrics::counter!("store_orders_inserted").increment(1);
        self.refresh_feed().await
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, customer_email, status, status_history, items,
                   total_amount, delivery_address, payment_method, order_date
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::NotFound(format!("order {id}"))),
        }
    }

    async fn list(&self) -> Result<Vec<Order>> {
        self.fetch_all().await
    }

    async fn subscribe(&self) -> Result<OrderFeed> {
        let snapshot = self.fetch_all().await?;
        if self.feed.receiver_count() == 0 {
            self.feed.send_replace(snapshot);
        }
        Ok(self.feed.subscribe())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        entry: StatusHistoryEntry,
    ) -> Result<()> {
        // Conditional single-row write: status and history move together,
        // and only while the stored status still matches.
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, status_history = status_history || $4::jsonb
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_str())
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(serde_json::to_value(&entry)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(id.as_str())
                    .fetch_optional(&self.pool)
                    .await?;

            return match actual {
                None => Err(StoreError::NotFound(format!("order {id}"))),
                Some(actual) => Err(StoreError::ConcurrencyConflict {
                    expected,
                    actual: actual.parse().map_err(invalid_column)?,
                }),
            };
        }

        metrics::counter!("store_status_updates").increment(1);
        tracing::debug!(order_id = %id, from = %expected, to = %new_status, "order status updated");
        self.refresh_feed().await
    }
}

/// PostgreSQL-backed conversation store.
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
    threads: Arc<Hub<Vec<Message>>>,
    summaries: Arc<watch::Sender<Vec<Conversation>>>,
}

fn counter_binds(op: Option<CounterOp>) -> (Option<&'static str>, Option<i32>) {
    match op {
        None => (None, None),
        Some(CounterOp::Increment) => (Some("increment"), None),
        Some(CounterOp::Set(value)) => (Some("set"), Some(value as i32)),
    }
}

impl PostgresConversationStore {
    /// Creates a new PostgreSQL conversation store.
    pub fn new(pool: PgPool) -> Self {
        let (summaries, _) = watch::channel(Vec::new());
        Self {
            pool,
            threads: Arc::new(Hub::new()),
            summaries: Arc::new(summaries),
        }
    }

    fn row_to_summary(row: PgRow) -> Result<Conversation> {
        let unread_by_admin: i32 = row.try_get("unread_by_admin")?;
        let unread_by_user: i32 = row.try_get("unread_by_user")?;

        Ok(Conversation {
            customer_id: CustomerId::new(row.try_get::<String, _>("customer_id")?),
            customer_name: row.try_get("customer_name")?,
            last_message: row.try_get("last_message")?,
            timestamp: row.try_get("timestamp")?,
            unread_by_admin: unread_by_admin.max(0) as u32,
            unread_by_user: unread_by_user.max(0) as u32,
            has_new_order: row.try_get("has_new_order")?,
            pending_order_id: row
                .try_get::<Option<String>, _>("pending_order_id")?
                .map(OrderId::new),
        })
    }

    fn row_to_message(row: PgRow) -> Result<Message> {
        let sender: String = row.try_get("sender")?;
        let sender: SenderRole = sender.parse().map_err(invalid_column)?;
        let snapshot: Option<serde_json::Value> = row.try_get("order_snapshot")?;

        Ok(Message {
            id: MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            sender,
            text: row.try_get("text")?,
            image_ref: row.try_get("image_ref")?,
            timestamp: row.try_get("timestamp")?,
            read: row.try_get("read")?,
            order_related: row.try_get("order_related")?,
            order_snapshot: snapshot.map(serde_json::from_value).transpose()?,
            instructions_sent: row.try_get("instructions_sent")?,
        })
    }

    async fn fetch_messages(&self, customer_id: &CustomerId) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender, text, image_ref, timestamp, read, order_related,
                   order_snapshot, instructions_sent
            FROM messages
            WHERE customer_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(customer_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn fetch_summaries(&self) -> Result<Vec<Conversation>> {
        let rows = sqlx::query(
            r#"
            SELECT customer_id, customer_name, last_message, timestamp,
                   unread_by_admin, unread_by_user, has_new_order, pending_order_id
            FROM conversations
            ORDER BY timestamp DESC, customer_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_summary).collect()
    }

    async fn publish_thread(&self, customer_id: &CustomerId) -> Result<()> {
        let snapshot = self.fetch_messages(customer_id).await?;
        self.threads.publish(customer_id, snapshot).await;
        Ok(())
    }

    async fn publish_summaries(&self) -> Result<()> {
        if self.summaries.receiver_count() > 0 {
            let snapshot = self.fetch_summaries().await?;
            self.summaries.send_replace(snapshot);
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn append(&self, customer_id: &CustomerId, message: Message) -> Result<MessageId> {
        if !message.has_content() {
            return Err(StoreError::EmptyMessage);
        }

        let snapshot_json = message
            .order_snapshot
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, customer_id, sender, text, image_ref, timestamp,
                                  read, order_related, order_snapshot, instructions_sent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(customer_id.as_str())
        .bind(message.sender.as_str())
        .bind(&message.text)
        .bind(&message.image_ref)
        .bind(message.timestamp)
        .bind(message.read)
        .bind(message.order_related)
        .bind(snapshot_json)
        .bind(message.instructions_sent)
        .execute(&self.pool)
        .await?;

        metrics::counter!("store_messages_appended").increment(1);
        self.publish_thread(customer_id).await?;
        Ok(message.id)
    }

    async fn upsert_summary(&self, customer_id: &CustomerId, patch: SummaryPatch) -> Result<()> {
        let (admin_mode, admin_value) = counter_binds(patch.unread_by_admin);
        let (user_mode, user_value) = counter_binds(patch.unread_by_user);

        // One statement, so racing upserts for the same customer settle on
        // the row lock and counter increments are database-side arithmetic.
        sqlx::query(
            r#"
            INSERT INTO conversations (customer_id, customer_name, last_message, timestamp,
                                       unread_by_admin, unread_by_user, has_new_order, pending_order_id)
            VALUES ($1, COALESCE($2, 'Customer'), $3, COALESCE($4, NOW()),
                    CASE WHEN $5 = 'increment' THEN 1 WHEN $5 = 'set' THEN $6 ELSE 0 END,
                    CASE WHEN $7 = 'increment' THEN 1 WHEN $7 = 'set' THEN $8 ELSE 0 END,
                    COALESCE($9, FALSE), $10)
            ON CONFLICT (customer_id) DO UPDATE SET
                customer_name = COALESCE($2, conversations.customer_name),
                last_message = COALESCE($3, conversations.last_message),
                timestamp = COALESCE($4, conversations.timestamp),
                unread_by_admin = CASE WHEN $5 = 'increment' THEN conversations.unread_by_admin + 1
                                       WHEN $5 = 'set' THEN $6
                                       ELSE conversations.unread_by_admin END,
                unread_by_user = CASE WHEN $7 = 'increment' THEN conversations.unread_by_user + 1
                                      WHEN $7 = 'set' THEN $8
                                      ELSE conversations.unread_by_user END,
                has_new_order = COALESCE($9, conversations.has_new_order),
                pending_order_id = COALESCE($10, conversations.pending_order_id)
            "#,
        )
        .bind(customer_id.as_str())
        .bind(&patch.customer_name)
        .bind(&patch.last_message)
        .bind(patch.timestamp)
        .bind(admin_mode)
        .bind(admin_value)
        .bind(user_mode)
        .bind(user_value)
        .bind(patch.has_new_order)
        .bind(patch.pending_order_id.as_ref().map(|id| id.as_str().to_string()))
        .execute(&self.pool)
        .await?;

        metrics::counter!("store_summary_upserts").increment(1);
        self.publish_summaries().await
    }

    async fn get_summary(&self, customer_id: &CustomerId) -> Result<Option<Conversation>> {
        let row = sqlx::query(
            r#"
            SELECT customer_id, customer_name, last_message, timestamp,
                   unread_by_admin, unread_by_user, has_new_order, pending_order_id
            FROM conversations
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_summary).transpose()
    }

    async fn list_summaries(&self) -> Result<Vec<Conversation>> {
        self.fetch_summaries().await
    }

    async fn messages(&self, customer_id: &CustomerId) -> Result<Vec<Message>> {
        self.fetch_messages(customer_id).await
    }

    async fn subscribe(&self, customer_id: &CustomerId) -> Result<MessageFeed> {
        let current = self.fetch_messages(customer_id).await?;
        Ok(self.threads.subscribe(customer_id, current).await)
    }

    async fn subscribe_all(&self) -> Result<SummaryFeed> {
        if self.summaries.receiver_count() == 0 {
            let snapshot = self.fetch_summaries().await?;
            self.summaries.send_replace(snapshot);
        }
        Ok(self.summaries.subscribe())
    }

    async fn mark_read(&self, customer_id: &CustomerId, role: SenderRole) -> Result<()> {
        let sql = match role {
            SenderRole::Admin => "UPDATE conversations SET unread_by_admin = 0 WHERE customer_id = $1",
            SenderRole::Customer => "UPDATE conversations SET unread_by_user = 0 WHERE customer_id = $1",
        };

        let result = sqlx::query(sql)
            .bind(customer_id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("conversation {customer_id}")));
        }
        self.publish_summaries().await
    }

    async fn clear_new_order_flag(&self, customer_id: &CustomerId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE conversations SET has_new_order = FALSE, pending_order_id = NULL WHERE customer_id = $1",
        )
        .bind(customer_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("conversation {customer_id}")));
        }
        self.publish_summaries().await
    }

    async fn set_instructions_sent(
        &self,
        customer_id: &CustomerId,
        message_id: &MessageId,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE messages SET instructions_sent = TRUE WHERE id = $1 AND customer_id = $2",
        )
        .bind(message_id.as_uuid())
        .bind(customer_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }
        self.publish_thread(customer_id).await
    }
}
