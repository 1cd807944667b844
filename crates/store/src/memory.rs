use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, MessageId, OrderId};
use domain::{Conversation, Message, Order, OrderStatus, SenderRole, StatusHistoryEntry};
use tokio::sync::{RwLock, watch};

use crate::{
    ConversationStore, CounterOp, MessageFeed, OrderFeed, OrderStore, Result, StoreError,
    SummaryFeed, SummaryPatch, feed::Hub,
};

/// In-memory order store.
///
/// Same interface and write semantics as the PostgreSQL implementation,
/// with switches for injecting outages in partial-failure tests.
#[derive(Clone)]
pub struct InMemoryOrderStore {
    inner: Arc<OrderInner>,
}

struct OrderInner {
    state: RwLock<OrderState>,
    feed: watch::Sender<Vec<Order>>,
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_update: bool,
}

impl OrderState {
    /// Collection snapshot, newest first.
    fn snapshot(&self) -> Vec<Order> {
        let mut orders: Vec<_> = self.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });
        orders
    }
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(OrderInner {
                state: RwLock::new(OrderState::default()),
                feed,
            }),
        }
    }

    /// Configures the store to fail status updates with `Unavailable`.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.inner.state.write().await.fail_on_update = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.state.read().await.orders.len()
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            state.orders.insert(order.id.clone(), order);
            state.snapshot()
        };
        self.inner.feed.send_replace(snapshot);
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        let state = self.inner.state.read().await;
        state
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.inner.state.read().await.snapshot())
    }

    async fn subscribe(&self) -> Result<OrderFeed> {
        Ok(self.inner.feed.subscribe())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        entry: StatusHistoryEntry,
    ) -> Result<()> {
        let snapshot = {
            let mut state = self.inner.state.write().await;

            if state.fail_on_update {
                return Err(StoreError::Unavailable(
                    "injected order store outage".to_string(),
                ));
            }

            let order = state
                .orders
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;

            if order.status != expected {
                return Err(StoreError::ConcurrencyConflict {
                    expected,
                    actual: order.status,
                });
            }

            order.status = new_status;
            order.status_history.push(entry);
            state.snapshot()
        };
        self.inner.feed.send_replace(snapshot);
        Ok(())
    }
}

/// In-memory conversation store.
#[derive(Clone)]
pub struct InMemoryConversationStore {
    inner: Arc<ConversationInner>,
}

struct ConversationInner {
    state: RwLock<ConversationState>,
    threads: Hub<Vec<Message>>,
    summaries: watch::Sender<Vec<Conversation>>,
}

#[derive(Default)]
struct ConversationState {
    threads: HashMap<CustomerId, Thread>,
    fail_on_append: bool,
    fail_on_upsert: bool,
}

/// One customer's channel: the log may exist before the summary does.
#[derive(Default)]
struct Thread {
    summary: Option<Conversation>,
    messages: Vec<Message>,
}

impl ConversationState {
    /// Summary snapshot, most recent activity first.
    fn summary_snapshot(&self) -> Vec<Conversation> {
        let mut summaries: Vec<_> = self
            .threads
            .values()
            .filter_map(|t| t.summary.clone())
            .collect();
        summaries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.customer_id.as_str().cmp(a.customer_id.as_str()))
        });
        summaries
    }
}

/// Merges a patch into a summary. Absent fields stay put; counter ops apply
/// on top of whatever is stored.
fn apply_patch(summary: &mut Conversation, patch: SummaryPatch) {
    if let Some(name) = patch.customer_name {
        summary.customer_name = name;
    }
    if let Some(text) = patch.last_message {
        summary.last_message = Some(text);
    }
    if let Some(ts) = patch.timestamp {
        summary.timestamp = ts;
    }
    if let Some(op) = patch.unread_by_admin {
        apply_counter(&mut summary.unread_by_admin, op);
    }
    if let Some(op) = patch.unread_by_user {
        apply_counter(&mut summary.unread_by_user, op);
    }
    if let Some(flag) = patch.has_new_order {
        summary.has_new_order = flag;
    }
    if let Some(order_id) = patch.pending_order_id {
        summary.pending_order_id = Some(order_id);
    }
}

fn apply_counter(counter: &mut u32, op: CounterOp) {
    match op {
        CounterOp::Set(value) => *counter = value,
        CounterOp::Increment => *counter = counter.saturating_add(1),
    }
}

impl InMemoryConversationStore {
    /// Creates a new empty in-memory conversation store.
    pub fn new() -> Self {
        let (summaries, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(ConversationInner {
                state: RwLock::new(ConversationState::default()),
                threads: Hub::new(),
                summaries,
            }),
        }
    }

    /// Configures the store to fail message appends with `Unavailable`.
    pub async fn set_fail_on_append(&self, fail: bool) {
        self.inner.state.write().await.fail_on_append = fail;
    }

    /// Configures the store to fail summary upserts with `Unavailable`.
    pub async fn set_fail_on_upsert(&self, fail: bool) {
        self.inner.state.write().await.fail_on_upsert = fail;
    }

    /// Returns the number of messages in one customer's log.
    pub async fn message_count(&self, customer_id: &CustomerId) -> usize {
        self.inner
            .state
            .read()
            .await
            .threads
            .get(customer_id)
            .map(|t| t.messages.len())
            .unwrap_or(0)
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, customer_id: &CustomerId, message: Message) -> Result<MessageId> {
        if !message.has_content() {
            return Err(StoreError::EmptyMessage);
        }

        let message_id = message.id;
        let snapshot = {
            let mut state = self.inner.state.write().await;

            if state.fail_on_append {
                return Err(StoreError::Unavailable(
                    "injected conversation store outage".to_string(),
                ));
            }

            let thread = state.threads.entry(customer_id.clone()).or_default();
            thread.messages.push(message);
            thread.messages.sort_by_key(|m| m.timestamp);
            thread.messages.clone()
        };
        self.inner.threads.publish(customer_id, snapshot).await;
        Ok(message_id)
    }

    async fn upsert_summary(&self, customer_id: &CustomerId, patch: SummaryPatch) -> Result<()> {
        let snapshot = {
            let mut state = self.inner.state.write().await;

            if state.fail_on_upsert {
                return Err(StoreError::Unavailable(
                    "injected conversation store outage".to_string(),
                ));
            }

            let thread = state.threads.entry(customer_id.clone()).or_default();
            let summary = thread.summary.get_or_insert_with(|| {
                Conversation::new(
                    customer_id.clone(),
                    patch.customer_name.clone().unwrap_or_else(|| "Customer".to_string()),
                )
            });
            apply_patch(summary, patch);
            state.summary_snapshot()
        };
        self.inner.summaries.send_replace(snapshot);
        Ok(())
    }

    async fn get_summary(&self, customer_id: &CustomerId) -> Result<Option<Conversation>> {
        let state = self.inner.state.read().await;
        Ok(state
            .threads
            .get(customer_id)
            .and_then(|t| t.summary.clone()))
    }

    async fn list_summaries(&self) -> Result<Vec<Conversation>> {
        Ok(self.inner.state.read().await.summary_snapshot())
    }

    async fn messages(&self, customer_id: &CustomerId) -> Result<Vec<Message>> {
        let state = self.inner.state.read().await;
        Ok(state
            .threads
            .get(customer_id)
            .map(|t| t.messages.clone())
            .unwrap_or_default())
    }

    async fn subscribe(&self, customer_id: &CustomerId) -> Result<MessageFeed> {
        let current = self.messages(customer_id).await?;
        Ok(self.inner.threads.subscribe(customer_id, current).await)
    }

    async fn subscribe_all(&self) -> Result<SummaryFeed> {
        Ok(self.inner.summaries.subscribe())
    }

    async fn mark_read(&self, customer_id: &CustomerId, role: SenderRole) -> Result<()> {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            let summary = state
                .threads
                .get_mut(customer_id)
                .and_then(|t| t.summary.as_mut())
                .ok_or_else(|| StoreError::NotFound(format!("conversation {customer_id}")))?;

            match role {
                SenderRole::Admin => summary.unread_by_admin = 0,
                SenderRole::Customer => summary.unread_by_user = 0,
            }
            state.summary_snapshot()
        };
        self.inner.summaries.send_replace(snapshot);
        Ok(())
    }

    async fn clear_new_order_flag(&self, customer_id: &CustomerId) -> Result<()> {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            let summary = state
                .threads
                .get_mut(customer_id)
                .and_then(|t| t.summary.as_mut())
                .ok_or_else(|| StoreError::NotFound(format!("conversation {customer_id}")))?;

            summary.has_new_order = false;
            summary.pending_order_id = None;
            state.summary_snapshot()
        };
        self.inner.summaries.send_replace(snapshot);
        Ok(())
    }

    async fn set_instructions_sent(
        &self,
        customer_id: &CustomerId,
        message_id: &MessageId,
    ) -> Result<()> {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            let thread = state
                .threads
                .get_mut(customer_id)
                .ok_or_else(|| StoreError::NotFound(format!("conversation {customer_id}")))?;

            let message = thread
                .messages
                .iter_mut()
                .find(|m| m.id == *message_id)
                .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))?;

            message.instructions_sent = true;
            thread.messages.clone()
        };
        self.inner.threads.publish(customer_id, snapshot).await;
        Ok(())
    }
}
