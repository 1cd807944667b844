use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, MessageId, OrderId};
use domain::{Conversation, Message, SenderRole};
use tokio::sync::watch;

use crate::Result;

/// Receiver carrying one customer's full message log, oldest first.
pub type MessageFeed = watch::Receiver<Vec<Message>>;

/// Receiver carrying all conversation summaries, most recent activity first.
pub type SummaryFeed = watch::Receiver<Vec<Conversation>>;

/// Relative or absolute change to an unread counter.
///
/// `Increment` is applied by the storage layer as a single atomic `+1`,
/// never as read-modify-write, so concurrent increments all land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    /// Overwrite the counter, typically `Set(0)` on a read receipt.
    Set(u32),
    /// Add one to whatever is stored.
    Increment,
}

/// Partial update for a conversation summary.
///
/// Absent fields are left untouched on merge. When the summary does not
/// exist yet it is created first with safe defaults (owner name from the
/// patch or `"Customer"`, zero counters) and the patch applied on top.
#[derive(Debug, Clone, Default)]
pub struct SummaryPatch {
    pub customer_name: Option<String>,
    pub last_message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub unread_by_admin: Option<CounterOp>,
    pub unread_by_user: Option<CounterOp>,
    pub has_new_order: Option<bool>,
    pub pending_order_id: Option<OrderId>,
}

impl SummaryPatch {
    /// Empty patch; merging it still creates a missing summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tail update carried by every outgoing notification: latest text and
    /// its timestamp.
    pub fn tail(last_message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            last_message: Some(last_message.into()),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn unread_by_admin(mut self, op: CounterOp) -> Self {
        self.unread_by_admin = Some(op);
        self
    }

    pub fn unread_by_user(mut self, op: CounterOp) -> Self {
        self.unread_by_user = Some(op);
        self
    }

    pub fn new_order(mut self, order_id: OrderId) -> Self {
        self.has_new_order = Some(true);
        self.pending_order_id = Some(order_id);
        self
    }
}

/// Store for conversation summaries and their message logs.
///
/// Summaries are keyed 1:1 by customer and created lazily; the log is
/// append-only except for the `read` and `instructions_sent` flags.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a message to the customer's log. Succeeds whether or not a
    /// summary exists yet. Rejects messages carrying neither text nor an
    /// image reference.
    async fn append(&self, customer_id: &CustomerId, message: Message) -> Result<MessageId>;

    /// Atomic create-if-absent-else-merge of the summary record. Racing
    /// upserts for the same customer produce exactly one summary.
    async fn upsert_summary(&self, customer_id: &CustomerId, patch: SummaryPatch) -> Result<()>;

    /// Fetches one summary, if the conversation has one.
    async fn get_summary(&self, customer_id: &CustomerId) -> Result<Option<Conversation>>;

    /// All summaries, most recent activity first.
    async fn list_summaries(&self) -> Result<Vec<Conversation>>;

    /// One customer's log, oldest first.
    async fn messages(&self, customer_id: &CustomerId) -> Result<Vec<Message>>;

    /// Subscribes to one customer's message log.
    async fn subscribe(&self, customer_id: &CustomerId) -> Result<MessageFeed>;

    /// Subscribes to the summary collection.
    async fn subscribe_all(&self) -> Result<SummaryFeed>;

    /// Zeroes the unread counter belonging to `role`. Counters only; the
    /// other side's count and the log are untouched.
    async fn mark_read(&self, customer_id: &CustomerId, role: SenderRole) -> Result<()>;

    /// Resets `has_new_order` and `pending_order_id` once the new order has
    /// been acted upon.
    async fn clear_new_order_flag(&self, customer_id: &CustomerId) -> Result<()>;

    /// Marks an order message as processed (payment instructions sent).
    async fn set_instructions_sent(
        &self,
        customer_id: &CustomerId,
        message_id: &MessageId,
    ) -> Result<()>;
}
