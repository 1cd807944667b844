//! Message thread view: one customer's conversation, opened by the operator.

use common::CustomerId;
use domain::{Message, SenderRole};
use store::{ConversationStore, MessageFeed, Result, StoreError};

/// Live view over one customer's message log, oldest first.
///
/// Opening the thread marks the admin side read, mirroring what happens
/// when the operator brings the chat on screen. A thread can be opened
/// before the customer has a summary record; in that case there is no
/// counter to clear yet.
pub struct MessageThread {
    customer_id: CustomerId,
    feed: MessageFeed,
}

impl MessageThread {
    /// Opens the thread and clears the admin unread counter.
    pub async fn open<C: ConversationStore>(store: &C, customer_id: &CustomerId) -> Result<Self> {
        let feed = store.subscribe(customer_id).await?;

        match store.mark_read(customer_id, SenderRole::Admin).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        tracing::debug!(customer_id = %customer_id, "thread opened");

        Ok(Self {
            customer_id: customer_id.clone(),
            feed,
        })
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    /// Latest snapshot of the log, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.feed.borrow().clone()
    }

    /// Waits for the next change to the log. Returns false when the store
    /// side has gone away.
    pub async fn changed(&mut self) -> bool {
        self.feed.changed().await.is_ok()
    }
}
