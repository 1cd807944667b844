//! Conversation list view: the operator's chat sidebar.

use domain::Conversation;
use store::{ConversationStore, Result, SummaryFeed};

/// Live view over the conversation summaries.
///
/// The feed arrives sorted by most recent activity; this view layers search
/// and badge queries on top without touching the store.
pub struct ConversationList {
    feed: SummaryFeed,
}

impl ConversationList {
    /// Attaches a list to a store's summary feed.
    pub async fn attach<C: ConversationStore>(store: &C) -> Result<Self> {
        let feed = store.subscribe_all().await?;
        Ok(Self { feed })
    }

    /// Latest snapshot, most recent activity first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.feed.borrow().clone()
    }

    /// Case-insensitive substring search on the customer name, preserving
    /// recency order.
    pub fn search(&self, query: &str) -> Vec<Conversation> {
        let needle = query.to_lowercase();
        self.feed
            .borrow()
            .iter()
            .filter(|c| c.customer_name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Conversations flagged with a new order awaiting payment instructions.
    pub fn with_new_orders(&self) -> Vec<Conversation> {
        self.feed
            .borrow()
            .iter()
            .filter(|c| c.has_new_order)
            .cloned()
            .collect()
    }

    /// Total unread messages on the admin side, for the sidebar badge.
    pub fn admin_unread_total(&self) -> u32 {
        self.feed.borrow().iter().map(|c| c.unread_by_admin).sum()
    }

    /// Waits for the next summary change. Returns false when the store side
    /// has gone away.
    pub async fn changed(&mut self) -> bool {
        self.feed.changed().await.is_ok()
    }
}
