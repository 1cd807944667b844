//! Order board view: the operator's paginated, filterable order list.

use std::collections::HashMap;

use domain::{Order, OrderStatus};
use serde::Serialize;
use store::{OrderFeed, OrderStore, Result};

/// Orders shown per page, matching the admin board layout.
pub const PAGE_SIZE: usize = 6;

/// One page of the board, with enough context to render pagination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// 1-based page number.
    pub page: usize,
    pub total_pages: usize,
    pub total_orders: usize,
}

/// Live view over the order collection.
///
/// Holds a subscription to the store's order feed; queries read the latest
/// snapshot without touching the store. Read-only: the board never writes
/// status or history.
pub struct OrderBoard {
    feed: OrderFeed,
}

impl OrderBoard {
    /// Attaches a board to a store's live feed.
    pub async fn attach<O: OrderStore>(store: &O) -> Result<Self> {
        let feed = store.subscribe().await?;
        Ok(Self { feed })
    }

    /// Latest full snapshot, newest first.
    pub fn orders(&self) -> Vec<Order> {
        self.feed.borrow().clone()
    }

    /// Orders in one status, newest first.
    pub fn orders_with_status(&self, status: OrderStatus) -> Vec<Order> {
        self.feed
            .borrow()
            .iter()
            .filter(|o| o.status == status)
            .cloned()
            .collect()
    }

    /// Per-status counts for the board's tab badges.
    pub fn status_counts(&self) -> HashMap<OrderStatus, usize> {
        let mut counts = HashMap::new();
        for order in self.feed.borrow().iter() {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        counts
    }

    /// One page of the board, optionally filtered by status. Pages are
    /// 1-based; out-of-range pages come back empty with the real totals.
    pub fn page(&self, filter: Option<OrderStatus>, page: usize) -> OrderPage {
        let filtered: Vec<Order> = self
            .feed
            .borrow()
            .iter()
            .filter(|o| filter.is_none_or(|status| o.status == status))
            .cloned()
            .collect();

        let total_orders = filtered.len();
        let total_pages = total_orders.div_ceil(PAGE_SIZE).max(1);
        let page = page.max(1);
        let orders = filtered
            .into_iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect();

        OrderPage {
            orders,
            page,
            total_pages,
            total_orders,
        }
    }

    /// Waits for the next change to the underlying collection. Returns
    /// false when the store side has gone away.
    pub async fn changed(&mut self) -> bool {
        self.feed.changed().await.is_ok()
    }
}
