use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderStatus, StatusHistoryEntry};
use tokio::sync::watch;

use crate::Result;

/// Receiver carrying the full order collection, `order_date` descending,
/// re-sent on every change.
pub type OrderFeed = watch::Receiver<Vec<Order>>;

/// Store for order documents.
///
/// `insert` stands in for the checkout collaborator; everything else is the
/// fulfillment side. Status and history always persist together in a single
/// document write.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order document under its id.
    async fn insert(&self, order: Order) -> Result<()>;

    /// Fetches one order, or `NotFound`.
    async fn get(&self, id: &OrderId) -> Result<Order>;

    /// Returns all orders, newest first.
    async fn list(&self) -> Result<Vec<Order>>;

    /// Subscribes to the full order collection. The receiver starts at the
    /// current snapshot and is woken on every subsequent write through this
    /// store.
    async fn subscribe(&self) -> Result<OrderFeed>;

    /// Conditionally moves an order to `new_status` and appends `entry` to
    /// its history, in one write.
    ///
    /// The update applies only while the stored status still equals
    /// `expected`; a lost race fails with `ConcurrencyConflict` carrying the
    /// status actually found, and nothing is written.
    async fn update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        entry: StatusHistoryEntry,
    ) -> Result<()>;
}
