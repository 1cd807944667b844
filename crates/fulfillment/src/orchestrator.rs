//! Orchestrates order status changes and their customer notifications.

use common::{CustomerId, MessageId, OrderId};
use domain::{
    Message, OperatorContext, Order, OrderStatus, SenderRole, compose,
};
use serde::Serialize;
use store::{ConversationStore, CounterOp, OrderStore, StoreError, SummaryPatch};

use crate::error::{FulfillmentError, Result};

/// Outcome of a status change that was accepted.
///
/// The status write and the notification write hit different documents and
/// are not atomic together, so a notification failure after the status has
/// moved is reported as its own outcome rather than rolled back or hidden.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum AdvanceOutcome {
    /// Status moved and the customer notification landed.
    #[serde(rename_all = "camelCase")]
    Completed {
        new_status: OrderStatus,
        notification: String,
    },
    /// Status moved but the conversation writes failed.
    #[serde(rename_all = "camelCase")]
    NotificationFailed {
        new_status: OrderStatus,
        reason: String,
    },
}

/// Drives orders through the status sequence and keeps the customer's
/// conversation in step.
///
/// Every mutation takes an explicit [`OperatorContext`] and is gated on the
/// operator's role before any I/O.
pub struct Orchestrator<O, C>
where
    O: OrderStore,
    C: ConversationStore,
{
    orders: O,
    conversations: C,
}

impl<O, C> Orchestrator<O, C>
where
    O: OrderStore,
    C: ConversationStore,
{
    /// Creates a new orchestrator over the two stores.
    pub fn new(orders: O, conversations: C) -> Self {
        Self {
            orders,
            conversations,
        }
    }

    /// Moves an order one step forward and notifies the customer.
    ///
    /// Rejections (unknown order, terminal or concurrently-moved status,
    /// insufficient role, store outage before the status write) return
    /// `Err` with nothing written. Once the status write has committed the
    /// call returns `Ok`; a failure in the notification writes yields
    /// [`AdvanceOutcome::NotificationFailed`] with the status change kept.
    #[tracing::instrument(skip(self, ctx), fields(operator = %ctx.operator_id))]
    pub async fn advance_and_notify(
        &self,
        order_id: &OrderId,
        ctx: &OperatorContext,
    ) -> Result<AdvanceOutcome> {
        self.authorize(ctx)?;
        metrics::counter!("fulfillment_advances_total").increment(1);
        let started = std::time::Instant::now();

        let order = self.load(order_id).await?;
        let (new_status, entry) = order.advance()?;

        self.orders
            .update_status(order_id, order.status, new_status, entry)
            .await?;
        metrics::counter!("fulfillment_status_changes").increment(1);
        tracing::info!(%order_id, from = %order.status, to = %new_status, "order advanced");

        let notification = compose(new_status, &order);
        let outcome = self.deliver(&order, new_status, notification).await;
        metrics::histogram!("fulfillment_advance_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Cancels an order and notifies the customer.
    ///
    /// Permitted only before the order is completed; same outcome shape as
    /// [`advance_and_notify`](Self::advance_and_notify).
    #[tracing::instrument(skip(self, ctx), fields(operator = %ctx.operator_id))]
    pub async fn cancel_and_notify(
        &self,
        order_id: &OrderId,
        reason: &str,
        ctx: &OperatorContext,
    ) -> Result<AdvanceOutcome> {
        self.authorize(ctx)?;
        metrics::counter!("fulfillment_cancellations_total").increment(1);

        let order = self.load(order_id).await?;
        let entry = order.cancel(reason)?;

        self.orders
            .update_status(order_id, order.status, OrderStatus::Cancelled, entry)
            .await?;
        tracing::info!(%order_id, from = %order.status, reason, "order cancelled");

        let notification = compose(OrderStatus::Cancelled, &order);
        Ok(self.deliver(&order, OrderStatus::Cancelled, notification).await)
    }

    /// Sends an admin text message into a customer's conversation.
    #[tracing::instrument(skip(self, text, ctx), fields(operator = %ctx.operator_id))]
    pub async fn send_admin_message(
        &self,
        customer_id: &CustomerId,
        text: &str,
        ctx: &OperatorContext,
    ) -> Result<MessageId> {
        self.authorize(ctx)?;

        let message = Message::text(SenderRole::Admin, text);
        let timestamp = message.timestamp;
        let id = self.conversations.append(customer_id, message).await?;
        self.conversations
            .upsert_summary(
                customer_id,
                SummaryPatch::tail(text, timestamp)
                    .unread_by_user(CounterOp::Increment)
                    .unread_by_admin(CounterOp::Set(0)),
            )
            .await?;
        Ok(id)
    }

    /// Sends an admin image message. The summary tail shows an image
    /// placeholder instead of message text.
    #[tracing::instrument(skip(self, image_ref, ctx), fields(operator = %ctx.operator_id))]
    pub async fn send_admin_image(
        &self,
        customer_id: &CustomerId,
        image_ref: &str,
        ctx: &OperatorContext,
    ) -> Result<MessageId> {
        self.authorize(ctx)?;

        let message = Message::image(SenderRole::Admin, image_ref);
        let timestamp = message.timestamp;
        let id = self.conversations.append(customer_id, message).await?;
        self.conversations
            .upsert_summary(
                customer_id,
                SummaryPatch::tail("📷 Image", timestamp)
                    .unread_by_user(CounterOp::Increment)
                    .unread_by_admin(CounterOp::Set(0)),
            )
            .await?;
        Ok(id)
    }

    /// Clears the new-order flag once payment instructions have gone out.
    pub async fn acknowledge_new_order(
        &self,
        customer_id: &CustomerId,
        ctx: &OperatorContext,
    ) -> Result<()> {
        self.authorize(ctx)?;
        self.conversations.clear_new_order_flag(customer_id).await?;
        Ok(())
    }

    /// Marks an order message as processed.
    pub async fn mark_order_processed(
        &self,
        customer_id: &CustomerId,
        message_id: &MessageId,
        ctx: &OperatorContext,
    ) -> Result<()> {
        self.authorize(ctx)?;
        self.conversations
            .set_instructions_sent(customer_id, message_id)
            .await?;
        Ok(())
    }

    fn authorize(&self, ctx: &OperatorContext) -> Result<()> {
        if !ctx.role.can_manage_orders() {
            return Err(FulfillmentError::Unauthorized {
                operator_id: ctx.operator_id.clone(),
                role: ctx.role,
            });
        }
        Ok(())
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order> {
        match self.orders.get(order_id).await {
            Ok(order) => Ok(order),
            Err(StoreError::NotFound(_)) => {
                Err(FulfillmentError::OrderNotFound(order_id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the notification message and bumps the conversation summary.
    /// Runs after the status write has committed, so failures here become a
    /// `NotificationFailed` outcome rather than an error.
    async fn deliver(
        &self,
        order: &Order,
        new_status: OrderStatus,
        notification: String,
    ) -> AdvanceOutcome {
        let message = Message::text(SenderRole::Admin, notification.clone());
        let timestamp = message.timestamp;

        let written = async {
            self.conversations
                .append(&order.customer_id, message)
                .await?;
            self.conversations
                .upsert_summary(
                    &order.customer_id,
                    SummaryPatch::tail(notification.clone(), timestamp)
                        .customer_name(order.contact_name())
                        .unread_by_user(CounterOp::Increment)
                        .unread_by_admin(CounterOp::Set(0)),
                )
                .await
        }
        .await;

        match written {
            Ok(()) => AdvanceOutcome::Completed {
                new_status,
                notification,
            },
            Err(err) => {
                metrics::counter!("fulfillment_notification_failures").increment(1);
                tracing::warn!(
                    order_id = %order.id,
                    status = %new_status,
                    error = %err,
                    "status changed but notification was not delivered"
                );
                AdvanceOutcome::NotificationFailed {
                    new_status,
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::OperatorId;
    use domain::{Money, OrderItem, Role};
    use store::{InMemoryConversationStore, InMemoryOrderStore};

    use super::*;

    fn admin_ctx() -> OperatorContext {
        OperatorContext::new(OperatorId::new("op-1"), Role::Admin)
    }

    fn orchestrator() -> Orchestrator<InMemoryOrderStore, InMemoryConversationStore> {
        Orchestrator::new(InMemoryOrderStore::new(), InMemoryConversationStore::new())
    }

    fn placed_order(id: &str) -> Order {
        Order::place(
            OrderId::new(id),
            CustomerId::new("user-1"),
            vec![OrderItem::new("Bamboo Chair", 2, Money::from_pesos(750))],
            Money::from_pesos(1500),
        )
    }

    #[tokio::test]
    async fn customer_role_is_rejected_before_io() {
        let orch = orchestrator();
        let ctx = OperatorContext::new(OperatorId::new("cust-1"), Role::Customer);

        // Not even OrderNotFound: the role gate comes first.
        let result = orch
            .advance_and_notify(&OrderId::new("missing"), &ctx)
            .await;
        assert!(matches!(
            result,
            Err(FulfillmentError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn staff_role_is_accepted() {
        let orch = orchestrator();
        orch.orders.insert(placed_order("order-1")).await.unwrap();
        let ctx = OperatorContext::new(OperatorId::new("staff-1"), Role::Staff);

        let outcome = orch
            .advance_and_notify(&OrderId::new("order-1"), &ctx)
            .await
            .unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let orch = orchestrator();
        let result = orch
            .advance_and_notify(&OrderId::new("missing"), &admin_ctx())
            .await;
        assert!(matches!(result, Err(FulfillmentError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn lost_race_surfaces_as_invalid_transition() {
        let orch = orchestrator();
        let order = placed_order("order-1");
        orch.orders.insert(order.clone()).await.unwrap();

        // Another writer moves the order between our load and our write.
        let (next, entry) = order.advance().unwrap();
        orch.orders
            .update_status(&order.id, order.status, next, entry)
            .await
            .unwrap();

        // Force a stale expectation by replaying the same advance.
        let (next, entry) = order.advance().unwrap();
        let stale = orch
            .orders
            .update_status(&order.id, order.status, next, entry)
            .await
            .map_err(FulfillmentError::from);

        assert!(matches!(
            stale,
            Err(FulfillmentError::InvalidTransition {
                current: OrderStatus::Shipping
            })
        ));
    }
}
