//! The order document and its transition commands.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderItem, OrderStatus};

/// One entry in an order's status history.
///
/// The history is append-only and non-decreasing by timestamp; entries are
/// never edited or reordered after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    #[serde(with = "common::stored_datetime")]
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

impl StatusHistoryEntry {
    /// Creates a history entry stamped with the current time.
    pub fn now(status: OrderStatus, note: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            note: note.into(),
        }
    }
}

/// An order as stored in the order collection.
///
/// Created by the checkout collaborator in `confirmation` state; mutated only
/// through [`Order::advance`] / [`Order::cancel`] applied by the fulfillment
/// orchestrator; never deleted. The serialized field names match the stored
/// document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,

    /// Contact field from checkout; the local part seeds the conversation
    /// owner name when one is lazily created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    pub status: OrderStatus,

    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,

    pub items: Vec<OrderItem>,

    /// Expected to equal the sum of line totals, but not enforced here;
    /// checkout owns that invariant.
    pub total_amount: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    #[serde(with = "common::stored_datetime")]
    pub order_date: DateTime<Utc>,
}

impl Order {
    /// Creates a freshly placed order in `confirmation` state with its
    /// initial history entry. This is the checkout collaborator's side of
    /// the contract, used by tests and the order-creation endpoint.
    pub fn place(
        id: OrderId,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        total_amount: Money,
    ) -> Self {
        let status = OrderStatus::Confirmation;
        Self {
            id,
            customer_id,
            customer_email: None,
            status,
            status_history: vec![StatusHistoryEntry::now(
                status,
                format!("Status updated to {}", status.label()),
            )],
            items,
            total_amount,
            delivery_address: None,
            payment_method: None,
            order_date: Utc::now(),
        }
    }

    /// Returns the number of line items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validates a forward advance and produces the resulting status and
    /// history entry.
    ///
    /// Pure with respect to storage: the caller persists the new status and
    /// the entry together in a single conditional write. Knows nothing of
    /// notifications.
    pub fn advance(&self) -> Result<(OrderStatus, StatusHistoryEntry), OrderError> {
        let next = self
            .status
            .next()
            .ok_or(OrderError::InvalidTransition {
                current: self.status,
            })?;

        let entry =
            StatusHistoryEntry::now(next, format!("Status updated to {}", next.label()));
        Ok((next, entry))
    }

    /// Validates cancellation and produces the history entry recording it.
    pub fn cancel(&self, reason: &str) -> Result<StatusHistoryEntry, OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::CancelNotAllowed {
                current: self.status,
            });
        }

        Ok(StatusHistoryEntry::now(
            OrderStatus::Cancelled,
            format!("Order cancelled: {reason}"),
        ))
    }

    /// Default conversation owner name for this order's customer: the local
    /// part of the contact email, or `"Customer"` when absent.
    pub fn contact_name(&self) -> String {
        self.customer_email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|part| !part.is_empty())
            .unwrap_or("Customer")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed_order() -> Order {
        Order::place(
            OrderId::new("abc12345"),
            CustomerId::new("user-1"),
            vec![
                OrderItem::new("Bamboo chair", 1, Money::from_pesos(1000)),
                OrderItem::new("Rattan lamp", 1, Money::from_pesos(500)),
            ],
            Money::from_pesos(1500),
        )
    }

    #[test]
    fn placed_order_starts_in_confirmation() {
        let order = placed_order();
        assert_eq!(order.status, OrderStatus::Confirmation);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.status_history[0].status, OrderStatus::Confirmation);
        assert_eq!(order.status_history[0].note, "Status updated to Confirmation");
    }

    #[test]
    fn advance_produces_next_status_and_note() {
        let order = placed_order();
        let (next, entry) = order.advance().unwrap();
        assert_eq!(next, OrderStatus::Shipping);
        assert_eq!(entry.status, OrderStatus::Shipping);
        assert_eq!(entry.note, "Status updated to Shipping");
    }

    #[test]
    fn advance_rejected_in_terminal_states() {
        let mut order = placed_order();

        order.status = OrderStatus::Reviews;
        assert!(matches!(
            order.advance(),
            Err(OrderError::InvalidTransition {
                current: OrderStatus::Reviews
            })
        ));

        order.status = OrderStatus::Cancelled;
        assert!(matches!(
            order.advance(),
            Err(OrderError::InvalidTransition {
                current: OrderStatus::Cancelled
            })
        ));
    }

    #[test]
    fn advance_does_not_mutate_the_order() {
        let order = placed_order();
        let _ = order.advance().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmation);
        assert_eq!(order.status_history.len(), 1);
    }

    #[test]
    fn cancel_allowed_before_completion() {
        let mut order = placed_order();
        let entry = order.cancel("Customer changed mind").unwrap();
        assert_eq!(entry.status, OrderStatus::Cancelled);
        assert_eq!(entry.note, "Order cancelled: Customer changed mind");

        order.status = OrderStatus::Receiving;
        assert!(order.cancel("late").is_ok());
    }

    #[test]
    fn cancel_rejected_after_completion() {
        let mut order = placed_order();
        order.status = OrderStatus::Completed;
        assert!(matches!(
            order.cancel("too late"),
            Err(OrderError::CancelNotAllowed {
                current: OrderStatus::Completed
            })
        ));
    }

    #[test]
    fn contact_name_defaults() {
        let mut order = placed_order();
        assert_eq!(order.contact_name(), "Customer");

        order.customer_email = Some("maria.santos@example.com".to_string());
        assert_eq!(order.contact_name(), "maria.santos");
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let order = placed_order();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "confirmation");
        assert_eq!(json["totalAmount"], 150_000);
        assert!(json["statusHistory"].is_array());
        assert!(json["orderDate"].is_string());
        assert_eq!(json["customerId"], "user-1");
    }

    #[test]
    fn history_statuses_follow_the_forward_order() {
        let mut order = placed_order();
        loop {
            match order.advance() {
                Ok((next, entry)) => {
                    order.status = next;
                    order.status_history.push(entry);
                }
                Err(_) => break,
            }
        }

        let statuses: Vec<_> = order.status_history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Confirmation,
                OrderStatus::Shipping,
                OrderStatus::Receiving,
                OrderStatus::Completed,
                OrderStatus::Reviews,
            ]
        );
        for pair in order.status_history.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }
}
