//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The fulfillment status of an order.
///
/// The forward sequence is fixed and total:
/// ```text
/// confirmation ──► shipping ──► receiving ──► completed ──► reviews
///       │              │             │
///       └──────────────┴─────────────┴──► cancelled
/// ```
/// `reviews` and `cancelled` are terminal. The serialized forms are the
/// wire-visible status vocabulary and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting confirmation by the shop.
    #[default]
    Confirmation,

    /// Order confirmed and handed to shipping.
    Shipping,

    /// Out for delivery.
    Receiving,

    /// Delivered to the customer.
    Completed,

    /// Awaiting customer feedback (terminal state).
    Reviews,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns the next status in the forward sequence, or `None` when no
    /// further advance exists.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Confirmation => Some(OrderStatus::Shipping),
            OrderStatus::Shipping => Some(OrderStatus::Receiving),
            OrderStatus::Receiving => Some(OrderStatus::Completed),
            OrderStatus::Completed => Some(OrderStatus::Reviews),
            OrderStatus::Reviews | OrderStatus::Cancelled => None,
        }
    }

    /// Returns true if this is a terminal state (no further advance possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Reviews | OrderStatus::Cancelled)
    }

    /// Returns true if the order can be cancelled from this state.
    ///
    /// Policy: cancellation is only permitted before the goods are handed
    /// over, i.e. from `confirmation`, `shipping`, and `receiving`. A
    /// completed order is a refund concern, not a cancellation.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmation | OrderStatus::Shipping | OrderStatus::Receiving
        )
    }

    /// Returns the wire-form status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmation => "confirmation",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Receiving => "receiving",
            OrderStatus::Completed => "completed",
            OrderStatus::Reviews => "reviews",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Returns the human-readable label used in notes and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Confirmation => "Confirmation",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Receiving => "Receiving",
            OrderStatus::Completed => "Completed",
            OrderStatus::Reviews => "Reviews",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmation" => Ok(OrderStatus::Confirmation),
            "shipping" => Ok(OrderStatus::Shipping),
            "receiving" => Ok(OrderStatus::Receiving),
            "completed" => Ok(OrderStatus::Completed),
            "reviews" => Ok(OrderStatus::Reviews),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}
