//! Conversation and message model.
//!
//! A conversation is the per-customer channel: one summary record plus an
//! append-only message log ordered by timestamp. The summary mirrors the
//! log's tail (`last_message`, `timestamp`) and carries the unread counters
//! for both sides.

use chrono::{DateTime, Utc};
use common::{CustomerId, MessageId, OrderId};
use serde::{Deserialize, Serialize};

use crate::order::{Money, Order, OrderItem};

/// Which side of the conversation produced a message, and whose unread
/// counter a read receipt clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Admin,
    Customer,
}

impl SenderRole {
    /// Wire form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Admin => "admin",
            SenderRole::Customer => "customer",
        }
    }
}

impl std::fmt::Display for SenderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SenderRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(SenderRole::Admin),
            "customer" => Ok(SenderRole::Customer),
            other => Err(format!("unknown sender role: {other}")),
        }
    }
}

/// Conversation summary record, keyed 1:1 by customer.
///
/// Created lazily on first message if absent; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub customer_id: CustomerId,
    pub customer_name: String,

    /// Text of the most recent message; mirrors the log tail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,

    /// Time of the last message.
    #[serde(with = "common::stored_datetime")]
    pub timestamp: DateTime<Utc>,

    pub unread_by_admin: u32,
    pub unread_by_user: u32,

    /// Set by the order-placement path; cleared by the fulfillment core once
    /// the order has been acted upon.
    #[serde(default)]
    pub has_new_order: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_order_id: Option<OrderId>,
}

impl Conversation {
    /// A brand-new thread with safe defaults: empty tail, zero unread on
    /// both sides.
    pub fn new(customer_id: CustomerId, customer_name: impl Into<String>) -> Self {
        Self {
            customer_id,
            customer_name: customer_name.into(),
            last_message: None,
            timestamp: Utc::now(),
            unread_by_admin: 0,
            unread_by_user: 0,
            has_new_order: false,
            pending_order_id: None,
        }
    }
}

/// Denormalized copy of an order attached to an order-related message at
/// send time, so the thread renders the order as it was then.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
}

impl From<&Order> for OrderSnapshot {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            items: order.items.clone(),
            total_amount: order.total_amount,
            delivery_address: order.delivery_address.clone(),
        }
    }
}

/// A single message in a conversation log.
///
/// Invariant: every message carries `text` or `image_ref` (or both). The
/// constructors below are the only way to build one, so the invariant holds
/// by construction; stores re-validate on append as a backstop. After
/// insertion only `read` and `instructions_sent` are ever mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender: SenderRole,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    #[serde(with = "common::stored_datetime")]
    pub timestamp: DateTime<Utc>,
    pub read: bool,

    /// True for messages produced by the order-placement path and rendered
    /// as an order card rather than a bubble.
    #[serde(default)]
    pub order_related: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_snapshot: Option<OrderSnapshot>,

    /// Processing flag: set once payment instructions have been sent for an
    /// order-related message.
    #[serde(default)]
    pub instructions_sent: bool,
}

impl Message {
    /// A plain text message.
    pub fn text(sender: SenderRole, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            text: Some(text.into()),
            image_ref: None,
            timestamp: Utc::now(),
            read: false,
            order_related: false,
            order_snapshot: None,
            instructions_sent: false,
        }
    }

    /// An image message with no text.
    pub fn image(sender: SenderRole, image_ref: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            text: None,
            image_ref: Some(image_ref.into()),
            timestamp: Utc::now(),
            read: false,
            order_related: false,
            order_snapshot: None,
            instructions_sent: false,
        }
    }

    /// The order-placement message carrying a denormalized order snapshot.
    pub fn order_placed(order: &Order) -> Self {
        Self {
            id: MessageId::new(),
            sender: SenderRole::Customer,
            text: Some("New Order Placed".to_string()),
            image_ref: None,
            timestamp: Utc::now(),
            read: false,
            order_related: true,
            order_snapshot: Some(OrderSnapshot::from(order)),
            instructions_sent: false,
        }
    }

    /// Returns true if the message satisfies the text-or-image invariant.
    pub fn has_content(&self) -> bool {
        self.text.is_some() || self.image_ref.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_has_content() {
        let msg = Message::text(SenderRole::Admin, "Hello");
        assert!(msg.has_content());
        assert!(!msg.read);
        assert!(!msg.order_related);
    }

    #[test]
    fn image_message_has_content() {
        let msg = Message::image(SenderRole::Admin, "https://img.example/1.jpg");
        assert!(msg.has_content());
        assert!(msg.text.is_none());
    }

    #[test]
    fn order_placed_message_carries_snapshot() {
        let order = Order::place(
            OrderId::new("abc12345"),
            CustomerId::new("user-1"),
            vec![OrderItem::new("Bamboo chair", 2, Money::from_pesos(750))],
            Money::from_pesos(1500),
        );
        let msg = Message::order_placed(&order);

        assert!(msg.order_related);
        assert!(msg.has_content());
        assert!(!msg.instructions_sent);
        let snapshot = msg.order_snapshot.unwrap();
        assert_eq!(snapshot.order_id, order.id);
        assert_eq!(snapshot.total_amount, order.total_amount);
        assert_eq!(snapshot.items.len(), 1);
    }

    #[test]
    fn new_conversation_defaults_are_safe() {
        let conv = Conversation::new(CustomerId::new("user-1"), "maria");
        assert_eq!(conv.unread_by_admin, 0);
        assert_eq!(conv.unread_by_user, 0);
        assert!(conv.last_message.is_none());
        assert!(!conv.has_new_order);
    }

    #[test]
    fn sender_role_wire_form() {
        assert_eq!(
            serde_json::to_string(&SenderRole::Admin).unwrap(),
            "\"admin\""
        );
        assert_eq!(
            serde_json::to_string(&SenderRole::Customer).unwrap(),
            "\"customer\""
        );
    }

    #[test]
    fn legacy_timestamp_encodings_still_load() {
        // Older documents carry epoch millis or the split server form.
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": "6e1fdb6a-6f1e-4b4e-9b0a-1c2d3e4f5a6b",
            "sender": "customer",
            "text": "hello",
            "timestamp": 1_700_000_000_000i64,
            "read": false
        }))
        .unwrap();
        assert_eq!(message.timestamp.timestamp(), 1_700_000_000);

        let conv: Conversation = serde_json::from_value(serde_json::json!({
            "customerId": "user-1",
            "customerName": "maria",
            "timestamp": { "seconds": 1_700_000_000, "nanoseconds": 0 },
            "unreadByAdmin": 0,
            "unreadByUser": 0
        }))
        .unwrap();
        assert_eq!(conv.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn conversation_wire_shape_is_camel_case() {
        let mut conv = Conversation::new(CustomerId::new("user-1"), "maria");
        conv.last_message = Some("Hi".to_string());
        conv.unread_by_user = 2;
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["customerName"], "maria");
        assert_eq!(json["lastMessage"], "Hi");
        assert_eq!(json["unreadByUser"], 2);
        assert_eq!(json["unreadByAdmin"], 0);
        assert_eq!(json["hasNewOrder"], false);
    }
}
