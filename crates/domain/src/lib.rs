//! Domain layer for the fulfillment system.
//!
//! This crate holds the pure core: the order status machine, the order and
//! conversation data model, the notification composer, and the operator
//! context used for authorization. Nothing here performs I/O; persistence
//! and orchestration live in the `store` and `fulfillment` crates.

pub mod chat;
pub mod notify;
pub mod operator;
pub mod order;

pub use chat::{Conversation, Message, OrderSnapshot, SenderRole};
pub use notify::compose;
pub use operator::{OperatorContext, Role};
pub use order::{Money, Order, OrderError, OrderItem, OrderStatus, StatusHistoryEntry};
