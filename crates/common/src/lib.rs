//! Shared types for the fulfillment system.

pub mod ids;
pub mod timestamp;

pub use ids::{CustomerId, MessageId, OperatorId, OrderId};
pub use timestamp::{StoredTimestamp, stored_datetime};
