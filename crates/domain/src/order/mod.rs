//! Order model and status state machine.

mod model;
mod status;
mod value_objects;

pub use model::{Order, StatusHistoryEntry};
pub use status::OrderStatus;
pub use value_objects::{Money, OrderItem};

use thiserror::Error;

/// Errors that can occur during order state transitions.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Advance was attempted on an order that has no further forward state.
    #[error("Invalid transition: order is already in terminal state '{current}'")]
    InvalidTransition { current: OrderStatus },

    /// Cancellation was attempted outside the pre-completed states.
    #[error("Cannot cancel an order in '{current}' state")]
    CancelNotAllowed { current: OrderStatus },
}
