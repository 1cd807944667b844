//! Fulfillment error types.

use common::{OperatorId, OrderId};
use domain::{OrderError, OrderStatus, Role};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving an order through fulfillment.
///
/// These are the rejection cases: the operation was refused and nothing was
/// written. A notification that fails after the status has already moved is
/// not an error but an [`AdvanceOutcome::NotificationFailed`] outcome.
///
/// [`AdvanceOutcome::NotificationFailed`]: crate::AdvanceOutcome::NotificationFailed
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order cannot move forward from its current state. Raised both
    /// for terminal orders and for racers that lost a concurrent advance,
    /// in which case `current` is the status actually found.
    #[error("Order cannot advance from '{current}'")]
    InvalidTransition { current: OrderStatus },

    /// Cancellation was requested outside the pre-completed states.
    #[error("Cannot cancel an order in '{current}' state")]
    CancelNotAllowed { current: OrderStatus },

    /// The operator's role does not permit order or chat operations.
    #[error("Operator {operator_id} ({role}) is not allowed to manage orders")]
    Unauthorized { operator_id: OperatorId, role: Role },

    /// Store error outside the concurrency-conflict case.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<OrderError> for FulfillmentError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { current } => {
                FulfillmentError::InvalidTransition { current }
            }
            OrderError::CancelNotAllowed { current } => {
                FulfillmentError::CancelNotAllowed { current }
            }
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(err: StoreError) -> Self {
        match err {
            // A lost status race is the same rejection as an invalid
            // transition, carrying the status actually stored.
            StoreError::ConcurrencyConflict { actual, .. } => {
                FulfillmentError::InvalidTransition { current: actual }
            }
            other => FulfillmentError::Store(other),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
