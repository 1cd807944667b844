//! Fulfillment orchestration.
//!
//! This crate ties the order state machine to the customer conversation:
//! an accepted status change is followed by a composed notification message
//! and a summary update in the customer's thread. The two writes are not
//! atomic together, so results are three-way: rejected with nothing
//! written, fully succeeded, or status-changed-but-notification-failed.

pub mod error;
pub mod orchestrator;

pub use error::{FulfillmentError, Result};
pub use orchestrator::{AdvanceOutcome, Orchestrator};
