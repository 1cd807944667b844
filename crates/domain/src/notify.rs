//! Customer notification composer.
//!
//! Maps a newly reached status and an order snapshot to the customer-facing
//! message text. The templates are part of the external contract: customers
//! see them verbatim, so the wording here must not drift.

use crate::order::{Order, OrderStatus};

/// Composes the notification text for an order that has just reached
/// `status`.
///
/// Pure and total: identical inputs always give identical text, statuses
/// outside the forward sequence fall back to a generic line, and missing
/// order fields degrade to placeholders instead of erroring.
pub fn compose(status: OrderStatus, order: &Order) -> String {
    let id8 = order.id.short();

    match status {
        OrderStatus::Confirmation => format!(
            "Your order #{id8} has been confirmed! We're preparing {} item(s) for shipment. Total: {}",
            order.item_count(),
            order.total_amount,
        ),
        OrderStatus::Shipping => format!(
            "Your order #{id8} is now being shipped to {}. You'll receive it soon!",
            order.delivery_address.as_deref().unwrap_or("N/A"),
        ),
        OrderStatus::Receiving => format!(
            "Your order #{id8} is out for delivery! Our courier will arrive at your address shortly.",
        ),
        OrderStatus::Completed => format!(
            "Your order #{id8} has been delivered! We hope you enjoy your purchase.",
        ),
        OrderStatus::Reviews => format!(
            "How was your experience? We'd love feedback on order #{id8}.",
        ),
        other => format!("Your order status has been updated to {}", other.label()),
    }
}
