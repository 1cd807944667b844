//! Route handlers.

pub mod conversations;
pub mod health;
pub mod metrics;
pub mod orders;

use std::sync::Arc;

use axum::http::HeaderMap;
use common::OperatorId;
use domain::{OperatorContext, Role};
use fulfillment::Orchestrator;
use store::{ConversationStore, OrderStore};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
///
/// The stores are held twice: owned by the orchestrator for the mutation
/// paths, and directly for the read paths and view subscriptions.
pub struct AppState<O: OrderStore, C: ConversationStore> {
    pub orchestrator: Orchestrator<O, C>,
    pub orders: O,
    pub conversations: C,
}

impl<O, C> AppState<O, C>
where
    O: OrderStore + Clone,
    C: ConversationStore + Clone,
{
    /// Wires the orchestrator over clones of both stores.
    pub fn new(orders: O, conversations: C) -> Arc<Self> {
        Arc::new(Self {
            orchestrator: Orchestrator::new(orders.clone(), conversations.clone()),
            orders,
            conversations,
        })
    }
}

/// Builds the acting operator from the `x-operator-id` and `x-operator-role`
/// request headers. The identity provider in front of this service is
/// trusted to have authenticated them.
pub fn operator_context(headers: &HeaderMap) -> Result<OperatorContext, ApiError> {
    let operator_id = headers
        .get("x-operator-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing x-operator-id header".to_string()))?;

    let role: Role = headers
        .get("x-operator-role")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing x-operator-role header".to_string()))?
        .parse()
        .map_err(ApiError::BadRequest)?;

    Ok(OperatorContext::new(OperatorId::new(operator_id), role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_built_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-operator-id", "op-1".parse().unwrap());
        headers.insert("x-operator-role", "staff".parse().unwrap());

        let ctx = operator_context(&headers).unwrap();
        assert_eq!(ctx.operator_id.as_str(), "op-1");
        assert_eq!(ctx.role, Role::Staff);
    }

    #[test]
    fn missing_or_unknown_headers_are_bad_requests() {
        let headers = HeaderMap::new();
        assert!(matches!(
            operator_context(&headers),
            Err(ApiError::BadRequest(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-operator-id", "op-1".parse().unwrap());
        headers.insert("x-operator-role", "manager".parse().unwrap());
        assert!(matches!(
            operator_context(&headers),
            Err(ApiError::BadRequest(_))
        ));
    }
}
