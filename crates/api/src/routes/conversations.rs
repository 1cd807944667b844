//! Conversation list and chat endpoints for the admin side.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::{CustomerId, MessageId};
use domain::{Conversation, Message, Role, SenderRole};
use serde::{Deserialize, Serialize};
use store::{ConversationStore, OrderStore};

use crate::error::ApiError;
use crate::routes::{AppState, operator_context};

// -- Request/response types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message_id: MessageId,
}

// -- Handlers --

/// GET /conversations — all summaries, most recent activity first.
#[tracing::instrument(skip(state))]
pub async fn list<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
) -> Result<Json<Vec<Conversation>>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let summaries = state.conversations.list_summaries().await?;
    Ok(Json(summaries))
}

/// GET /conversations/{customer_id}/messages — one customer's log, oldest
/// first.
#[tracing::instrument(skip(state))]
pub async fn messages<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let log = state
        .conversations
        .messages(&CustomerId::new(customer_id))
        .await?;
    Ok(Json(log))
}

/// POST /conversations/{customer_id}/messages — send one admin message,
/// either text or an image reference.
#[tracing::instrument(skip(state, headers, req))]
pub async fn send<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(customer_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let ctx = operator_context(&headers)?;
    let customer_id = CustomerId::new(customer_id);

    let message_id = match (req.text.as_deref(), req.image_ref.as_deref()) {
        (Some(text), None) if !text.trim().is_empty() => {
            state
                .orchestrator
                .send_admin_message(&customer_id, text, &ctx)
                .await?
        }
        (None, Some(image_ref)) if !image_ref.is_empty() => {
            state
                .orchestrator
                .send_admin_image(&customer_id, image_ref, &ctx)
                .await?
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "send text and imageRef as separate messages".to_string(),
            ));
        }
        _ => {
            return Err(ApiError::BadRequest(
                "a message needs text or an imageRef".to_string(),
            ));
        }
    };

    Ok(Json(SendMessageResponse { message_id }))
}

/// POST /conversations/{customer_id}/read — zero the calling side's unread
/// counter. Admin and staff operators clear the admin counter, customers
/// their own.
#[tracing::instrument(skip(state, headers))]
pub async fn mark_read<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(customer_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let ctx = operator_context(&headers)?;
    let side = match ctx.role {
        Role::Admin | Role::Staff => SenderRole::Admin,
        Role::Customer => SenderRole::Customer,
    };

    state
        .conversations
        .mark_read(&CustomerId::new(customer_id), side)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /conversations/{customer_id}/acknowledge-order — clear the
/// new-order flag once the order has been picked up.
#[tracing::instrument(skip(state, headers))]
pub async fn acknowledge_order<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(customer_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let ctx = operator_context(&headers)?;
    state
        .orchestrator
        .acknowledge_new_order(&CustomerId::new(customer_id), &ctx)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
