//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Rejection from the fulfillment core.
    Fulfillment(FulfillmentError),
    /// Store error on a read path.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        FulfillmentError::InvalidTransition { .. } | FulfillmentError::CancelNotAllowed { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        FulfillmentError::Unauthorized { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        FulfillmentError::Store(store_err) => {
            let (status, log) = store_error_status(store_err);
            if log {
                tracing::error!(error = %err, "store error behind fulfillment call");
            }
            (status, err.to_string())
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    let (status, log) = store_error_status(&err);
    if log {
        tracing::error!(error = %err, "store error");
    }
    (status, err.to_string())
}

fn store_error_status(err: &StoreError) -> (StatusCode, bool) {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, false),
        StoreError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, false),
        StoreError::EmptyMessage => (StatusCode::BAD_REQUEST, false),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, true),
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
