//! HTTP API server with observability for the fulfillment system.
//!
//! Exposes the order board, the per-order advance/cancel operations, and the
//! admin side of the customer conversations, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{ConversationStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O, C>(state: Arc<AppState<O, C>>, metrics_handle: PrometheusHandle) -> Router
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<O, C>))
        .route("/orders", get(routes::orders::list::<O, C>))
        .route("/orders/{id}", get(routes::orders::get::<O, C>))
        .route("/orders/{id}/advance", post(routes::orders::advance::<O, C>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<O, C>))
        .route("/conversations", get(routes::conversations::list::<O, C>))
        .route(
            "/conversations/{customer_id}/messages",
            get(routes::conversations::messages::<O, C>),
        )
        .route(
            "/conversations/{customer_id}/messages",
            post(routes::conversations::send::<O, C>),
        )
        .route(
            "/conversations/{customer_id}/read",
            post(routes::conversations::mark_read::<O, C>),
        )
        .route(
            "/conversations/{customer_id}/acknowledge-order",
            post(routes::conversations::acknowledge_order::<O, C>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
