//! Health check endpoint.
//!
//! Liveness only: the stores carry no connection state worth probing here,
//! so a reachable process is a healthy one.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health — reports the fulfillment service as up.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "fulfillment-api",
    })
}
