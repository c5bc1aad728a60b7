use axum::{Json, response::IntoResponse};
use serde::Serialize;

use crate::core::http::response_envelope::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse { status: "ok" }))
}
