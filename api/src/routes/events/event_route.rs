use axum::{
    extract::{Json, State},
    http::HeaderMap,
    response::Response,
};
use pr_reviewer::TriggerEvent;
use tracing::{debug, info, instrument};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::{ApiErrorDetail, ApiResponse},
    },
    error_handler::{AppError, AppResult},
    routes::events::{event_request::EventRequest, event_response::EventResponse},
};

/// HTTP endpoint receiving trigger events.
///
/// Checks the shared secret, decodes `{name, data}` into a [`TriggerEvent`],
/// journals it and spawns the workflow. Answers `202 Accepted` with the
/// instance id without waiting for the workflow. Reusing an `id` with a
/// different event answers `409 Conflict`.
#[instrument(name = "event_route", skip(state, headers, body), fields(event = %body.name))]
pub async fn event_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EventRequest>,
) -> AppResult<Response> {
    if let Some(id) = headers.get("X-Request-Id").and_then(|h| h.to_str().ok()) {
        debug!(%id, "request id attached");
    }

    // --- Validate shared secret -------------------------------------------------
    let expected_secret = state.trigger_secret.trim();
    let provided_secret = body.secret.trim();

    if expected_secret.is_empty() {
        return Err(AppError::SecretNotConfigured);
    }
    if provided_secret.is_empty() || provided_secret != expected_secret {
        return Err(AppError::Unauthorized);
    }

    // --- Decode event -------------------------------------------------------------
    let event = TriggerEvent::from_parts(&body.name, body.data).map_err(|e| AppError::BadRequest {
        message: format!("invalid event '{}': {e}", body.name),
        details: vec![ApiErrorDetail::field(
            "data",
            "Supported events: repository.connected {owner, repo, userId}, pr.review.requested {owner, repo, prNumber, userId}.",
        )],
    })?;
    let name = event.name();

    // --- Schedule -----------------------------------------------------------------
    let scheduled = state.scheduler.submit(event, body.id).await?;
    info!(instance = %scheduled.instance_id, "event accepted");

    Ok(ApiResponse::accepted(EventResponse {
        instance_id: scheduled.instance_id,
        event: name,
    }))
}
