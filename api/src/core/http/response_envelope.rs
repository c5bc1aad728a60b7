//! JSON envelope shared by every route.
//!
//! - `POST /events` → `202 {success: true, data: {instance_id, event}}`
//! - `GET /health`  → `200 {success: true, data: {status: "ok"}}`
//! - any failure    → `{success: false, error: {code, message, details?}}`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    /// e.g. "UNAUTHORIZED", "INSTANCE_CONFLICT".
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiErrorDetail>,
}

/// Points the caller at the part of the event body to fix.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// `secret`, `id`, `data`, or a payload key such as `prNumber`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiErrorDetail {
    pub fn field(path: &str, hint: impl Into<String>) -> Self {
        Self {
            path: Some(path.to_string()),
            hint: Some(hint.into()),
        }
    }
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// `202 Accepted`: the work was journaled and runs in the background.
    pub fn accepted(data: T) -> Response {
        Self::success(data).into_response_with_status(StatusCode::ACCEPTED)
    }

    pub fn error(
        code: &'static str,
        message: impl Into<String>,
        details: Vec<ApiErrorDetail>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
                details,
            }),
        }
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_omits_error() {
        let body = serde_json::to_value(ApiResponse::success(json!({"instance_id": "evt-1"}))).unwrap();
        assert_eq!(body, json!({"success": true, "data": {"instance_id": "evt-1"}}));
    }

    #[test]
    fn error_omits_data_and_empty_details() {
        let body = serde_json::to_value(ApiResponse::<()>::error("UNAUTHORIZED", "nope", Vec::new()))
            .unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": {"code": "UNAUTHORIZED", "message": "nope"}})
        );
    }

    #[test]
    fn accepted_uses_202() {
        let res = ApiResponse::accepted(json!({"instance_id": "evt-1"}));
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }
}
