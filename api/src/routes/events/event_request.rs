use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /events`.
///
/// `name` selects the workflow (`repository.connected`, `pr.review.requested`),
/// `data` carries its payload and `id` optionally pins the instance id so a
/// redelivered event replays instead of running twice.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub id: Option<String>,
    /// Shared secret used to protect the endpoint from unauthorized calls.
    pub secret: String,
}
