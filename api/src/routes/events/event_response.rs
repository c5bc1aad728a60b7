use serde::Serialize;

/// Returned once the event is journaled and its workflow spawned.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub instance_id: String,
    pub event: &'static str,
}
