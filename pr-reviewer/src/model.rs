//! Trigger events, persisted records and workflow outputs.

use chrono::{DateTime, Utc};
use git_context_engine::{AccessToken, PullRequestRef};
use rag_store::RepositoryId;
use serde::{Deserialize, Serialize};

pub const EVENT_REPOSITORY_CONNECTED: &str = "repository.connected";
pub const EVENT_REVIEW_REQUESTED: &str = "pr.review.requested";

/// `pr.review.requested` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub user_id: String,
}

impl ReviewRequest {
    pub fn pr_ref(&self) -> PullRequestRef {
        PullRequestRef::new(&self.owner, &self.repo, self.pr_number)
    }

    pub fn repository_id(&self) -> RepositoryId {
        RepositoryId::from_owner_repo(&self.owner, &self.repo)
    }
}

/// `repository.connected` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnected {
    pub owner: String,
    pub repo: String,
    pub user_id: String,
}

impl RepositoryConnected {
    pub fn repository_id(&self) -> RepositoryId {
        RepositoryId::from_owner_repo(&self.owner, &self.repo)
    }
}

/// Named trigger event as received from the outside world.
///
/// Wire form: `{"name": "pr.review.requested", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum TriggerEvent {
    #[serde(rename = "repository.connected")]
    RepositoryConnected(RepositoryConnected),
    #[serde(rename = "pr.review.requested")]
    ReviewRequested(ReviewRequest),
}

impl TriggerEvent {
    /// Decodes an event from its name and raw `data` payload.
    pub fn from_parts(name: &str, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({ "name": name, "data": data }))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TriggerEvent::RepositoryConnected(_) => EVENT_REPOSITORY_CONNECTED,
            TriggerEvent::ReviewRequested(_) => EVENT_REVIEW_REQUESTED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Completed,
    Failed,
}

/// One persisted review outcome per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: String,
    pub repository_id: String,
    pub pr_number: u64,
    pub pr_title: String,
    pub pr_url: String,
    pub review: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// Linked provider account of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub user_id: String,
    pub provider_id: String,
    pub access_token: AccessToken,
}

/// A connected repository as known to the review store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub user_id: String,
}

/// Output of the `fetching-diff` step. The credential is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPullRequest {
    pub title: String,
    pub description: Option<String>,
    pub diff: String,
}

/// Output of the `saving-review` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { review_id: String },
    UnknownRepository,
}
