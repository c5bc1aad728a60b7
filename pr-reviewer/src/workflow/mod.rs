//! Durable workflows.
//!
//! - [`review`]: `fetching-diff → retrieving-context → generating-review →
//!   posting-comment → saving-review → done` (or `failed`)
//! - [`indexing`]: a single `index-repository` step
//!
//! Every step goes through [`StepExecutor`], so a re-run of the same instance id
//! replays committed steps and resumes at the first uncommitted one.

pub mod executor;
pub mod indexing;
pub mod journal;
pub mod review;

use std::fmt;
use std::sync::Arc;

use git_context_engine::{AccessToken, CodeHost, ProviderKind};
use rag_store::RagStore;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::engine::ReviewEngine;
use crate::errors::{ConfigError, ReviewResult};
use crate::store::{CredentialStore, ReviewStore};

pub use executor::{RetryPolicy, StepExecutor};
pub use journal::{FileJournal, InstanceRecord, InstanceStatus, MemoryJournal, StepJournal};

/// States of the review state machine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewState {
    FetchingDiff,
    RetrievingContext,
    GeneratingReview,
    PostingComment,
    SavingReview,
    Done,
    Failed,
}

impl ReviewState {
    /// Step name used as the journal key.
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewState::FetchingDiff => "fetching-diff",
            ReviewState::RetrievingContext => "retrieving-context",
            ReviewState::GeneratingReview => "generating-review",
            ReviewState::PostingComment => "posting-comment",
            ReviewState::SavingReview => "saving-review",
            ReviewState::Done => "done",
            ReviewState::Failed => "failed",
        }
    }

    /// Successor on the happy path. Terminal states have none.
    pub fn next(self) -> Option<ReviewState> {
        match self {
            ReviewState::FetchingDiff => Some(ReviewState::RetrievingContext),
            ReviewState::RetrievingContext => Some(ReviewState::GeneratingReview),
            ReviewState::GeneratingReview => Some(ReviewState::PostingComment),
            ReviewState::PostingComment => Some(ReviewState::SavingReview),
            ReviewState::SavingReview => Some(ReviewState::Done),
            ReviewState::Done | ReviewState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a workflow instance ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed,
    Failed { message: String },
}

/// Everything a workflow instance talks to. Cheap to clone.
#[derive(Clone)]
pub struct WorkflowDeps {
    pub host: Arc<dyn CodeHost>,
    pub provider: ProviderKind,
    pub rag: Arc<RagStore>,
    pub engine: ReviewEngine,
    pub credentials: Arc<dyn CredentialStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub journal: Arc<dyn StepJournal>,
    pub retry: RetryPolicy,
    /// Web base for PR links, e.g. "https://github.com".
    pub web_base: String,
}

impl WorkflowDeps {
    /// Resolves the requester's token for the configured provider.
    ///
    /// A missing credential is a configuration error and is never retried.
    pub(crate) async fn resolve_token(&self, user_id: &str) -> ReviewResult<AccessToken> {
        let credential = self
            .credentials
            .find_credential(user_id, self.provider.as_str())
            .await?;
        credential
            .map(|c| c.access_token)
            .ok_or_else(|| {
                ConfigError::MissingCredential {
                    user_id: user_id.to_string(),
                    provider: self.provider,
                }
                .into()
            })
    }

    pub(crate) fn pr_url(&self, owner: &str, repo: &str, number: u64) -> String {
        format!(
            "{}/{owner}/{repo}/pull/{number}",
            self.web_base.trim_end_matches('/')
        )
    }
}

/// The requester's token, looked up the first time a step needs it.
///
/// Replayed steps never ask for it, so an instance whose steps are all
/// committed replays without a credential lookup.
pub(crate) struct LazyToken<'a> {
    deps: &'a WorkflowDeps,
    user_id: &'a str,
    cell: OnceCell<AccessToken>,
}

impl<'a> LazyToken<'a> {
    pub(crate) fn new(deps: &'a WorkflowDeps, user_id: &'a str) -> Self {
        Self {
            deps,
            user_id,
            cell: OnceCell::new(),
        }
    }

    /// Resolves once per run; a failed lookup is not cached.
    pub(crate) async fn get(&self) -> ReviewResult<&AccessToken> {
        self.cell
            .get_or_try_init(|| async {
                debug!(user = %self.user_id, "resolving credential");
                self.deps.resolve_token(self.user_id).await
            })
            .await
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}
