//! Public entry for the pr-reviewer pipeline.
//!
//! Two durable workflows driven by trigger events:
//!
//! 1) **`repository.connected` → indexing**
//!    - Register the repository, list its text files through the code host
//!    - Embed and upsert them into the vector index (skipped if already indexed)
//!
//! 2) **`pr.review.requested` → review**
//!    - Fetch the PR diff with the requester's token
//!    - Retrieve related code snippets (RAG) for `title\ndescription`
//!    - Build the prompt and generate the review (quota → placeholder)
//!    - Post the review as a PR comment and persist the outcome
//!
//! Each step's output is committed to a journal before the next one starts, so
//! re-running an instance never repeats a side effect that already happened.
//! [`WorkflowScheduler`] assigns instance ids, bounds concurrency and resumes
//! unfinished instances after a restart.

pub mod config;
pub mod engine;
pub mod errors;
mod json_file;
pub mod model;
pub mod prompt;
pub mod scheduler;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::LlmServiceProfiles;
use git_context_engine::{ProviderClient, ProviderConfig};
use rag_store::{RagConfig, RagStore};
use tracing::debug;

pub use config::ReviewerConfig;
pub use engine::{DEGRADED_REVIEW, ReviewEngine, ReviewModel};
pub use errors::{ConfigError, JournalError, ReviewError, ReviewResult, StoreError};
pub use model::{
    Credential, RepositoryConnected, RepositoryRecord, ReviewRecord, ReviewRequest, ReviewStatus,
    TriggerEvent,
};
pub use scheduler::{Scheduled, WorkflowScheduler};
pub use store::{CredentialStore, FileStore, MemoryStore, ReviewStore};
pub use workflow::{
    FileJournal, MemoryJournal, RetryPolicy, ReviewState, StepJournal, WorkflowDeps,
    WorkflowOutcome,
};

/// Wires every production dependency from environment variables.
///
/// - LLM profiles (generation + embedding) from `ai-llm-service`
/// - RAG store (Qdrant or in-memory) from `rag-store`
/// - GitHub client from `git-context-engine`
/// - JSON-file stores and journal under `REVIEWER_DATA_DIR`
pub fn scheduler_from_env() -> ReviewResult<WorkflowScheduler> {
    let t0 = Instant::now();

    debug!("bootstrap: reviewer config");
    let cfg = ReviewerConfig::from_env()?;

    debug!("bootstrap: llm profiles");
    let llm = Arc::new(LlmServiceProfiles::from_env()?);

    debug!("bootstrap: rag store");
    let rag = RagStore::new(RagConfig::from_env()?, llm.clone())?;

    debug!("bootstrap: code host");
    let provider_cfg = ProviderConfig::github_from_env()?;
    let provider = provider_cfg.kind;
    let host = ProviderClient::from_config(provider_cfg)?;

    let store = Arc::new(FileStore::new(&cfg.data_dir));
    let deps = WorkflowDeps {
        host: Arc::new(host),
        provider,
        rag: Arc::new(rag),
        engine: ReviewEngine::new(llm),
        credentials: store.clone(),
        reviews: store,
        journal: Arc::new(FileJournal::new(cfg.journal_dir())),
        retry: cfg.retry,
        web_base: cfg.web_base.clone(),
    };

    debug!(
        data_dir = %cfg.data_dir.display(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "bootstrap: done"
    );
    Ok(WorkflowScheduler::new(deps, &cfg))
}
