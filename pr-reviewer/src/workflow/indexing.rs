//! Indexing workflow for `repository.connected`.
//!
//! One journaled step, `index-repository`: register the repository, list its
//! text files through the code host and index them. A repository that already
//! has vectors is skipped before any listing happens. The token is looked up
//! only when the step runs, so a committed instance replays without it.

use std::time::Instant;

use rag_store::{FileChunk, IndexReport};
use tracing::{debug, error, info, instrument};

use crate::errors::ReviewResult;
use crate::model::RepositoryConnected;
use crate::workflow::{InstanceStatus, LazyToken, StepExecutor, WorkflowDeps, WorkflowOutcome};

pub const INDEX_STEP: &str = "index-repository";

#[instrument(skip_all, fields(instance = %instance_id, repository = %event.repository_id()))]
pub async fn run_indexing_workflow(
    deps: &WorkflowDeps,
    instance_id: &str,
    event: &RepositoryConnected,
) -> WorkflowOutcome {
    let t0 = Instant::now();
    let exec = StepExecutor::new(deps.journal.as_ref(), instance_id, deps.retry);

    let token = LazyToken::new(deps, &event.user_id);
    let result = exec
        .run(INDEX_STEP, || index_repository(deps, &token, event))
        .await;

    let (outcome, status) = match result {
        Ok(report) => {
            info!(
                already_indexed = report.already_indexed,
                files = report.files_seen,
                skipped = report.files_skipped,
                records = report.records_upserted,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "indexing finished"
            );
            (WorkflowOutcome::Completed, InstanceStatus::Done)
        }
        Err(e) => {
            error!(error = %e, "indexing failed");
            (
                WorkflowOutcome::Failed {
                    message: e.to_string(),
                },
                InstanceStatus::Failed,
            )
        }
    };

    if let Err(e) = deps.journal.finish(instance_id, status).await {
        error!(error = %e, "could not mark instance finished");
    }
    outcome
}

async fn index_repository(
    deps: &WorkflowDeps,
    token: &LazyToken<'_>,
    event: &RepositoryConnected,
) -> ReviewResult<IndexReport> {
    let token = token.get().await?;
    let repository_id = event.repository_id();
    deps.reviews
        .register_repository(&event.owner, &event.repo, &event.user_id)
        .await?;

    if deps.rag.index().has_records(&repository_id).await? {
        debug!("repository already indexed, skipping file listing");
        return Ok(IndexReport {
            repository_id: repository_id.to_string(),
            already_indexed: true,
            ..IndexReport::default()
        });
    }

    let files = deps
        .host
        .list_files(token, &event.owner, &event.repo, "")
        .await?;
    debug!(files = files.len(), "repository files listed");

    let chunks: Vec<FileChunk> = files
        .into_iter()
        .map(|f| FileChunk::new(f.path, f.content))
        .collect();
    Ok(deps.rag.index_repository(&repository_id, &chunks).await?)
}
