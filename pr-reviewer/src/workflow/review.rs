//! Review workflow for `pr.review.requested`.
//!
//! 1) **fetching-diff**: fetch title/description/diff with the requester's token
//! 2) **retrieving-context**: top-K snippets for `title\ndescription`; failure → no context
//! 3) **generating-review**: prompt → model (quota → placeholder text)
//! 4) **posting-comment**: publish the review on the PR
//! 5) **saving-review**: persist a `completed` record; failure is logged only
//!
//! The token is looked up only when a step that talks to the host actually
//! runs; replayed steps need no credential.
//!
//! Any step failing for good ends the instance in `failed` and persists a
//! `failed` record carrying the error message.

use std::time::Instant;

use chrono::Utc;
use git_context_engine::PullRequestRef;
use rag_store::RepositoryId;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{ReviewError, ReviewResult};
use crate::model::{FetchedPullRequest, ReviewRecord, ReviewRequest, ReviewStatus, SaveOutcome};
use crate::prompt::{build_review_prompt, context_query};
use crate::workflow::{
    InstanceStatus, LazyToken, ReviewState, StepExecutor, WorkflowDeps, WorkflowOutcome,
};

/// Title of the record persisted when a review could not be produced.
pub const FAILED_TITLE: &str = "Failed to fetch PR";

#[instrument(skip_all, fields(instance = %instance_id, pr = %req.pr_ref()))]
pub async fn run_review_workflow(
    deps: &WorkflowDeps,
    instance_id: &str,
    req: &ReviewRequest,
) -> WorkflowOutcome {
    let t0 = Instant::now();
    let exec = StepExecutor::new(deps.journal.as_ref(), instance_id, deps.retry);

    let outcome = match drive(deps, &exec, instance_id, req).await {
        Ok(()) => {
            info!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                state = %ReviewState::Done,
                "review workflow finished"
            );
            WorkflowOutcome::Completed
        }
        Err(e) => {
            error!(error = %e, state = %ReviewState::Failed, "review workflow failed");
            record_failure(deps, instance_id, req, &e).await;
            WorkflowOutcome::Failed {
                message: e.to_string(),
            }
        }
    };

    let status = match outcome {
        WorkflowOutcome::Completed => InstanceStatus::Done,
        WorkflowOutcome::Failed { .. } => InstanceStatus::Failed,
    };
    if let Err(e) = deps.journal.finish(instance_id, status).await {
        error!(error = %e, "could not mark instance finished");
    }
    outcome
}

async fn drive(
    deps: &WorkflowDeps,
    exec: &StepExecutor<'_>,
    instance_id: &str,
    req: &ReviewRequest,
) -> ReviewResult<()> {
    let pr_ref = req.pr_ref();
    let repository_id = req.repository_id();

    // ---------------------------
    // fetching-diff
    // ---------------------------
    let token = LazyToken::new(deps, &req.user_id);
    let mut state = ReviewState::FetchingDiff;
    let pr: FetchedPullRequest = exec
        .run(state.as_str(), || fetch_pull_request(deps, &token, &pr_ref))
        .await?;
    debug!(%state, title = %pr.title, diff_bytes = pr.diff.len(), "diff ready");
    state = advance(state);

    // ---------------------------
    // retrieving-context
    // ---------------------------
    let query = context_query(&pr.title, pr.description.as_deref());
    let context: Vec<String> = exec
        .run(state.as_str(), || retrieve_context(deps, &query, &repository_id))
        .await?;
    debug!(%state, snippets = context.len(), "context ready");
    state = advance(state);

    // ---------------------------
    // generating-review
    // ---------------------------
    let prompt = build_review_prompt(&pr.title, pr.description.as_deref(), &context, &pr.diff);
    let review: String = exec
        .run(state.as_str(), || deps.engine.review(&prompt))
        .await?;
    debug!(%state, chars = review.len(), "review ready");
    state = advance(state);

    // ---------------------------
    // posting-comment
    // ---------------------------
    exec.run(state.as_str(), || post_comment(deps, &token, &pr_ref, &review))
        .await?;
    debug!(%state, credential_used = token.is_resolved(), "comment posted");
    state = advance(state);

    // ---------------------------
    // saving-review
    // ---------------------------
    let saved = exec
        .run(state.as_str(), || {
            save_completed(deps, instance_id, req, &pr.title, &review)
        })
        .await;
    match saved {
        Ok(SaveOutcome::Saved { review_id }) => debug!(%state, %review_id, "review saved"),
        Ok(SaveOutcome::UnknownRepository) => {
            warn!(%state, repository = %repository_id, "repository unknown to the store, review not saved")
        }
        Err(e) => error!(%state, error = %e, "review posted but could not be saved"),
    }

    Ok(())
}

fn advance(state: ReviewState) -> ReviewState {
    let next = state.next().unwrap_or(ReviewState::Done);
    debug!(from = %state, to = %next, "transition");
    next
}

async fn fetch_pull_request(
    deps: &WorkflowDeps,
    token: &LazyToken<'_>,
    pr: &PullRequestRef,
) -> ReviewResult<FetchedPullRequest> {
    let diff = deps.host.fetch_diff(token.get().await?, pr).await?;
    Ok(FetchedPullRequest {
        title: diff.title,
        description: diff.description,
        diff: diff.diff,
    })
}

/// Retrieval never fails the workflow; errors degrade to an empty context.
async fn retrieve_context(
    deps: &WorkflowDeps,
    query: &str,
    repository_id: &RepositoryId,
) -> ReviewResult<Vec<String>> {
    match deps.rag.retrieve(query, repository_id).await {
        Ok(snippets) => Ok(snippets),
        Err(e) => {
            warn!(error = %e, repository = %repository_id, "context retrieval failed, continuing without context");
            Ok(Vec::new())
        }
    }
}

async fn post_comment(
    deps: &WorkflowDeps,
    token: &LazyToken<'_>,
    pr: &PullRequestRef,
    body: &str,
) -> ReviewResult<()> {
    deps.host.post_comment(token.get().await?, pr, body).await?;
    Ok(())
}

async fn save_completed(
    deps: &WorkflowDeps,
    instance_id: &str,
    req: &ReviewRequest,
    title: &str,
    review: &str,
) -> ReviewResult<SaveOutcome> {
    let Some(repository) = deps.reviews.find_repository(&req.owner, &req.repo).await? else {
        return Ok(SaveOutcome::UnknownRepository);
    };
    let record = ReviewRecord {
        id: instance_id.to_string(),
        repository_id: repository.id,
        pr_number: req.pr_number,
        pr_title: title.to_string(),
        pr_url: deps.pr_url(&req.owner, &req.repo, req.pr_number),
        review: review.to_string(),
        status: ReviewStatus::Completed,
        created_at: Utc::now(),
    };
    deps.reviews.save_review(&record).await?;
    Ok(SaveOutcome::Saved {
        review_id: record.id,
    })
}

/// Best effort: a failure here is logged and swallowed.
async fn record_failure(
    deps: &WorkflowDeps,
    instance_id: &str,
    req: &ReviewRequest,
    err: &ReviewError,
) {
    let repository_id = match deps.reviews.find_repository(&req.owner, &req.repo).await {
        Ok(Some(repo)) => repo.id,
        Ok(None) => req.repository_id().to_string(),
        Err(e) => {
            error!(error = %e, "could not look up repository for failed review record");
            return;
        }
    };

    let record = ReviewRecord {
        id: instance_id.to_string(),
        repository_id,
        pr_number: req.pr_number,
        pr_title: FAILED_TITLE.to_string(),
        pr_url: deps.pr_url(&req.owner, &req.repo, req.pr_number),
        review: format!("Error: {err}"),
        status: ReviewStatus::Failed,
        created_at: Utc::now(),
    };
    if let Err(e) = deps.reviews.save_review(&record).await {
        error!(error = %e, "could not persist failed review record");
    }
}
