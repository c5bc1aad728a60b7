//! Turns trigger events into journaled, concurrency-bounded workflow tasks.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ReviewerConfig;
use crate::errors::{JournalError, ReviewResult};
use crate::model::TriggerEvent;
use crate::workflow::indexing::run_indexing_workflow;
use crate::workflow::review::run_review_workflow;
use crate::workflow::{InstanceRecord, WorkflowDeps, WorkflowOutcome};

/// A spawned workflow instance.
pub struct Scheduled {
    pub instance_id: String,
    pub handle: JoinHandle<WorkflowOutcome>,
}

#[derive(Clone)]
pub struct WorkflowScheduler {
    deps: WorkflowDeps,
    review_slots: Arc<Semaphore>,
    index_slots: Arc<Semaphore>,
}

impl WorkflowScheduler {
    pub fn new(deps: WorkflowDeps, cfg: &ReviewerConfig) -> Self {
        debug!(
            review_concurrency = cfg.review_concurrency,
            index_concurrency = cfg.index_concurrency,
            "WorkflowScheduler::new"
        );
        Self {
            deps,
            review_slots: Arc::new(Semaphore::new(cfg.review_concurrency)),
            index_slots: Arc::new(Semaphore::new(cfg.index_concurrency)),
        }
    }

    pub fn deps(&self) -> &WorkflowDeps {
        &self.deps
    }

    /// Journals the event under `instance_id` (a fresh uuid when absent) and spawns it.
    ///
    /// Submitting an id that is already journaled replays that instance. The
    /// journaled event must match the submitted one, otherwise the call fails
    /// with [`JournalError::ConflictingEvent`] and nothing is spawned.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn submit(
        &self,
        event: TriggerEvent,
        instance_id: Option<String>,
    ) -> ReviewResult<Scheduled> {
        let instance_id = instance_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let record = InstanceRecord::new(&instance_id, event);
        let stored = self.deps.journal.register(&record).await?;
        if stored.event != record.event {
            warn!(instance = %instance_id, "id already journaled with a different event");
            return Err(JournalError::ConflictingEvent(instance_id).into());
        }
        info!(instance = %instance_id, "workflow instance scheduled");
        Ok(self.spawn(stored))
    }

    /// Re-spawns every journaled instance that never finished.
    pub async fn resume_pending(&self) -> ReviewResult<Vec<Scheduled>> {
        let pending = self.deps.journal.pending().await?;
        if !pending.is_empty() {
            info!(count = pending.len(), "resuming unfinished workflow instances");
        }
        Ok(pending.into_iter().map(|r| self.spawn(r)).collect())
    }

    fn spawn(&self, record: InstanceRecord) -> Scheduled {
        let deps = self.deps.clone();
        let slots = match record.event {
            TriggerEvent::ReviewRequested(_) => self.review_slots.clone(),
            TriggerEvent::RepositoryConnected(_) => self.index_slots.clone(),
        };
        let instance_id = record.id.clone();

        let handle = tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                error!(instance = %record.id, "scheduler closed, instance not run");
                return WorkflowOutcome::Failed {
                    message: "scheduler closed".into(),
                };
            };
            match &record.event {
                TriggerEvent::ReviewRequested(req) => {
                    run_review_workflow(&deps, &record.id, req).await
                }
                TriggerEvent::RepositoryConnected(event) => {
                    run_indexing_workflow(&deps, &record.id, event).await
                }
            }
        });

        Scheduled {
            instance_id,
            handle,
        }
    }
}
