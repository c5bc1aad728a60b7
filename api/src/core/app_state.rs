use pr_reviewer::WorkflowScheduler;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared secret callers must echo in every event body.
    pub trigger_secret: String,
    pub scheduler: WorkflowScheduler,
}

impl AppState {
    pub fn new(trigger_secret: impl Into<String>, scheduler: WorkflowScheduler) -> Self {
        Self {
            trigger_secret: trigger_secret.into(),
            scheduler,
        }
    }

    /// Reads `TRIGGER_SECRET`; an unset secret makes every event request fail.
    pub fn from_env(scheduler: WorkflowScheduler) -> Self {
        let trigger_secret = std::env::var("TRIGGER_SECRET").unwrap_or_default();
        Self::new(trigger_secret, scheduler)
    }
}
