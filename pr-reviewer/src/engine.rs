//! Generative review engine: prompt in, markdown review out.
//!
//! Quota and rate-limit failures are degraded into [`DEGRADED_REVIEW`] so the
//! workflow still posts a comment. Everything else propagates.

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::{AiLlmError, LlmServiceProfiles};
use futures::future::BoxFuture;
use tracing::{debug, error, instrument};

use crate::errors::ReviewResult;

/// Placeholder posted when the model is out of quota.
pub const DEGRADED_REVIEW: &str = "⚠️ AI review unavailable due to quota limits.";

/// Text generation seam. Implemented by the LLM profile service and test fakes.
pub trait ReviewModel: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, AiLlmError>>;
}

impl ReviewModel for LlmServiceProfiles {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(LlmServiceProfiles::generate(self, prompt, None))
    }
}

#[derive(Clone)]
pub struct ReviewEngine {
    model: Arc<dyn ReviewModel>,
}

impl ReviewEngine {
    pub fn new(model: Arc<dyn ReviewModel>) -> Self {
        Self { model }
    }

    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn review(&self, prompt: &str) -> ReviewResult<String> {
        let t0 = Instant::now();
        match self.model.generate(prompt).await {
            Ok(text) => {
                debug!(
                    chars = text.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "review generated"
                );
                Ok(text)
            }
            Err(e) if e.class().is_degradable() => {
                error!(error = %e, "generation quota exceeded, posting placeholder review");
                Ok(DEGRADED_REVIEW.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }
}
