//! Embedding abstraction and the quota-aware generator.

use std::sync::Arc;

use ai_llm_service::{AiLlmError, LlmServiceProfiles};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::errors::RagError;
use crate::text::truncate_chars;
use crate::throttle::TokenBucket;

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in your own embedding backend.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, AiLlmError>>;
}

impl EmbeddingsProvider for LlmServiceProfiles {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, AiLlmError>> {
        Box::pin(LlmServiceProfiles::embed(self, text))
    }
}

/// Text → vector with truncation, throttling and quota degradation.
///
/// An empty vector means "no embedding available"; callers skip the item.
#[derive(Clone)]
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingsProvider>,
    limiter: Arc<TokenBucket>,
    max_chars: usize,
}

impl EmbeddingGenerator {
    pub fn new(
        provider: Arc<dyn EmbeddingsProvider>,
        limiter: Arc<TokenBucket>,
        max_chars: usize,
    ) -> Self {
        Self {
            provider,
            limiter,
            max_chars,
        }
    }

    /// Character budget applied to every input.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Embeds `text`.
    ///
    /// - blank input → `[]` without a remote call
    /// - quota / rate-limit errors → `[]` (logged)
    /// - any other error → [`RagError::Embedding`]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.trim().is_empty() {
            debug!("embed: blank input, skipping provider call");
            return Ok(Vec::new());
        }

        let input = truncate_chars(text, self.max_chars);
        self.limiter.acquire().await;

        match self.provider.embed(input).await {
            Ok(v) => Ok(v),
            Err(e) if e.class().is_degradable() => {
                warn!(class = ?e.class(), error = %e, "embedding unavailable, returning empty vector");
                Ok(Vec::new())
            }
            Err(e) => Err(RagError::Embedding(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EmbedMode, FakeEmbedder};

    fn generator(fake: &Arc<FakeEmbedder>, max_chars: usize) -> EmbeddingGenerator {
        EmbeddingGenerator::new(fake.clone(), Arc::new(TokenBucket::unlimited()), max_chars)
    }

    #[tokio::test]
    async fn blank_input_makes_no_call() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let v = generator(&fake, 3000).embed("  \n\t ").await.unwrap();
        assert!(v.is_empty());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn input_is_truncated_before_submission() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let text = "y".repeat(4000);
        generator(&fake, 3000).embed(&text).await.unwrap();
        assert_eq!(fake.max_input_chars(), 3000);
    }

    #[tokio::test]
    async fn quota_degrades_to_empty_vector() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Quota));
        let v = generator(&fake, 3000).embed("fn main() {}").await.unwrap();
        assert!(v.is_empty());
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn other_failures_propagate() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Fatal));
        let err = generator(&fake, 3000).embed("fn main() {}").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }
}
