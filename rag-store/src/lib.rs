//! Repository indexing and context retrieval over a vector index.
//!
//! - [`embed`]: embedding seam + quota-aware [`EmbeddingGenerator`]
//! - [`vector_index`]: store contract, implemented by Qdrant and in-memory backends
//! - [`ingest`]: per-repository indexing with dedup short-circuit
//! - [`retrieve`]: top-K context snippets for a query
//! - [`throttle`]: shared token-bucket limiter for embedding calls

mod config;
mod embed;
mod errors;
mod ingest;
mod memory;
mod qdrant_facade;
mod record;
mod retrieve;
mod text;
mod throttle;
mod vector_index;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use config::{DistanceKind, RagConfig, VectorBackend};
pub use embed::{EmbeddingGenerator, EmbeddingsProvider};
pub use errors::{RagError, Result};
pub use ingest::IndexReport;
pub use memory::InMemoryIndex;
pub use qdrant_facade::QdrantFacade;
pub use record::{
    FileChunk, IndexRecord, RecordMetadata, RepositoryId, ScoredRecord, record_id, sanitize_path,
    stable_uuid,
};
pub use text::{labeled_block, truncate_chars};
pub use throttle::{RateLimit, TokenBucket};
pub use vector_index::{VectorIndex, upsert_batched};

use tracing::{debug, trace};

/// High-level facade that wires configuration, embeddings and the vector index.
///
/// Share one instance (behind `Arc`) between all indexing and review tasks so the
/// embedding rate limiter is shared too.
pub struct RagStore {
    cfg: RagConfig,
    generator: EmbeddingGenerator,
    index: Arc<dyn VectorIndex>,
}

impl RagStore {
    /// Builds the store with the backend selected by `cfg.backend`.
    ///
    /// # Errors
    /// Returns `RagError::Config` / `RagError::Qdrant` if the client cannot be created.
    pub fn new(cfg: RagConfig, provider: Arc<dyn EmbeddingsProvider>) -> Result<Self> {
        cfg.validate()?;
        let index: Arc<dyn VectorIndex> = match cfg.backend {
            VectorBackend::Qdrant => Arc::new(QdrantFacade::new(&cfg)?),
            VectorBackend::Memory => Arc::new(InMemoryIndex::new()),
        };
        Ok(Self::with_index(cfg, provider, index))
    }

    /// Builds the store over an explicit index.
    pub fn with_index(
        cfg: RagConfig,
        provider: Arc<dyn EmbeddingsProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        trace!(collection = %cfg.collection, backend = ?cfg.backend, "RagStore::with_index");
        let limiter = Arc::new(TokenBucket::new(RateLimit {
            requests_per_second: cfg.embed_rps,
            burst: cfg.embed_burst,
        }));
        let generator = EmbeddingGenerator::new(provider, limiter, cfg.embed_max_chars);
        Self {
            cfg,
            generator,
            index,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Indexes `files` under `repository_id` unless the repository already has records.
    pub async fn index_repository(
        &self,
        repository_id: &RepositoryId,
        files: &[FileChunk],
    ) -> Result<IndexReport> {
        debug!(repository = %repository_id, files = files.len(), "RagStore::index_repository");
        ingest::index_repository(
            &self.generator,
            self.index.as_ref(),
            repository_id,
            files,
            self.cfg.upsert_batch,
        )
        .await
    }

    /// Retrieves the configured top-K snippets for `query`.
    pub async fn retrieve(&self, query: &str, repository_id: &RepositoryId) -> Result<Vec<String>> {
        self.retrieve_top(query, repository_id, self.cfg.top_k).await
    }

    pub async fn retrieve_top(
        &self,
        query: &str,
        repository_id: &RepositoryId,
        top_k: usize,
    ) -> Result<Vec<String>> {
        retrieve::retrieve_context(
            &self.generator,
            self.index.as_ref(),
            query,
            repository_id,
            top_k,
        )
        .await
    }

    /// Embeds a single text through the shared limiter (empty vector = unavailable).
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generator.embed(text).await
    }
}
