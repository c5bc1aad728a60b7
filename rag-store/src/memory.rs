//! In-memory vector index using cosine similarity.
//!
//! Backed by a `HashMap` behind a `tokio::sync::RwLock`. Suitable for
//! development, tests and small repositories.

use std::collections::HashMap;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::errors::RagError;
use crate::record::{IndexRecord, RepositoryId, ScoredRecord};
use crate::vector_index::VectorIndex;

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: RwLock<HashMap<String, IndexRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Sorted record ids.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn get(&self, id: &str) -> Option<IndexRecord> {
        self.records.read().await.get(id).cloned()
    }
}

/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorIndex for InMemoryIndex {
    fn upsert<'a>(&'a self, records: &'a [IndexRecord]) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            let mut map = self.records.write().await;
            for r in records {
                map.insert(r.id.clone(), r.clone());
            }
            Ok(())
        })
    }

    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        repository_id: &'a RepositoryId,
        top_k: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredRecord>, RagError>> {
        Box::pin(async move {
            let map = self.records.read().await;
            let mut scored: Vec<ScoredRecord> = map
                .values()
                .filter(|r| r.metadata.repository_id == repository_id.as_str())
                .map(|r| ScoredRecord {
                    score: cosine_similarity(&r.vector, vector),
                    metadata: r.metadata.clone(),
                })
                .collect();

            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
            scored.truncate(top_k);
            Ok(scored)
        })
    }

    fn has_records<'a>(
        &'a self,
        repository_id: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<bool, RagError>> {
        Box::pin(async move {
            let map = self.records.read().await;
            Ok(map
                .values()
                .any(|r| r.metadata.repository_id == repository_id.as_str()))
        })
    }
}
