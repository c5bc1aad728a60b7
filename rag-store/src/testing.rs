//! Test doubles for the embedding and index seams.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ai_llm_service::{AiLlmError, LlmProvider, ProviderError, ProviderErrorKind};
use futures::future::BoxFuture;

use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::memory::InMemoryIndex;
use crate::record::{IndexRecord, RecordMetadata, RepositoryId, ScoredRecord, record_id};
use crate::vector_index::VectorIndex;

#[derive(Debug, Clone, Copy)]
pub enum EmbedMode {
    Ok,
    Quota,
    Fatal,
    /// Returns an empty vector for inputs containing the marker.
    EmptyWhen(&'static str),
}

pub struct FakeEmbedder {
    mode: EmbedMode,
    calls: AtomicUsize,
    max_input_chars: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(mode: EmbedMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            max_input_chars: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

/// Deterministic 4-dim vector from byte buckets.
pub fn vector_for(text: &str) -> Vec<f32> {
    let mut v = vec![1.0_f32; 4];
    for b in text.bytes() {
        v[(b % 4) as usize] += 1.0;
    }
    v
}

impl EmbeddingsProvider for FakeEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, AiLlmError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.max_input_chars
                .fetch_max(text.chars().count(), Ordering::SeqCst);
            self.inputs.lock().unwrap().push(text.to_string());

            match self.mode {
                EmbedMode::Ok => Ok(vector_for(text)),
                EmbedMode::Quota => Err(AiLlmError::quota_exceeded(
                    LlmProvider::Gemini,
                    "RESOURCE_EXHAUSTED",
                )),
                EmbedMode::Fatal => Err(ProviderError::new(
                    LlmProvider::Gemini,
                    ProviderErrorKind::Decode("bad payload".into()),
                )
                .into()),
                EmbedMode::EmptyWhen(marker) if text.contains(marker) => Ok(Vec::new()),
                EmbedMode::EmptyWhen(_) => Ok(vector_for(text)),
            }
        })
    }
}

pub fn record(repo: &RepositoryId, path: &str) -> IndexRecord {
    IndexRecord {
        id: record_id(repo, path),
        vector: vector_for(path),
        metadata: RecordMetadata {
            repository_id: repo.as_str().to_string(),
            path: path.to_string(),
            content: format!("File: {path}\n\n"),
        },
    }
}

/// In-memory index that counts calls and can fail the n-th upsert.
pub struct FlakyIndex {
    pub inner: InMemoryIndex,
    fail_on_call: Option<usize>,
    upserts: AtomicUsize,
    queries: AtomicUsize,
}

impl FlakyIndex {
    pub fn never_failing() -> Self {
        Self {
            inner: InMemoryIndex::new(),
            fail_on_call: None,
            upserts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::never_failing()
        }
    }

    pub fn calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl VectorIndex for FlakyIndex {
    fn upsert<'a>(&'a self, records: &'a [IndexRecord]) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            let n = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(n) {
                return Err(RagError::Index(format!("upsert #{n} rejected")));
            }
            self.inner.upsert(records).await
        })
    }

    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        repository_id: &'a RepositoryId,
        top_k: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredRecord>, RagError>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(vector, repository_id, top_k)
    }

    fn has_records<'a>(
        &'a self,
        repository_id: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<bool, RagError>> {
        self.inner.has_records(repository_id)
    }
}
