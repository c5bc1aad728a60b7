//! Repository indexing: labeled block → truncate → embed → batched upsert.
//!
//! A repository that already has records in the index is skipped entirely.
//! Files whose embedding comes back empty (blank content, quota) are skipped.
//! A non-degradable embedding error or a failing batch aborts the run; batches
//! flushed before the failure stay in the index.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::embed::EmbeddingGenerator;
use crate::errors::RagError;
use crate::record::{FileChunk, IndexRecord, RecordMetadata, RepositoryId, record_id};
use crate::text::{labeled_block, truncate_chars};
use crate::vector_index::{VectorIndex, upsert_batched};

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub repository_id: String,
    /// True when the dedup check found existing records and nothing was done.
    pub already_indexed: bool,
    pub files_seen: usize,
    pub files_skipped: usize,
    pub records_upserted: usize,
}

#[instrument(skip_all, fields(repository = %repository_id, files = files.len()))]
pub async fn index_repository(
    generator: &EmbeddingGenerator,
    index: &dyn VectorIndex,
    repository_id: &RepositoryId,
    files: &[FileChunk],
    batch_size: usize,
) -> Result<IndexReport, RagError> {
    let mut report = IndexReport {
        repository_id: repository_id.to_string(),
        files_seen: files.len(),
        ..IndexReport::default()
    };

    if index.has_records(repository_id).await? {
        info!("repository already indexed, skipping");
        report.already_indexed = true;
        return Ok(report);
    }

    let batch_size = batch_size.max(1);
    let mut pending: Vec<IndexRecord> = Vec::with_capacity(batch_size);

    for file in files {
        let block = labeled_block(&file.path, &file.content);
        let content = truncate_chars(&block, generator.max_chars());

        let vector = generator.embed(content).await?;
        if vector.is_empty() {
            warn!(path = %file.path, "no embedding for file, skipping");
            report.files_skipped += 1;
            continue;
        }

        pending.push(IndexRecord {
            id: record_id(repository_id, &file.path),
            vector,
            metadata: RecordMetadata {
                repository_id: repository_id.to_string(),
                path: file.path.clone(),
                content: content.to_string(),
            },
        });

        if pending.len() >= batch_size {
            report.records_upserted += upsert_batched(index, &pending, batch_size).await?;
            pending.clear();
        }
    }

    if !pending.is_empty() {
        report.records_upserted += upsert_batched(index, &pending, batch_size).await?;
    }

    debug!(?report, "indexing finished");
    info!(
        upserted = report.records_upserted,
        skipped = report.files_skipped,
        "repository indexed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::InMemoryIndex;
    use crate::testing::{EmbedMode, FakeEmbedder, FlakyIndex};
    use crate::throttle::TokenBucket;

    fn generator(fake: &Arc<FakeEmbedder>) -> EmbeddingGenerator {
        EmbeddingGenerator::new(fake.clone(), Arc::new(TokenBucket::unlimited()), 3000)
    }

    fn widgets_files() -> Vec<FileChunk> {
        vec![
            FileChunk::new("README.md", "# Widgets"),
            FileChunk::new("src/lib.rs", "pub fn widget() {}"),
            FileChunk::new("src/bin/main.rs", "fn main() { widgets::widget(); }"),
        ]
    }

    #[tokio::test]
    async fn indexes_every_file_into_an_empty_store() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let index = InMemoryIndex::new();
        let repo = RepositoryId::from_owner_repo("acme", "widgets");

        let report = index_repository(&generator(&fake), &index, &repo, &widgets_files(), 100)
            .await
            .unwrap();

        assert_eq!(report.records_upserted, 3);
        assert_eq!(
            index.ids().await,
            [
                "acme/widgets-README.md",
                "acme/widgets-src_2f_bin_2f_main.rs",
                "acme/widgets-src_2f_lib.rs",
            ]
        );

        let rec = index.get("acme/widgets-src_2f_lib.rs").await.unwrap();
        assert_eq!(rec.metadata.repository_id, "acme/widgets");
        assert_eq!(rec.metadata.path, "src/lib.rs");
        assert_eq!(rec.metadata.content, "File: src/lib.rs\n\npub fn widget() {}");
    }

    #[tokio::test]
    async fn second_run_makes_no_embedding_calls() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let index = InMemoryIndex::new();
        let repo = RepositoryId::from_owner_repo("acme", "widgets");
        let files = widgets_files();

        index_repository(&generator(&fake), &index, &repo, &files, 100)
            .await
            .unwrap();
        let calls_after_first = fake.calls();

        let report = index_repository(&generator(&fake), &index, &repo, &files, 100)
            .await
            .unwrap();

        assert!(report.already_indexed);
        assert_eq!(fake.calls(), calls_after_first);
        assert_eq!(index.len().await, 3);
    }

    #[tokio::test]
    async fn empty_embeddings_are_skipped() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::EmptyWhen("README")));
        let index = InMemoryIndex::new();
        let repo = RepositoryId::from_owner_repo("acme", "widgets");

        let report = index_repository(&generator(&fake), &index, &repo, &widgets_files(), 100)
            .await
            .unwrap();

        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.records_upserted, 2);
        assert!(index.get("acme/widgets-README.md").await.is_none());
    }

    #[tokio::test]
    async fn quota_exhaustion_indexes_nothing_without_failing() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Quota));
        let index = InMemoryIndex::new();
        let repo = RepositoryId::from_owner_repo("acme", "widgets");

        let report = index_repository(&generator(&fake), &index, &repo, &widgets_files(), 100)
            .await
            .unwrap();

        assert_eq!(report.files_skipped, 3);
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn stored_content_is_truncated_block() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let index = InMemoryIndex::new();
        let repo = RepositoryId::from_owner_repo("acme", "widgets");
        let files = vec![FileChunk::new("big.txt", "z".repeat(10_000))];

        index_repository(&generator(&fake), &index, &repo, &files, 100)
            .await
            .unwrap();

        let rec = index.get("acme/widgets-big.txt").await.unwrap();
        assert_eq!(rec.metadata.content.chars().count(), 3000);
        assert!(rec.metadata.content.starts_with("File: big.txt\n\n"));
    }

    #[tokio::test]
    async fn batch_failure_keeps_flushed_batches() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let index = FlakyIndex::failing_on_call(2);
        let repo = RepositoryId::from_owner_repo("acme", "widgets");
        let files: Vec<_> = (0..5)
            .map(|i| FileChunk::new(format!("f{i}.rs"), "fn f() {}"))
            .collect();

        let err = index_repository(&generator(&fake), &index, &repo, &files, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Index(_)));
        assert_eq!(index.inner.len().await, 2);
        // the run stopped at the failing batch
        assert_eq!(fake.calls(), 4);
    }

    #[tokio::test]
    async fn hyphenated_names_keep_repositories_apart() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Ok));
        let index = InMemoryIndex::new();
        let widgets = RepositoryId::from_owner_repo("acme", "widgets");
        let widgets_x = RepositoryId::from_owner_repo("acme", "widgets-x");

        index_repository(&generator(&fake), &index, &widgets, &[FileChunk::new("x-y", "a")], 100)
            .await
            .unwrap();
        index_repository(&generator(&fake), &index, &widgets_x, &[FileChunk::new("y", "b")], 100)
            .await
            .unwrap();

        assert_eq!(index.len().await, 2);
        assert!(index.has_records(&widgets).await.unwrap());
        assert!(index.has_records(&widgets_x).await.unwrap());
    }

    #[tokio::test]
    async fn fatal_embedding_error_aborts() {
        let fake = Arc::new(FakeEmbedder::new(EmbedMode::Fatal));
        let index = InMemoryIndex::new();
        let repo = RepositoryId::from_owner_repo("acme", "widgets");

        let err = index_repository(&generator(&fake), &index, &repo, &widgets_files(), 100)
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(fake.calls(), 1);
    }
}
