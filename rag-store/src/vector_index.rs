//! Vector store contract shared by the Qdrant and in-memory backends.

use futures::future::BoxFuture;
use tracing::debug;

use crate::errors::RagError;
use crate::record::{IndexRecord, RepositoryId, ScoredRecord};

pub trait VectorIndex: Send + Sync {
    /// Inserts or overwrites records by id.
    fn upsert<'a>(&'a self, records: &'a [IndexRecord]) -> BoxFuture<'a, Result<(), RagError>>;

    /// Nearest neighbours of `vector` restricted to `repository_id`, best first, at most `top_k`.
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        repository_id: &'a RepositoryId,
        top_k: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredRecord>, RagError>>;

    /// True if at least one record exists for `repository_id`.
    fn has_records<'a>(
        &'a self,
        repository_id: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<bool, RagError>>;
}

/// Upserts `records` in chunks of `batch_size`; stops at the first failing batch.
///
/// Returns the number of records written.
pub async fn upsert_batched(
    index: &dyn VectorIndex,
    records: &[IndexRecord],
    batch_size: usize,
) -> Result<usize, RagError> {
    let mut written = 0;
    for batch in records.chunks(batch_size.max(1)) {
        index.upsert(batch).await?;
        written += batch.len();
        debug!(batch = batch.len(), written, "upsert batch committed");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyIndex, record};

    #[tokio::test]
    async fn failing_batch_aborts_the_rest() {
        let repo = RepositoryId::from_owner_repo("acme", "widgets");
        let records: Vec<_> = (0..250).map(|i| record(&repo, &format!("f{i}.rs"))).collect();
        let index = FlakyIndex::failing_on_call(2);

        let err = upsert_batched(&index, &records, 100).await.unwrap_err();
        assert!(matches!(err, RagError::Index(_)));
        assert_eq!(index.calls(), 2);
        assert_eq!(index.inner.len().await, 100);
    }

    #[tokio::test]
    async fn splits_into_fixed_batches() {
        let repo = RepositoryId::from_owner_repo("acme", "widgets");
        let records: Vec<_> = (0..250).map(|i| record(&repo, &format!("f{i}.rs"))).collect();
        let index = FlakyIndex::never_failing();

        assert_eq!(upsert_batched(&index, &records, 100).await.unwrap(), 250);
        assert_eq!(index.calls(), 3);
    }
}
