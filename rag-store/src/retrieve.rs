//! Context retrieval: embed the query, top-K search, extract snippet text.

use tracing::{debug, instrument};

use crate::embed::EmbeddingGenerator;
use crate::errors::RagError;
use crate::record::RepositoryId;
use crate::vector_index::VectorIndex;

/// Returns up to `top_k` non-empty snippets for `query`, best match first.
///
/// An empty query embedding returns `[]` without touching the index.
#[instrument(skip_all, fields(repository = %repository_id, top_k = top_k))]
pub async fn retrieve_context(
    generator: &EmbeddingGenerator,
    index: &dyn VectorIndex,
    query: &str,
    repository_id: &RepositoryId,
    top_k: usize,
) -> Result<Vec<String>, RagError> {
    let vector = generator.embed(query).await?;
    if vector.is_empty() {
        debug!("empty query embedding, no context");
        return Ok(Vec::new());
    }

    let hits = index.query(&vector, repository_id, top_k).await?;
    let snippets: Vec<String> = hits
        .into_iter()
        .map(|h| h.metadata.content)
        .filter(|c| !c.is_empty())
        .collect();

    debug!(snippets = snippets.len(), "context retrieved");
    Ok(snippets)
}
