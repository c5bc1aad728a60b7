//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! All Qdrant interactions sit behind [`VectorIndex`], hiding the builder
//! pattern and keeping the rest of the workspace decoupled from `qdrant-client`.
//!
//! Point ids are [`stable_uuid`]s of the record id; the readable record id is
//! kept in the payload under `record_id`.

use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct,
    SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QValue,
    VectorParamsBuilder,
};
use futures::future::BoxFuture;
use qdrant_client::{Payload, Qdrant};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{DistanceKind, RagConfig};
use crate::errors::RagError;
use crate::record::{IndexRecord, RecordMetadata, RepositoryId, ScoredRecord, stable_uuid};
use crate::vector_index::VectorIndex;

const REPOSITORY_FIELD: &str = "repository_id";

pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
    vector_dim: usize,
    exact: bool,
    ready: OnceCell<()>,
}

impl QdrantFacade {
    /// Creates a new facade; the collection is created lazily on first use.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
            vector_dim: cfg.vector_dim,
            exact: cfg.exact_search,
            ready: OnceCell::new(),
        })
    }

    /// Ensures that the collection exists (no-op after the first success).
    async fn ensure_collection(&self) -> Result<(), RagError> {
        self.ready
            .get_or_try_init(|| async {
                if self.client.collection_exists(&self.collection).await? {
                    debug!(collection = %self.collection, "collection already exists");
                    return Ok(());
                }

                let distance = match self.distance {
                    DistanceKind::Cosine => Distance::Cosine,
                    DistanceKind::Dot => Distance::Dot,
                    DistanceKind::Euclid => Distance::Euclid,
                };
                self.client
                    .create_collection(
                        CreateCollectionBuilder::new(&self.collection).vectors_config(
                            VectorParamsBuilder::new(self.vector_dim as u64, distance),
                        ),
                    )
                    .await?;

                info!(
                    collection = %self.collection,
                    size = self.vector_dim,
                    distance = ?self.distance,
                    "collection created"
                );
                Ok::<(), RagError>(())
            })
            .await
            .map(|_| ())
    }

    fn to_point(&self, r: &IndexRecord) -> Result<PointStruct, RagError> {
        if r.vector.len() != self.vector_dim {
            return Err(RagError::VectorSizeMismatch {
                got: r.vector.len(),
                want: self.vector_dim,
            });
        }

        let payload = Payload::try_from(serde_json::json!({
            "record_id": r.id,
            "repository_id": r.metadata.repository_id,
            "path": r.metadata.path,
            "content": r.metadata.content,
        }))?;

        Ok(PointStruct::new(
            stable_uuid(&r.id).to_string(),
            r.vector.clone(),
            payload,
        ))
    }

    fn repository_filter(repository_id: &RepositoryId) -> Filter {
        Filter::must([Condition::matches(
            REPOSITORY_FIELD,
            repository_id.as_str().to_string(),
        )])
    }
}

fn payload_string(payload: &std::collections::HashMap<String, QValue>, key: &str) -> String {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

impl VectorIndex for QdrantFacade {
    fn upsert<'a>(&'a self, records: &'a [IndexRecord]) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            if records.is_empty() {
                return Ok(());
            }
            self.ensure_collection().await?;

            let points = records
                .iter()
                .map(|r| self.to_point(r))
                .collect::<Result<Vec<_>, _>>()?;

            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
                .await?;

            debug!(collection = %self.collection, count = records.len(), "upsert acknowledged");
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
            self.ensure_collection().await?;

            let mut builder =
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
                    .filter(Self::repository_filter(repository_id))
                    .with_payload(true);
            if self.exact {
                builder = builder.params(SearchParamsBuilder::default().exact(true));
            }

            let res = self.client.search_points(builder).await?;

            let mut out: Vec<ScoredRecord> = res
                .result
                .into_iter()
                .map(|p| ScoredRecord {
                    score: p.score,
                    metadata: RecordMetadata {
                        repository_id: payload_string(&p.payload, REPOSITORY_FIELD),
                        path: payload_string(&p.payload, "path"),
                        content: payload_string(&p.payload, "content"),
                    },
                })
                .collect();
            out.sort_by(|a, b| b.score.total_cmp(&a.score));
            out.truncate(top_k);

            debug!(repository = %repository_id, hits = out.len(), "search completed");
            Ok(out)
        })
    }

    fn has_records<'a>(
        &'a self,
        repository_id: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<bool, RagError>> {
        Box::pin(async move {
            self.ensure_collection().await?;

            let res = self
                .client
                .count(
                    CountPointsBuilder::new(&self.collection)
                        .filter(Self::repository_filter(repository_id))
                        .exact(false),
                )
                .await?;

            Ok(res.result.map(|r| r.count).unwrap_or(0) > 0)
        })
    }
}
