//! Runtime and collection configuration.
//!
//! # Environment variables
//! - `VECTOR_BACKEND`    = `qdrant` (default) or `memory`
//! - `QDRANT_URL`        = gRPC endpoint, default `http://localhost:6334`
//! - `QDRANT_API_KEY`    = optional API key
//! - `QDRANT_COLLECTION` = collection name, default `code_index`
//! - `EMBEDDING_DIM`     = vector size, default `768`
//! - `EMBED_MAX_CHARS`   = per-chunk character budget, default `3000`
//! - `UPSERT_BATCH`      = records per upsert, default `100`
//! - `RAG_TOP_K`         = retrieved snippets per query, default `5`
//! - `EMBED_RPS`         = embedding requests per second, default `5.0`
//! - `EMBED_BURST`       = token bucket capacity, default `1`

use std::str::FromStr;

use ai_llm_service::error_handler::opt_env;

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    Cosine,
    Dot,
    Euclid,
}

/// Which [`crate::VectorIndex`] implementation backs the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

impl FromStr for VectorBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(RagError::Config(format!(
                "unsupported VECTOR_BACKEND '{other}'"
            ))),
        }
    }
}

/// Configuration for indexing and retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub backend: VectorBackend,
    /// Qdrant endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    pub distance: DistanceKind,
    /// Dimensionality of the embedding model output.
    pub vector_dim: usize,
    /// Max characters of a labeled block sent to the embedding model.
    pub embed_max_chars: usize,
    /// Records per upsert call.
    pub upsert_batch: usize,
    /// Default number of snippets returned by retrieval.
    pub top_k: usize,
    /// Embedding calls per second allowed by the provider.
    pub embed_rps: f64,
    /// Token bucket capacity.
    pub embed_burst: u32,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
}

impl RagConfig {
    /// Creates a sane default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            vector_dim: 768,
            embed_max_chars: 3000,
            upsert_batch: 100,
            top_k: 5,
            embed_rps: 5.0,
            embed_burst: 1,
            exact_search: false,
        }
    }

    /// In-memory config, used by tests and local runs without Qdrant.
    pub fn in_memory() -> Self {
        Self {
            backend: VectorBackend::Memory,
            ..Self::new_default("http://localhost:6334", "code_index")
        }
    }

    /// Reads the config from environment variables (see module docs).
    pub fn from_env() -> Result<Self, RagError> {
        let mut cfg = Self::new_default(
            opt_env("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".into()),
            opt_env("QDRANT_COLLECTION").unwrap_or_else(|| "code_index".into()),
        );

        if let Some(backend) = opt_env("VECTOR_BACKEND") {
            cfg.backend = backend.parse()?;
        }
        cfg.qdrant_api_key = opt_env("QDRANT_API_KEY");
        cfg.vector_dim = parse_env("EMBEDDING_DIM")?.unwrap_or(cfg.vector_dim);
        cfg.embed_max_chars = parse_env("EMBED_MAX_CHARS")?.unwrap_or(cfg.embed_max_chars);
        cfg.upsert_batch = parse_env("UPSERT_BATCH")?.unwrap_or(cfg.upsert_batch);
        cfg.top_k = parse_env("RAG_TOP_K")?.unwrap_or(cfg.top_k);
        cfg.embed_rps = parse_env("EMBED_RPS")?.unwrap_or(cfg.embed_rps);
        cfg.embed_burst = parse_env("EMBED_BURST")?.unwrap_or(cfg.embed_burst);

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.backend == VectorBackend::Qdrant && self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.vector_dim == 0 {
            return Err(RagError::Config("vector_dim must be > 0".into()));
        }
        if self.embed_max_chars == 0 {
            return Err(RagError::Config("embed_max_chars must be > 0".into()));
        }
        if self.embed_rps.is_nan() || self.embed_rps <= 0.0 {
            return Err(RagError::Config("embed_rps must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, RagError> {
    match opt_env(name) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RagError::Config(format!("invalid number in {name}: '{v}'"))),
        None => Ok(None),
    }
}
