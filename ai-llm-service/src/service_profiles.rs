//! Shared LLM service with two profiles: `generation` and `embedding`.
//!
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - Client construction failures are returned, never panicked on.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmModelConfig, LlmProvider, LlmServiceProfiles};
//!
//! # async fn run() -> ai_llm_service::error_handler::Result<()> {
//! let generation = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "qwen3:14b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     max_tokens: Some(2048),
//!     temperature: Some(0.2),
//!     top_p: None,
//!     timeout_secs: Some(120),
//! };
//! let embedding = LlmModelConfig {
//!     model: "nomic-embed-text".into(),
//!     ..generation.clone()
//! };
//!
//! let svc = Arc::new(LlmServiceProfiles::new(generation, embedding));
//! let review = svc.generate("Review this diff", None).await?;
//! let vector = svc.embed("fn main() {}").await?;
//! # let _ = (review, vector);
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    config::{
        default_config::{config_embedding_from_env, config_generation_from_env},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    services::{
        gemini_service::GeminiService, ollama_service::OllamaService,
        open_ai_service::OpenAiService,
    },
};

/// A constructed provider client.
#[derive(Debug, Clone)]
enum ProviderClient {
    Ollama(Arc<OllamaService>),
    OpenAI(Arc<OpenAiService>),
    Gemini(Arc<GeminiService>),
}

impl ProviderClient {
    fn build(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Ollama => Self::Ollama(Arc::new(OllamaService::new(cfg.clone())?)),
            LlmProvider::OpenAI => Self::OpenAI(Arc::new(OpenAiService::new(cfg.clone())?)),
            LlmProvider::Gemini => Self::Gemini(Arc::new(GeminiService::new(cfg.clone())?)),
        })
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        match self {
            Self::Ollama(c) => c.generate(prompt, system).await,
            Self::OpenAI(c) => c.generate(prompt, system).await,
            Self::Gemini(c) => c.generate(prompt, system).await,
        }
    }

    async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self {
            Self::Ollama(c) => c.embeddings(input).await,
            Self::OpenAI(c) => c.embeddings(input).await,
            Self::Gemini(c) => c.embeddings(input).await,
        }
    }
}

/// Shared service that manages the **generation** and **embedding** profiles.
pub struct LlmServiceProfiles {
    generation: LlmModelConfig,
    embedding: LlmModelConfig,
    clients: RwLock<HashMap<ClientKey, ProviderClient>>,
}

impl LlmServiceProfiles {
    pub fn new(generation: LlmModelConfig, embedding: LlmModelConfig) -> Self {
        Self {
            generation,
            embedding,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Builds both profiles from environment variables.
    ///
    /// See [`crate::config::default_config`] for the variable list.
    pub fn from_env() -> Result<Self, AiLlmError> {
        Ok(Self::new(
            config_generation_from_env()?,
            config_embedding_from_env()?,
        ))
    }

    /// Generates text using the **generation** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`]; inspect [`AiLlmError::class`] to pick a policy.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let cli = self.client_for(&self.generation).await?;
        cli.generate(prompt, system).await
    }

    /// Computes one embedding vector using the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let cli = self.client_for(&self.embedding).await?;
        cli.embeddings(input).await
    }

    /// Returns references to the current profiles `(generation, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.generation, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn client_for(&self, cfg: &LlmModelConfig) -> Result<ProviderClient, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }

        let mut w = self.clients.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }

        debug!(provider = %cfg.provider, model = %cfg.model, "initializing provider client");
        let cli = ProviderClient::build(cfg)?;
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::{ErrorClass, ProviderErrorKind};

    fn cfg(provider: LlmProvider, api_key: Option<&str>) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: "m".into(),
            endpoint: "http://localhost:1".into(),
            api_key: api_key.map(str::to_string),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[tokio::test]
    async fn missing_api_key_surfaces_as_fatal_error() {
        let svc = LlmServiceProfiles::new(
            cfg(LlmProvider::Gemini, None),
            cfg(LlmProvider::Gemini, None),
        );

        let err = svc.embed("x").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Fatal);
        match err {
            AiLlmError::Provider(p) => assert!(matches!(p.kind, ProviderErrorKind::MissingApiKey)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc = LlmServiceProfiles::new(
            cfg(LlmProvider::Ollama, None),
            cfg(LlmProvider::Ollama, None),
        );

        let (generation, embedding) = svc.profiles();
        svc.client_for(generation).await.unwrap();
        svc.client_for(embedding).await.unwrap();
        assert_eq!(svc.clients.read().await.len(), 1);
    }
}
