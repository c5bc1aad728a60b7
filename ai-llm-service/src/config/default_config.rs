//! Default LLM configs loaded from environment variables.
//!
//! Two roles are supported:
//!
//! - **Generation** → the model that writes reviews
//! - **Embedding**  → the model that turns code into vectors
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = provider kind (`ollama`, `openai`, `gemini`), default `gemini`
//! - `LLM_MODEL`         = generation model (default for Gemini: `gemini-2.5-flash`)
//! - `EMBEDDING_MODEL`   = embedding model (default for Gemini: `text-embedding-004`)
//! - `LLM_API_KEY`       = API key (required for OpenAI/Gemini)
//! - `LLM_MAX_TOKENS`    = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS`  = optional request timeout (u64)
//!
//! Provider endpoints:
//! - `OLLAMA_URL` or `OLLAMA_PORT`
//! - `OPENAI_BASE_URL` (default `https://api.openai.com`)
//! - `GEMINI_BASE_URL` (default `https://generativelanguage.googleapis.com`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint,
    },
};

const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";
const GEMINI_DEFAULT_EMBEDDING: &str = "text-embedding-004";

/// Resolves the provider from `LLM_KIND` (default: Gemini).
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match opt_env("LLM_KIND") {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::Gemini),
    }
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

fn endpoint_for(provider: LlmProvider) -> Result<String, AiLlmError> {
    match provider {
        LlmProvider::Ollama => ollama_endpoint(),
        LlmProvider::OpenAI => {
            let url = opt_env("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into());
            validate_http_endpoint("OPENAI_BASE_URL", &url)?;
            Ok(url)
        }
        LlmProvider::Gemini => {
            let url = opt_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".into());
            validate_http_endpoint("GEMINI_BASE_URL", &url)?;
            Ok(url)
        }
    }
}

fn api_key_for(provider: LlmProvider) -> Result<Option<String>, AiLlmError> {
    match provider {
        LlmProvider::Ollama => Ok(opt_env("LLM_API_KEY")),
        LlmProvider::OpenAI | LlmProvider::Gemini => must_env("LLM_API_KEY").map(Some),
    }
}

fn model_for(
    provider: LlmProvider,
    var: &'static str,
    gemini_default: &str,
) -> Result<String, AiLlmError> {
    match (opt_env(var), provider) {
        (Some(model), _) => Ok(model),
        (None, LlmProvider::Gemini) => Ok(gemini_default.to_string()),
        (None, _) => Err(ConfigError::MissingVar(var).into()),
    }
}

/// Constructs the config for the **generation** model.
///
/// # Defaults
/// - `temperature = Some(0.2)`
/// - `timeout_secs = Some(120)`
pub fn config_generation_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env()?;

    Ok(LlmModelConfig {
        provider,
        model: model_for(provider, "LLM_MODEL", GEMINI_DEFAULT_MODEL)?,
        endpoint: endpoint_for(provider)?,
        api_key: api_key_for(provider)?,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(120)),
    })
}

/// Constructs the config for the **embedding** model.
///
/// # Defaults
/// - `temperature = Some(0.0)` (deterministic)
/// - `timeout_secs = Some(30)`
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env()?;

    Ok(LlmModelConfig {
        provider,
        model: model_for(provider, "EMBEDDING_MODEL", GEMINI_DEFAULT_EMBEDDING)?,
        endpoint: endpoint_for(provider)?,
        api_key: api_key_for(provider)?,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}
