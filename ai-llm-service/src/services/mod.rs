//! Thin provider clients. Each one turns a non-2xx response into a typed
//! [`ProviderError`](crate::error_handler::ProviderError) via [`ensure_success`].

pub mod gemini_service;
pub mod ollama_service;
pub mod open_ai_service;

use std::time::Duration;

use reqwest::{Response, header};
use tracing::error;

use crate::{
    config::llm_model_config::LlmModelConfig,
    config::llm_provider::LlmProvider,
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind, classify_http_failure},
};

/// Passes 2xx responses through; classifies everything else.
pub(crate) async fn ensure_success(
    provider: LlmProvider,
    url: &str,
    resp: Response,
) -> Result<Response, AiLlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = resp.text().await.unwrap_or_default();
    let err = classify_http_failure(provider, status, url.to_string(), &body, retry_after);

    error!(
        %provider,
        %status,
        %url,
        class = ?err.kind.class(),
        "provider returned non-success status"
    );

    Err(err.into())
}

/// Validates the provider tag and endpoint scheme shared by all clients.
pub(crate) fn validate_config(
    expected: LlmProvider,
    cfg: &LlmModelConfig,
) -> Result<String, AiLlmError> {
    if cfg.provider != expected {
        return Err(ProviderError::new(expected, ProviderErrorKind::InvalidProvider).into());
    }

    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty() || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ProviderError::new(
            expected,
            ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
        )
        .into());
    }

    Ok(endpoint.trim_end_matches('/').to_string())
}

/// Request timeout from config (default 60s).
pub(crate) fn timeout_of(cfg: &LlmModelConfig) -> Duration {
    cfg.timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(60))
}

pub(crate) fn decode_error(provider: LlmProvider, detail: String) -> AiLlmError {
    ProviderError::new(provider, ProviderErrorKind::Decode(detail)).into()
}
