//! Unified error handling for `ai-llm-service`.
//!
//! This module exposes a single top-level error type [`AiLlmError`] for the whole
//! library, and groups domain-specific errors in nested types ([`ConfigError`],
//! [`ProviderError`]).
//!
//! Callers never inspect error messages. Every error maps to an [`ErrorClass`]
//! which is derived once, at the provider boundary, from the HTTP status and the
//! provider's structured error body (`error.code` / `error.status` / `error.type`).
//!
//! All messages include the prefix `[AI LLM Service]` to simplify attribution in logs.

use std::{fmt, time::Duration};

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::llm_provider::LlmProvider;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/* ------------------------------------------------------------------------- */
/* Error classes                                                             */
/* ------------------------------------------------------------------------- */

/// Coarse classification of a failure, used by callers to pick a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Account/project quota is exhausted. Retrying soon will not help.
    QuotaExceeded,
    /// Request rate is above the provider's limit.
    RateLimited,
    /// Network hiccup, timeout or 5xx. Safe to retry.
    Transient,
    /// Bad config, bad request, undecodable payload.
    Fatal,
}

impl ErrorClass {
    /// Quota and rate errors are the ones callers substitute a placeholder for.
    pub fn is_degradable(self) -> bool {
        matches!(self, ErrorClass::QuotaExceeded | ErrorClass::RateLimited)
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::RateLimited)
    }
}

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `ai-llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Provider-reported failure (non-2xx, bad payload, quota, ...).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[AI LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Operation exceeded the configured timeout.
    #[error("[AI LLM Service] operation timed out after {0:?}")]
    Timeout(Duration),
}

impl AiLlmError {
    /// Returns the class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            AiLlmError::Config(_) => ErrorClass::Fatal,
            AiLlmError::Provider(e) => e.kind.class(),
            AiLlmError::HttpTransport(e) => transport_class(e),
            AiLlmError::Timeout(_) => ErrorClass::Transient,
        }
    }

    /// Shorthand for building a quota error in provider fakes and adapters.
    pub fn quota_exceeded(provider: LlmProvider, detail: impl Into<String>) -> Self {
        ProviderError::new(
            provider,
            ProviderErrorKind::QuotaExceeded(HttpError {
                status: StatusCode::TOO_MANY_REQUESTS,
                url: String::new(),
                snippet: detail.into(),
            }),
        )
        .into()
    }
}

fn transport_class(e: &reqwest::Error) -> ErrorClass {
    if let Some(status) = e.status() {
        return status_class(status);
    }
    if e.is_decode() || e.is_builder() {
        ErrorClass::Fatal
    } else {
        // connect / timeout / body errors
        ErrorClass::Transient
    }
}

fn status_class(status: StatusCode) -> ErrorClass {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ErrorClass::RateLimited
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like ports, limits, timeouts).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_MAX_TOKENS`, `OLLAMA_PORT`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND`.
    #[error("[AI LLM Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Provider errors                                                           */
/* ------------------------------------------------------------------------- */

/// Failure reported by (or while talking to) a specific provider.
#[derive(Debug, Error)]
#[error("[AI LLM Service] {provider}: {kind}")]
pub struct ProviderError {
    pub provider: LlmProvider,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: LlmProvider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

/// What went wrong inside a provider call.
#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    #[error("config provider does not match the client")]
    InvalidProvider,

    #[error("api key is required")]
    MissingApiKey,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("quota exceeded ({0})")]
    QuotaExceeded(HttpError),

    #[error("rate limited ({http})")]
    RateLimited {
        retry_after_secs: Option<u64>,
        http: HttpError,
    },

    #[error("unexpected status ({0})")]
    HttpStatus(HttpError),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("response contained no content")]
    EmptyChoices,
}

impl ProviderErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderErrorKind::QuotaExceeded(_) => ErrorClass::QuotaExceeded,
            ProviderErrorKind::RateLimited { .. } => ErrorClass::RateLimited,
            ProviderErrorKind::HttpStatus(h) => status_class(h.status),
            _ => ErrorClass::Fatal,
        }
    }
}

/// Non-2xx response details.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: StatusCode,
    pub url: String,
    /// Short snippet of the response body (trimmed).
    pub snippet: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.snippet)
    }
}

/* ------------------------------------------------------------------------- */
/* Boundary classification                                                   */
/* ------------------------------------------------------------------------- */

/// Provider error codes that mean "quota exhausted" rather than "slow down".
///
/// - OpenAI: `insufficient_quota` (in `error.code` or `error.type`)
/// - Gemini: `RESOURCE_EXHAUSTED` (in `error.status`)
const QUOTA_CODES: &[&str] = &["insufficient_quota", "RESOURCE_EXHAUSTED"];

/// Common envelope used by OpenAI and Google for error bodies.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl ErrorBody {
    fn codes(&self) -> impl Iterator<Item = &str> {
        let code = self.code.as_ref().and_then(|c| c.as_str());
        code.into_iter()
            .chain(self.status.as_deref())
            .chain(self.kind.as_deref())
    }
}

/// Maps a non-2xx provider response into a typed [`ProviderError`].
///
/// The decision uses the status code and the structured error fields only.
pub fn classify_http_failure(
    provider: LlmProvider,
    status: StatusCode,
    url: String,
    body: &str,
    retry_after_secs: Option<u64>,
) -> ProviderError {
    let quota_code = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|env| env.error.codes().any(|c| QUOTA_CODES.contains(&c)))
        .unwrap_or(false);

    let http = HttpError {
        status,
        url,
        snippet: make_snippet(body),
    };

    let kind = if quota_code
        && (status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN)
    {
        ProviderErrorKind::QuotaExceeded(http)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderErrorKind::RateLimited {
            retry_after_secs,
            http,
        }
    } else {
        ProviderErrorKind::HttpStatus(http)
    };

    ProviderError::new(provider, kind)
}

/// Trims a response body for logs and error messages.
pub fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Fetches an optional, non-empty environment variable.
pub fn opt_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match opt_env(name) {
        Some(v) => v.trim().parse::<u32>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u32",
            })
        }),
        None => Ok(None),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match opt_env(name) {
        Some(v) => v.trim().parse::<u64>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        None => Ok(None),
    }
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}
