//! Crate-wide error hierarchy for pr-reviewer.
//!
//! - Single root [`ReviewError`] for workflows, stores and the scheduler.
//! - Lower-layer errors are wrapped transparently and keep their own class.
//! - [`ReviewError::class`] drives the step executor: retry, degrade or fail.

use ai_llm_service::{AiLlmError, ErrorClass};
use git_context_engine::{GitContextEngineError, ProviderKind};
use rag_store::RagError;
use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Root error type for the pr-reviewer crate.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Missing credential, unknown repository, bad environment.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Code host failure (diff fetch, comment post, file listing).
    #[error(transparent)]
    Host(#[from] GitContextEngineError),

    /// Embedding / vector index failure.
    #[error(transparent)]
    Rag(#[from] RagError),

    /// Generative model failure that could not be degraded.
    #[error(transparent)]
    Llm(#[from] AiLlmError),

    /// Credential / repository / review persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Step journal failure.
    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl ReviewError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReviewError::Config(_) => ErrorClass::Fatal,
            ReviewError::Host(e) => host_class(e),
            ReviewError::Rag(e) => e.class(),
            ReviewError::Llm(e) => e.class(),
            ReviewError::Store(StoreError::Io(_)) => ErrorClass::Transient,
            ReviewError::Store(StoreError::Serde(_)) => ErrorClass::Fatal,
            ReviewError::Journal(JournalError::Io(_)) => ErrorClass::Transient,
            ReviewError::Journal(_) => ErrorClass::Fatal,
        }
    }

    /// True if the step executor should try the step again.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

fn host_class(e: &GitContextEngineError) -> ErrorClass {
    use git_context_engine::GitContextEngineProviderError as P;
    match e {
        GitContextEngineError::Provider(P::RateLimited { .. }) => ErrorClass::RateLimited,
        e if e.is_retryable() => ErrorClass::Transient,
        _ => ErrorClass::Fatal,
    }
}

/// Configuration problems. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {provider} access token found for user '{user_id}'")]
    MissingCredential {
        user_id: String,
        provider: ProviderKind,
    },

    #[error("repository '{0}' not found")]
    RepositoryNotFound(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Persistence failures of the JSON-file stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Step journal failures.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unknown workflow instance '{0}'")]
    UnknownInstance(String),

    #[error("workflow instance '{0}' is already journaled with a different event")]
    ConflictingEvent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_context_engine::GitContextEngineProviderError;

    #[test]
    fn missing_credential_is_fatal() {
        let err: ReviewError = ConfigError::MissingCredential {
            user_id: "u1".into(),
            provider: ProviderKind::GitHub,
        }
        .into();
        assert_eq!(err.class(), ErrorClass::Fatal);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "no github access token found for user 'u1'");
    }

    #[test]
    fn host_errors_keep_their_retry_semantics() {
        let server: ReviewError =
            GitContextEngineError::from(GitContextEngineProviderError::Server(502)).into();
        assert_eq!(server.class(), ErrorClass::Transient);

        let limited: ReviewError = GitContextEngineError::from(
            GitContextEngineProviderError::RateLimited {
                retry_after_secs: Some(3),
            },
        )
        .into();
        assert_eq!(limited.class(), ErrorClass::RateLimited);

        let missing: ReviewError =
            GitContextEngineError::from(GitContextEngineProviderError::NotFound).into();
        assert!(!missing.is_retryable());
    }

    #[test]
    fn conflicting_event_is_not_retried() {
        let err: ReviewError = JournalError::ConflictingEvent("x".into()).into();
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn store_io_is_transient() {
        let err: ReviewError = StoreError::Io(std::io::Error::other("disk")).into();
        assert!(err.is_retryable());
    }
}
