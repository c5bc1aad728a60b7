//! Provider facade.
//!
//! [`CodeHost`] is the contract the review pipeline talks to; [`ProviderClient`]
//! is the runtime implementation with enum dispatch over concrete hosts.
//!
//!   * fetch a PR diff with title/description
//!   * post a top-level PR comment
//!   * list the text files of a repository (recursive, binaries excluded)

pub mod types;
pub use types::*;

pub mod github;

use futures::future::BoxFuture;
use tracing::debug;

use crate::errors::{GitContextEngineConfigError, GitContextEngineResult};

/// Operations the review and indexing workflows need from a code host.
///
/// Every call carries the requesting user's token; clients hold no credentials.
pub trait CodeHost: Send + Sync {
    fn fetch_diff<'a>(
        &'a self,
        token: &'a AccessToken,
        pr: &'a PullRequestRef,
    ) -> BoxFuture<'a, GitContextEngineResult<PullRequestDiff>>;

    fn post_comment<'a>(
        &'a self,
        token: &'a AccessToken,
        pr: &'a PullRequestRef,
        body: &'a str,
    ) -> BoxFuture<'a, GitContextEngineResult<()>>;

    /// Walks `path` (empty = repository root) recursively.
    fn list_files<'a>(
        &'a self,
        token: &'a AccessToken,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, GitContextEngineResult<Vec<RepoFile>>>;
}

/// Runtime configuration for any provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API base, e.g. "https://api.github.com".
    pub base_api: String,
}

impl ProviderConfig {
    /// GitHub config from `GITHUB_API_BASE` (default `https://api.github.com`).
    pub fn github_from_env() -> GitContextEngineResult<Self> {
        let base_api = std::env::var("GITHUB_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.github.com".to_string());

        if !(base_api.starts_with("http://") || base_api.starts_with("https://")) {
            return Err(GitContextEngineConfigError::InvalidBaseUrl(base_api).into());
        }

        Ok(Self {
            kind: ProviderKind::GitHub,
            base_api: base_api.trim_end_matches('/').to_string(),
        })
    }
}

/// Concrete provider client with enum dispatch.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(github::GitHubClient),
}

impl ProviderClient {
    /// Constructs a concrete provider client from generic configuration.
    ///
    /// The underlying HTTP client is shared and configured with a stable
    /// user agent (GitHub rejects requests without one).
    pub fn from_config(cfg: ProviderConfig) -> GitContextEngineResult<Self> {
        debug!(kind = ?cfg.kind, base_api = %cfg.base_api, "initializing provider client");

        let http = reqwest::Client::builder()
            .user_agent("pr-review-backend/0.1")
            .build()?;

        Ok(match cfg.kind {
            ProviderKind::GitHub => {
                ProviderClient::GitHub(github::GitHubClient::new(http, cfg.base_api))
            }
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::GitHub(_) => ProviderKind::GitHub,
        }
    }
}

impl CodeHost for ProviderClient {
    fn fetch_diff<'a>(
        &'a self,
        token: &'a AccessToken,
        pr: &'a PullRequestRef,
    ) -> BoxFuture<'a, GitContextEngineResult<PullRequestDiff>> {
        match self {
            Self::GitHub(c) => Box::pin(c.fetch_diff(token, pr)),
        }
    }

    fn post_comment<'a>(
        &'a self,
        token: &'a AccessToken,
        pr: &'a PullRequestRef,
        body: &'a str,
    ) -> BoxFuture<'a, GitContextEngineResult<()>> {
        match self {
            Self::GitHub(c) => Box::pin(c.post_comment(token, pr, body)),
        }
    }

    fn list_files<'a>(
        &'a self,
        token: &'a AccessToken,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, GitContextEngineResult<Vec<RepoFile>>> {
        match self {
            Self::GitHub(c) => Box::pin(c.list_files(token, owner, repo, path)),
        }
    }
}
