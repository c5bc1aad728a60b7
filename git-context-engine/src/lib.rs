//! Code host access for the review pipeline.
//!
//! - [`CodeHost`]: the contract (diff fetch, comment post, file listing)
//! - [`ProviderClient`]: runtime implementation (GitHub REST v3)

mod errors;
mod filters;
pub mod git_providers;

pub use errors::{
    GitContextEngineConfigError, GitContextEngineError, GitContextEngineProviderError,
    GitContextEngineResult,
};
pub use filters::is_binary_path;
pub use git_providers::{
    AccessToken, CodeHost, ProviderClient, ProviderConfig, ProviderKind, PullRequestDiff,
    PullRequestRef, RepoFile,
};
