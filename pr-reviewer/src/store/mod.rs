//! Persistence contracts used by the workflows.
//!
//! - [`CredentialStore`]: linked provider accounts, looked up per requester
//! - [`ReviewStore`]: connected repositories and review records
//!
//! [`FileStore`] keeps everything as JSON under one data directory;
//! [`MemoryStore`] backs tests and throwaway runs.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use futures::future::BoxFuture;

use crate::errors::StoreError;
use crate::model::{Credential, RepositoryRecord, ReviewRecord};

pub trait CredentialStore: Send + Sync {
    /// Linked account of `user_id` for `provider_id` (e.g. "github").
    fn find_credential<'a>(
        &'a self,
        user_id: &'a str,
        provider_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credential>, StoreError>>;
}

pub trait ReviewStore: Send + Sync {
    fn find_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<RepositoryRecord>, StoreError>>;

    /// Returns the existing record for `owner/name` or creates one.
    fn register_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<RepositoryRecord, StoreError>>;

    fn save_review<'a>(&'a self, record: &'a ReviewRecord) -> BoxFuture<'a, Result<(), StoreError>>;
}

fn new_repository(owner: &str, name: &str, user_id: &str) -> RepositoryRecord {
    RepositoryRecord {
        id: uuid::Uuid::new_v4().to_string(),
        owner: owner.to_string(),
        name: name.to_string(),
        user_id: user_id.to_string(),
    }
}
