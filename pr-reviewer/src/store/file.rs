//! JSON-file persistence.
//!
//! Layout under the data directory:
//!   credentials.json        `[Credential]`, provisioned out of band
//!   repositories.json       `[RepositoryRecord]`
//!   reviews/<id>.json       one `ReviewRecord` per file

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CredentialStore, ReviewStore, new_repository};
use crate::errors::StoreError;
use crate::json_file::{file_key, read_json, write_json};
use crate::model::{Credential, RepositoryRecord, ReviewRecord};

pub struct FileStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles on `repositories.json`.
    repositories_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            repositories_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn credentials_path(&self) -> PathBuf {
        self.root.join("credentials.json")
    }

    fn repositories_path(&self) -> PathBuf {
        self.root.join("repositories.json")
    }

    fn review_path(&self, id: &str) -> PathBuf {
        self.root.join("reviews").join(format!("{}.json", file_key(id)))
    }

    async fn load_repositories(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        Ok(read_json::<_, StoreError>(&self.repositories_path())
            .await?
            .unwrap_or_default())
    }

    pub async fn load_review(&self, id: &str) -> Result<Option<ReviewRecord>, StoreError> {
        read_json(&self.review_path(id)).await
    }
}

impl CredentialStore for FileStore {
    fn find_credential<'a>(
        &'a self,
        user_id: &'a str,
        provider_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credential>, StoreError>> {
        Box::pin(async move {
            let all: Vec<Credential> = read_json::<_, StoreError>(&self.credentials_path())
                .await?
                .unwrap_or_default();
            Ok(all
                .into_iter()
                .find(|c| c.user_id == user_id && c.provider_id == provider_id))
        })
    }
}

impl ReviewStore for FileStore {
    fn find_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<RepositoryRecord>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .load_repositories()
                .await?
                .into_iter()
                .find(|r| r.owner == owner && r.name == name))
        })
    }

    fn register_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<RepositoryRecord, StoreError>> {
        Box::pin(async move {
            let _guard = self.repositories_lock.lock().await;
            let mut repos = self.load_repositories().await?;
            if let Some(existing) = repos.iter().find(|r| r.owner == owner && r.name == name) {
                return Ok(existing.clone());
            }
            let record = new_repository(owner, name, user_id);
            repos.push(record.clone());
            write_json::<_, StoreError>(&self.repositories_path(), &repos).await?;
            debug!(repository = %format!("{owner}/{name}"), id = %record.id, "repository registered");
            Ok(record)
        })
    }

    fn save_review<'a>(&'a self, record: &'a ReviewRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            write_json::<_, StoreError>(&self.review_path(&record.id), record).await?;
            debug!(id = %record.id, status = ?record.status, "review record written");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_file::temp_dir;
    use crate::model::ReviewStatus;
    use git_context_engine::AccessToken;

    #[tokio::test]
    async fn reads_provisioned_credentials() {
        let dir = temp_dir("file-store");
        let store = FileStore::new(&dir);
        assert!(store.find_credential("u1", "github").await.unwrap().is_none());

        let creds = vec![Credential {
            user_id: "u1".into(),
            provider_id: "github".into(),
            access_token: AccessToken::new("ghp_1"),
        }];
        write_json::<_, StoreError>(&dir.join("credentials.json"), &creds)
            .await
            .unwrap();

        let found = store.find_credential("u1", "github").await.unwrap().unwrap();
        assert_eq!(found.access_token.expose(), "ghp_1");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn repositories_and_reviews_persist() {
        let dir = temp_dir("file-store");
        let store = FileStore::new(&dir);

        let repo = store.register_repository("acme", "widgets", "u1").await.unwrap();
        let again = FileStore::new(&dir)
            .find_repository("acme", "widgets")
            .await
            .unwrap();
        assert_eq!(again, Some(repo.clone()));

        let record = ReviewRecord {
            id: "r-1".into(),
            repository_id: repo.id.clone(),
            pr_number: 42,
            pr_title: "Add feature".into(),
            pr_url: "https://github.com/acme/widgets/pull/42".into(),
            review: "LGTM".into(),
            status: ReviewStatus::Completed,
            created_at: chrono::Utc::now(),
        };
        store.save_review(&record).await.unwrap();
        assert_eq!(store.load_review("r-1").await.unwrap(), Some(record));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn similar_review_ids_get_separate_files() {
        let dir = temp_dir("file-store");
        let store = FileStore::new(&dir);
        let record = |id: &str, review: &str| ReviewRecord {
            id: id.into(),
            repository_id: "acme/widgets".into(),
            pr_number: 1,
            pr_title: "t".into(),
            pr_url: "https://github.com/acme/widgets/pull/1".into(),
            review: review.into(),
            status: ReviewStatus::Completed,
            created_at: chrono::Utc::now(),
        };

        store.save_review(&record("evt/1", "slash")).await.unwrap();
        store.save_review(&record("evt_1", "underscore")).await.unwrap();

        assert_eq!(store.load_review("evt/1").await.unwrap().unwrap().review, "slash");
        assert_eq!(store.load_review("evt_1").await.unwrap().unwrap().review, "underscore");
        let _ = std::fs::remove_dir_all(dir);
    }
}
