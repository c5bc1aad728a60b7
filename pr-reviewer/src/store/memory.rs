use std::collections::HashMap;

use futures::future::BoxFuture;
use git_context_engine::AccessToken;
use tokio::sync::RwLock;

use super::{CredentialStore, ReviewStore, new_repository};
use crate::errors::StoreError;
use crate::model::{Credential, RepositoryRecord, ReviewRecord};

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<Vec<Credential>>,
    repositories: RwLock<HashMap<(String, String), RepositoryRecord>>,
    reviews: RwLock<Vec<ReviewRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_credential(&self, user_id: &str, provider_id: &str, token: &str) {
        self.credentials.write().await.push(Credential {
            user_id: user_id.to_string(),
            provider_id: provider_id.to_string(),
            access_token: AccessToken::new(token),
        });
    }

    pub async fn add_repository(&self, record: RepositoryRecord) {
        self.repositories
            .write()
            .await
            .insert((record.owner.clone(), record.name.clone()), record);
    }

    /// Saved review records, one per id, in first-save order.
    pub async fn reviews(&self) -> Vec<ReviewRecord> {
        self.reviews.read().await.clone()
    }
}

impl CredentialStore for MemoryStore {
    fn find_credential<'a>(
        &'a self,
        user_id: &'a str,
        provider_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credential>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .credentials
                .read()
                .await
                .iter()
                .find(|c| c.user_id == user_id && c.provider_id == provider_id)
                .cloned())
        })
    }
}

impl ReviewStore for MemoryStore {
    fn find_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<RepositoryRecord>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .repositories
                .read()
                .await
                .get(&(owner.to_string(), name.to_string()))
                .cloned())
        })
    }

    fn register_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<RepositoryRecord, StoreError>> {
        Box::pin(async move {
            let mut repos = self.repositories.write().await;
            let record = repos
                .entry((owner.to_string(), name.to_string()))
                .or_insert_with(|| new_repository(owner, name, user_id));
            Ok(record.clone())
        })
    }

    fn save_review<'a>(&'a self, record: &'a ReviewRecord) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut reviews = self.reviews.write().await;
            match reviews.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => reviews.push(record.clone()),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::ReviewStatus;

    #[tokio::test]
    async fn credential_lookup_matches_user_and_provider() {
        let store = MemoryStore::new();
        store.add_credential("u1", "github", "t1").await;
        store.add_credential("u2", "github", "t2").await;

        let found = store.find_credential("u2", "github").await.unwrap().unwrap();
        assert_eq!(found.access_token.expose(), "t2");
        assert!(store.find_credential("u1", "gitlab").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.register_repository("acme", "widgets", "u1").await.unwrap();
        let b = store.register_repository("acme", "widgets", "u2").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(b.user_id, "u1");
        assert_eq!(store.find_repository("acme", "widgets").await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn saving_the_same_id_replaces_the_record() {
        let store = MemoryStore::new();
        let mut record = ReviewRecord {
            id: "i1".into(),
            repository_id: "repo-1".into(),
            pr_number: 42,
            pr_title: "t".into(),
            pr_url: "https://github.com/acme/widgets/pull/42".into(),
            review: "first".into(),
            status: ReviewStatus::Completed,
            created_at: Utc::now(),
        };
        store.save_review(&record).await.unwrap();
        record.review = "second".into();
        store.save_review(&record).await.unwrap();

        let reviews = store.reviews().await;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].review, "second");
    }
}
