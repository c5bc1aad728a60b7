//! Core data models used by the library.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Partition key for all vectors of one repository: `owner/name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(String);

impl RepositoryId {
    /// The only way to derive a repository key. Indexing and retrieval both go through it.
    pub fn from_owner_repo(owner: &str, repo: &str) -> Self {
        Self(format!("{}/{}", owner.trim(), repo.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One repository file handed to the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChunk {
    pub path: String,
    pub content: String,
}

impl FileChunk {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Payload stored next to each vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub repository_id: String,
    pub path: String,
    /// The truncated labeled block that was embedded.
    pub content: String,
}

/// Record written to the vector index.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One query match.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredRecord {
    pub score: f32,
    pub metadata: RecordMetadata,
}

/// `<repository_id>-<sanitized path>`.
pub fn record_id(repository_id: &RepositoryId, path: &str) -> String {
    format!("{repository_id}-{}", sanitize_path(path))
}

/// Injective path encoding: `[A-Za-z0-9.]` pass through, every other char
/// becomes `_<hex codepoint>_`.
///
/// No raw `-` survives, so the last `-` of a record id is always the separator.
///
/// `src/main.rs` → `src_2f_main.rs`, `x-y` → `x_2d_y`
pub fn sanitize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' {
            out.push(ch);
        } else {
            out.push_str(&format!("_{:x}_", ch as u32));
        }
    }
    out
}

/// Stable UUID derived from a record id (Qdrant point ids must be UUIDs or integers).
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_id_is_owner_slash_repo() {
        let id = RepositoryId::from_owner_repo("acme", "widgets");
        assert_eq!(id.as_str(), "acme/widgets");
        assert_eq!(id, RepositoryId::from_owner_repo(" acme ", "widgets"));
    }

    #[test]
    fn record_id_layout() {
        let repo = RepositoryId::from_owner_repo("acme", "widgets");
        assert_eq!(record_id(&repo, "src/main.rs"), "acme/widgets-src_2f_main.rs");
        assert_eq!(record_id(&repo, "README.md"), "acme/widgets-README.md");
        assert_eq!(record_id(&repo, "x-y"), "acme/widgets-x_2d_y");
    }

    #[test]
    fn record_ids_stay_distinct_across_repositories() {
        let widgets = RepositoryId::from_owner_repo("acme", "widgets");
        let widgets_x = RepositoryId::from_owner_repo("acme", "widgets-x");
        assert_ne!(record_id(&widgets, "x-y"), record_id(&widgets_x, "y"));
    }

    #[test]
    fn sanitization_does_not_collide() {
        let paths = ["a/b", "a_b", "a-b", "a b", "a_2f_b", "a/b/", "ä/b"];
        let mut seen = std::collections::HashSet::new();
        for p in paths {
            assert!(seen.insert(sanitize_path(p)), "collision for {p}");
        }
    }

    #[test]
    fn stable_uuid_is_deterministic() {
        assert_eq!(stable_uuid("acme/widgets-x"), stable_uuid("acme/widgets-x"));
        assert_ne!(stable_uuid("acme/widgets-x"), stable_uuid("acme/widgets-y"));
    }
}
