//! Small JSON-on-disk helpers shared by the file store and the file journal.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so a
//! reader never sees a half-written document.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;

/// Root directory for reviewer data (env-overridable).
pub fn data_root() -> PathBuf {
    std::env::var("REVIEWER_DATA_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("code_data/reviewer"))
}

/// Injective, filesystem-safe file stem.
///
/// `[A-Za-z0-9-]` pass through, every other char (including `_` and `.`)
/// becomes `_<hex codepoint>_`, so distinct keys never share a file and no
/// key can name `.` or `..`.
pub fn file_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else {
            out.push_str(&format!("_{:x}_", ch as u32));
        }
    }
    out
}

/// Reads and decodes `path`; a missing file is `Ok(None)`.
pub async fn read_json<T, E>(path: &Path) -> Result<Option<T>, E>
where
    T: DeserializeOwned,
    E: From<io::Error> + From<serde_json::Error>,
{
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn write_json<T, E>(path: &Path, value: &T) -> Result<(), E>
where
    T: Serialize + ?Sized,
    E: From<io::Error> + From<serde_json::Error>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let data = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;

    #[test]
    fn file_key_escapes_unsafe_chars() {
        assert_eq!(file_key("acme/widgets#42"), "acme_2f_widgets_23_42");
        assert_eq!(file_key("fetching-diff"), "fetching-diff");
        assert_eq!(file_key(".."), "_2e__2e_");
    }

    #[test]
    fn file_keys_do_not_collide() {
        let ids = ["evt/1", "evt_1", "evt_2f_1", "evt 1", "evt.1", "evt-1"];
        let mut seen = std::collections::HashSet::new();
        for id in ids {
            assert!(seen.insert(file_key(id)), "collision for {id}");
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_none_and_writes_round_trip() {
        let dir = temp_dir("json-file");
        let path = dir.join("nested").join("doc.json");

        let missing: Option<Vec<u32>> = read_json::<_, StoreError>(&path).await.unwrap();
        assert!(missing.is_none());

        write_json::<_, StoreError>(&path, &vec![1u32, 2, 3]).await.unwrap();
        let back: Option<Vec<u32>> = read_json::<_, StoreError>(&path).await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
        assert!(!path.with_extension("json.tmp").exists());

        let _ = std::fs::remove_dir_all(dir);
    }
}
