//! Committed-step journal keyed by (instance id, step name).
//!
//! An instance is registered with its trigger event before it runs, each step
//! output is committed as JSON once the step succeeds, and the instance is
//! marked finished at the end. Unfinished instances are what
//! [`StepJournal::pending`] returns after a restart.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::JournalError;
use crate::json_file::{file_key, read_json, write_json};
use crate::model::TriggerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub event: TriggerEvent,
    pub created_at: DateTime<Utc>,
    pub finished: Option<InstanceStatus>,
}

impl InstanceRecord {
    pub fn new(id: impl Into<String>, event: TriggerEvent) -> Self {
        Self {
            id: id.into(),
            event,
            created_at: Utc::now(),
            finished: None,
        }
    }
}

pub trait StepJournal: Send + Sync {
    /// Records a new instance and returns what the journal holds for its id.
    ///
    /// Registering an existing id keeps (and returns) the stored record.
    fn register<'a>(
        &'a self,
        instance: &'a InstanceRecord,
    ) -> BoxFuture<'a, Result<InstanceRecord, JournalError>>;

    /// Unfinished instances, oldest first.
    fn pending<'a>(&'a self) -> BoxFuture<'a, Result<Vec<InstanceRecord>, JournalError>>;

    fn load_step<'a>(
        &'a self,
        instance_id: &'a str,
        step: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, JournalError>>;

    fn commit_step<'a>(
        &'a self,
        instance_id: &'a str,
        step: &'a str,
        output: &'a Value,
    ) -> BoxFuture<'a, Result<(), JournalError>>;

    fn finish<'a>(
        &'a self,
        instance_id: &'a str,
        status: InstanceStatus,
    ) -> BoxFuture<'a, Result<(), JournalError>>;
}

/* ------------------------------------------------------------------------- */
/* In-memory journal                                                         */
/* ------------------------------------------------------------------------- */

#[derive(Default)]
struct Entry {
    record: Option<InstanceRecord>,
    steps: HashMap<String, Value>,
}

/// Journal that lives as long as the process.
#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn instance(&self, id: &str) -> Option<InstanceRecord> {
        self.entries.lock().await.get(id).and_then(|e| e.record.clone())
    }

    pub async fn committed_steps(&self, id: &str) -> Vec<String> {
        let entries = self.entries.lock().await;
        let mut steps: Vec<String> = entries
            .get(id)
            .map(|e| e.steps.keys().cloned().collect())
            .unwrap_or_default();
        steps.sort();
        steps
    }
}

impl StepJournal for MemoryJournal {
    fn register<'a>(
        &'a self,
        instance: &'a InstanceRecord,
    ) -> BoxFuture<'a, Result<InstanceRecord, JournalError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(instance.id.clone()).or_default();
            Ok(entry.record.get_or_insert_with(|| instance.clone()).clone())
        })
    }

    fn pending<'a>(&'a self) -> BoxFuture<'a, Result<Vec<InstanceRecord>, JournalError>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            let mut out: Vec<InstanceRecord> = entries
                .values()
                .filter_map(|e| e.record.clone())
                .filter(|r| r.finished.is_none())
                .collect();
            out.sort_by_key(|r| r.created_at);
            Ok(out)
        })
    }

    fn load_step<'a>(
        &'a self,
        instance_id: &'a str,
        step: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, JournalError>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries.get(instance_id).and_then(|e| e.steps.get(step).cloned()))
        })
    }

    fn commit_step<'a>(
        &'a self,
        instance_id: &'a str,
        step: &'a str,
        output: &'a Value,
    ) -> BoxFuture<'a, Result<(), JournalError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            entries
                .entry(instance_id.to_string())
                .or_default()
                .steps
                .insert(step.to_string(), output.clone());
            Ok(())
        })
    }

    fn finish<'a>(
        &'a self,
        instance_id: &'a str,
        status: InstanceStatus,
    ) -> BoxFuture<'a, Result<(), JournalError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            match entries.get_mut(instance_id).and_then(|e| e.record.as_mut()) {
                Some(record) => {
                    record.finished = Some(status);
                    Ok(())
                }
                None => Err(JournalError::UnknownInstance(instance_id.to_string())),
            }
        })
    }
}

/* ------------------------------------------------------------------------- */
/* File journal                                                              */
/* ------------------------------------------------------------------------- */

/// Journal on disk.
///
/// Layout: `<root>/<instance>/instance.json` and `<root>/<instance>/steps/<step>.json`.
pub struct FileJournal {
    root: PathBuf,
}

impl FileJournal {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn instance_dir(&self, id: &str) -> PathBuf {
        self.root.join(file_key(id))
    }

    fn instance_path(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join("instance.json")
    }

    fn step_path(&self, id: &str, step: &str) -> PathBuf {
        self.instance_dir(id)
            .join("steps")
            .join(format!("{}.json", file_key(step)))
    }
}

impl StepJournal for FileJournal {
    fn register<'a>(
        &'a self,
        instance: &'a InstanceRecord,
    ) -> BoxFuture<'a, Result<InstanceRecord, JournalError>> {
        Box::pin(async move {
            let path = self.instance_path(&instance.id);
            if let Some(stored) = read_json::<InstanceRecord, JournalError>(&path).await? {
                debug!(instance = %instance.id, "instance already journaled");
                return Ok(stored);
            }
            write_json::<_, JournalError>(&path, instance).await?;
            Ok(instance.clone())
        })
    }

    fn pending<'a>(&'a self) -> BoxFuture<'a, Result<Vec<InstanceRecord>, JournalError>> {
        Box::pin(async move {
            let mut dir = match fs::read_dir(&self.root).await {
                Ok(dir) => dir,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut out = Vec::new();
            while let Some(entry) = dir.next_entry().await? {
                let path = entry.path().join("instance.json");
                match read_json::<InstanceRecord, JournalError>(&path).await {
                    Ok(Some(record)) if record.finished.is_none() => out.push(record),
                    Ok(_) => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable instance"),
                }
            }
            out.sort_by_key(|r| r.created_at);
            Ok(out)
        })
    }

    fn load_step<'a>(
        &'a self,
        instance_id: &'a str,
        step: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, JournalError>> {
        Box::pin(async move { read_json(&self.step_path(instance_id, step)).await })
    }

    fn commit_step<'a>(
        &'a self,
        instance_id: &'a str,
        step: &'a str,
        output: &'a Value,
    ) -> BoxFuture<'a, Result<(), JournalError>> {
        Box::pin(async move {
            write_json::<_, JournalError>(&self.step_path(instance_id, step), output).await
        })
    }

    fn finish<'a>(
        &'a self,
        instance_id: &'a str,
        status: InstanceStatus,
    ) -> BoxFuture<'a, Result<(), JournalError>> {
        Box::pin(async move {
            let path = self.instance_path(instance_id);
            let mut record: InstanceRecord = read_json::<_, JournalError>(&path)
                .await?
                .ok_or_else(|| JournalError::UnknownInstance(instance_id.to_string()))?;
            record.finished = Some(status);
            write_json::<_, JournalError>(&path, &record).await
        })
    }
}
