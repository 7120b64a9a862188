//! JSON file checkpoint repository.
//!
//! All records live in one `checkpoints.json` document inside a directory
//! opened through `cap-std`. Every save rewrites a temporary file, syncs it
//! and renames it over the document, so readers see either the old or the new
//! contents and never a torn write.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::verification::{
    domain::{CheckpointState, PersistedCheckpoint, TaskId},
    ports::{CheckpointRepository, CheckpointRepositoryError, CheckpointRepositoryResult},
};

const DOCUMENT_NAME: &str = "checkpoints.json";
const TEMPORARY_NAME: &str = "checkpoints.json.tmp";

type Document = BTreeMap<TaskId, PersistedCheckpoint>;

/// Checkpoint repository backed by a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointRepository {
    dir: Arc<Dir>,
    records: Arc<Mutex<Document>>,
}

impl JsonFileCheckpointRepository {
    /// Opens (creating if needed) the directory at `path` and reads any
    /// existing document.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointRepositoryError::Persistence`] when the directory
    /// cannot be opened or read, and [`CheckpointRepositoryError::Corrupt`]
    /// when the document does not decode.
    pub fn open(path: &Utf8Path) -> CheckpointRepositoryResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(CheckpointRepositoryError::persistence)?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(CheckpointRepositoryError::persistence)?;
        let records = read_document(&dir)?;
        debug!(path = %path, records = records.len(), "opened checkpoint document");
        Ok(Self {
            dir: Arc::new(dir),
            records: Arc::new(Mutex::new(records)),
        })
    }

    async fn persist(&self, document: &Document) -> CheckpointRepositoryResult<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(CheckpointRepositoryError::persistence)?;
        let dir = Arc::clone(&self.dir);
        tokio::task::spawn_blocking(move || write_atomically(&dir, &bytes))
            .await
            .map_err(CheckpointRepositoryError::persistence)?
            .map_err(CheckpointRepositoryError::persistence)
    }
}

fn read_document(dir: &Dir) -> CheckpointRepositoryResult<Document> {
    if !dir.exists(DOCUMENT_NAME) {
        return Ok(Document::new());
    }
    let contents = dir
        .read_to_string(DOCUMENT_NAME)
        .map_err(CheckpointRepositoryError::persistence)?;
    let raw: BTreeMap<String, PersistedCheckpoint> =
        serde_json::from_str(&contents).map_err(|err| CheckpointRepositoryError::Corrupt {
            key: DOCUMENT_NAME.to_owned(),
            reason: err.to_string(),
        })?;

    raw.into_iter()
        .map(|(key, record)| {
            let task_id = key
                .parse::<TaskId>()
                .map_err(|err| CheckpointRepositoryError::Corrupt {
                    key: key.clone(),
                    reason: err.to_string(),
                })?;
            CheckpointState::try_from(record).map_err(|err| CheckpointRepositoryError::Corrupt {
                key,
                reason: err.to_string(),
            })?;
            Ok((task_id, record))
        })
        .collect()
}

fn write_atomically(dir: &Dir, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = dir.create(TEMPORARY_NAME)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    dir.rename(TEMPORARY_NAME, dir, DOCUMENT_NAME)
}

#[async_trait]
impl CheckpointRepository for JsonFileCheckpointRepository {
    async fn load_all(&self) -> CheckpointRepositoryResult<HashMap<TaskId, CheckpointState>> {
        let records = self.records.lock().await;
        records
            .iter()
            .map(|(task_id, record)| {
                CheckpointState::try_from(*record)
                    .map(|state| (*task_id, state))
                    .map_err(|err| CheckpointRepositoryError::Corrupt {
                        key: task_id.to_string(),
                        reason: err.to_string(),
                    })
            })
            .collect()
    }

    async fn save(
        &self,
        task_id: TaskId,
        state: &CheckpointState,
    ) -> CheckpointRepositoryResult<()> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.insert(task_id, PersistedCheckpoint::from(state));
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn remove(&self, task_id: TaskId) -> CheckpointRepositoryResult<()> {
        let mut records = self.records.lock().await;
        if !records.contains_key(&task_id) {
            return Ok(());
        }
        let mut next = records.clone();
        next.remove(&task_id);
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }
}
