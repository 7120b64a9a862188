//! In-memory checkpoint repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::verification::{
    domain::{CheckpointState, TaskId},
    ports::{CheckpointRepository, CheckpointRepositoryError, CheckpointRepositoryResult},
};

/// Thread-safe in-memory checkpoint repository with injectable save failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointRepository {
    state: Arc<RwLock<StoredCheckpoints>>,
}

#[derive(Debug, Default)]
struct StoredCheckpoints {
    records: HashMap<TaskId, CheckpointState>,
    failing_saves: u32,
    save_attempts: u32,
}

impl InMemoryCheckpointRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` saves fail.
    pub fn fail_next_saves(&self, count: u32) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .failing_saves = count;
    }

    /// Returns the stored record for a task.
    #[must_use]
    pub fn stored(&self, task_id: TaskId) -> Option<CheckpointState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(&task_id)
            .copied()
    }

    /// Returns how many saves were attempted, failed ones included.
    #[must_use]
    pub fn save_attempts(&self) -> u32 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .save_attempts
    }
}

fn poisoned(err: &impl std::fmt::Display) -> CheckpointRepositoryError {
    CheckpointRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl CheckpointRepository for InMemoryCheckpointRepository {
    async fn load_all(&self) -> CheckpointRepositoryResult<HashMap<TaskId, CheckpointState>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.records.clone())
    }

    async fn save(
        &self,
        task_id: TaskId,
        checkpoint: &CheckpointState,
    ) -> CheckpointRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        state.save_attempts += 1;
        if state.failing_saves > 0 {
            state.failing_saves -= 1;
            return Err(CheckpointRepositoryError::persistence(std::io::Error::other(
                "injected save failure",
            )));
        }
        state.records.insert(task_id, *checkpoint);
        Ok(())
    }

    async fn remove(&self, task_id: TaskId) -> CheckpointRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        state.records.remove(&task_id);
        Ok(())
    }
}
