//! Durable checkpoint storage port.

use crate::verification::domain::{CheckpointState, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for checkpoint repository operations.
pub type CheckpointRepositoryResult<T> = Result<T, CheckpointRepositoryError>;

/// Durable store of one checkpoint record per task.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Reads every stored record.
    async fn load_all(&self) -> CheckpointRepositoryResult<HashMap<TaskId, CheckpointState>>;

    /// Stores the record for `task_id`, replacing any previous one.
    ///
    /// Must not return before the record is durable.
    async fn save(&self, task_id: TaskId, state: &CheckpointState) -> CheckpointRepositoryResult<()>;

    /// Deletes the record for `task_id`. Deleting a missing record succeeds.
    async fn remove(&self, task_id: TaskId) -> CheckpointRepositoryResult<()>;
}

/// Errors returned by checkpoint repository implementations.
#[derive(Debug, Clone, Error)]
pub enum CheckpointRepositoryError {
    /// A stored record could not be decoded.
    #[error("corrupt checkpoint record for {key}: {reason}")]
    Corrupt {
        /// Storage key of the record.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CheckpointRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
