//! Task directory port.

use crate::verification::domain::{
    TaskId, TaskSnapshot, TaskStatus, TaskStatusUpdate, VerificationDomainError,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task directory operations.
pub type TaskDirectoryResult<T> = Result<T, TaskDirectoryError>;

/// Access to the externally owned task records.
#[async_trait]
pub trait TaskDirectory: Send + Sync {
    /// Fetches a task.
    ///
    /// Returns `None` when the task does not exist.
    async fn get_task(&self, id: TaskId) -> TaskDirectoryResult<Option<TaskSnapshot>>;

    /// Changes a task's status and writes the accompanying fields.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDirectoryError::NotFound`] when the task does not exist
    /// or [`TaskDirectoryError::Rejected`] when the change is not allowed.
    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        update: TaskStatusUpdate,
    ) -> TaskDirectoryResult<()>;

    /// Lists tasks whose status is not terminal.
    async fn list_active_tasks(&self) -> TaskDirectoryResult<Vec<TaskSnapshot>>;
}

/// Errors returned by task directory implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskDirectoryError {
    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The directory refused the update.
    #[error(transparent)]
    Rejected(#[from] VerificationDomainError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskDirectoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
