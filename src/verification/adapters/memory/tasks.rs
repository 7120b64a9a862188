//! In-memory task directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::verification::{
    domain::{TaskId, TaskSnapshot, TaskStatus, TaskStatusUpdate},
    ports::{TaskDirectory, TaskDirectoryError, TaskDirectoryResult},
};

/// Thread-safe in-memory task directory with injectable update failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskDirectory {
    tasks: Arc<RwLock<HashMap<TaskId, TaskSnapshot>>>,
    failing_updates: Arc<RwLock<u32>>,
}

impl InMemoryTaskDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a task.
    pub fn insert(&self, task: TaskSnapshot) {
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.id(), task);
    }

    /// Deletes a task, returning it when present.
    pub fn remove(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Makes the next `count` status updates fail without changing anything.
    pub fn fail_next_updates(&self, count: u32) {
        *self
            .failing_updates
            .write()
            .unwrap_or_else(PoisonError::into_inner) = count;
    }

    /// Returns a copy of a task.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

fn poisoned(err: &impl std::fmt::Display) -> TaskDirectoryError {
    TaskDirectoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskDirectory for InMemoryTaskDirectory {
    async fn get_task(&self, id: TaskId) -> TaskDirectoryResult<Option<TaskSnapshot>> {
        let tasks = self.tasks.read().map_err(|err| poisoned(&err))?;
        Ok(tasks.get(&id).cloned())
    }

    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        update: TaskStatusUpdate,
    ) -> TaskDirectoryResult<()> {
        {
            let mut failing = self.failing_updates.write().map_err(|err| poisoned(&err))?;
            if *failing > 0 {
                *failing -= 1;
                return Err(TaskDirectoryError::persistence(std::io::Error::other(
                    "injected update failure",
                )));
            }
        }
        let mut tasks = self.tasks.write().map_err(|err| poisoned(&err))?;
        let task = tasks.get_mut(&id).ok_or(TaskDirectoryError::NotFound(id))?;
        task.apply(status, &update)?;
        Ok(())
    }

    async fn list_active_tasks(&self) -> TaskDirectoryResult<Vec<TaskSnapshot>> {
        let tasks = self.tasks.read().map_err(|err| poisoned(&err))?;
        let mut active: Vec<TaskSnapshot> = tasks
            .values()
            .filter(|task| !task.status().is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(TaskSnapshot::scheduled_start);
        Ok(active)
    }
}
