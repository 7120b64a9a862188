//! Durable per-task checkpoint state with single-writer updates.

use crate::verification::{
    domain::{CheckpointPatch, CheckpointState, TaskId, VerificationDomainError},
    ports::{CheckpointRepository, CheckpointRepositoryError, CheckpointRepositoryResult},
    services::VerificationSettings,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Errors returned by [`VerificationStateStore`].
#[derive(Debug, Clone, Error)]
pub enum StateStoreError {
    /// The update broke a checkpoint rule.
    #[error("checkpoint update for task {task_id} rejected: {source}")]
    Domain {
        /// Task being updated.
        task_id: TaskId,
        /// Rule violated.
        source: VerificationDomainError,
    },

    /// The change could not be made durable.
    #[error("checkpoint state for task {task_id} not persisted after {attempts} attempts: {source}")]
    Persistence {
        /// Task being updated.
        task_id: TaskId,
        /// Attempts made.
        attempts: u32,
        /// Last repository error.
        source: CheckpointRepositoryError,
    },

    /// Stored records could not be read.
    #[error("failed to load checkpoint state: {0}")]
    Load(#[source] CheckpointRepositoryError),
}

/// Cache of checkpoint records in front of a [`CheckpointRepository`].
///
/// Reads are served from memory. Every change is persisted before it becomes
/// visible, and changes to one task are serialised by a per-task lock while
/// different tasks proceed independently.
pub struct VerificationStateStore<S>
where
    S: CheckpointRepository,
{
    repository: Arc<S>,
    cache: RwLock<HashMap<TaskId, CheckpointState>>,
    writers: StdMutex<HashMap<TaskId, Arc<Mutex<()>>>>,
    attempts: u32,
    retry_delay: Duration,
}

impl<S> VerificationStateStore<S>
where
    S: CheckpointRepository,
{
    /// Creates a store with the default retry policy.
    #[must_use]
    pub fn new(repository: Arc<S>) -> Self {
        Self::configured(repository, &VerificationSettings::default())
    }

    /// Creates a store using the retry policy from `settings`.
    #[must_use]
    pub fn configured(repository: Arc<S>, settings: &VerificationSettings) -> Self {
        Self {
            repository,
            cache: RwLock::new(HashMap::new()),
            writers: StdMutex::new(HashMap::new()),
            attempts: settings.persistence_attempts.max(1),
            retry_delay: settings.persistence_retry_delay,
        }
    }

    /// Replaces the cache with every stored record. Returns the record count.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::Load`] when the repository cannot be read.
    pub async fn load(&self) -> Result<usize, StateStoreError> {
        let records = self
            .repository
            .load_all()
            .await
            .map_err(StateStoreError::Load)?;
        let count = records.len();
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = records;
        debug!(records = count, "checkpoint state loaded");
        Ok(count)
    }

    /// Returns the state of a task, pending when nothing is recorded.
    #[must_use]
    pub fn get(&self, task_id: TaskId) -> CheckpointState {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&task_id)
            .copied()
            .unwrap_or_default()
    }

    /// Returns `true` when a record exists for the task.
    #[must_use]
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&task_id)
    }

    /// Merges `patch` into the task's state and persists the result.
    ///
    /// A patch that changes nothing is not written.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::Domain`] for a phase regression and
    /// [`StateStoreError::Persistence`] when every write attempt fails; the
    /// cached state is unchanged in both cases.
    pub async fn transition(
        &self,
        task_id: TaskId,
        patch: CheckpointPatch,
    ) -> Result<CheckpointState, StateStoreError> {
        let writer = self.writer(task_id);
        let result = {
            let _guard = writer.lock().await;
            self.write(task_id, &patch).await
        };
        self.release_writer(task_id, &writer);
        result
    }

    async fn write(
        &self,
        task_id: TaskId,
        patch: &CheckpointPatch,
    ) -> Result<CheckpointState, StateStoreError> {
        let current = self.get(task_id);
        let next = current
            .merge(patch)
            .map_err(|source| StateStoreError::Domain { task_id, source })?;
        if next == current && self.contains(task_id) {
            return Ok(current);
        }

        self.with_retries(task_id, || self.repository.save(task_id, &next))
            .await?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id, next);
        debug!(%task_id, phase = %next.phase(), "checkpoint state persisted");
        Ok(next)
    }

    /// Deletes the task's record.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::Persistence`] when the deletion cannot be
    /// made durable.
    pub async fn reset(&self, task_id: TaskId) -> Result<(), StateStoreError> {
        let writer = self.writer(task_id);
        let result = {
            let _guard = writer.lock().await;
            self.erase(task_id).await
        };
        self.release_writer(task_id, &writer);
        result
    }

    async fn erase(&self, task_id: TaskId) -> Result<(), StateStoreError> {
        self.with_retries(task_id, || self.repository.remove(task_id))
            .await?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id);
        debug!(%task_id, "checkpoint state reset");
        Ok(())
    }

    fn writer(&self, task_id: TaskId) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(writers.entry(task_id).or_default())
    }

    /// Drops the task's lock once no other writer holds or awaits it.
    fn release_writer(&self, task_id: TaskId, writer: &Arc<Mutex<()>>) {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        let unshared = writers
            .get(&task_id)
            .is_some_and(|held| Arc::ptr_eq(held, writer) && Arc::strong_count(writer) == 2);
        if unshared {
            writers.remove(&task_id);
        }
    }

    /// Per-task locks currently held in the map.
    #[cfg(test)]
    pub(crate) fn tracked_writers(&self) -> usize {
        self.writers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn with_retries<F, Fut>(
        &self,
        task_id: TaskId,
        operation: F,
    ) -> Result<(), StateStoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CheckpointRepositoryResult<()>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= self.attempts => {
                    error!(
                        %task_id,
                        attempts = attempt,
                        error = %source,
                        "checkpoint state not persisted"
                    );
                    return Err(StateStoreError::Persistence {
                        task_id,
                        attempts: attempt,
                        source,
                    });
                }
                Err(source) => {
                    warn!(%task_id, attempt, error = %source, "checkpoint write failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
