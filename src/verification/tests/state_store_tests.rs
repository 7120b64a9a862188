//! Unit tests for persisted checkpoint state.

use std::sync::Arc;
use std::time::Duration;

use super::support::start_instant;
use crate::verification::adapters::memory::InMemoryCheckpointRepository;
use crate::verification::domain::{
    CheckpointPatch, CheckpointPhase, CheckpointState, TaskId, VerificationDomainError,
};
use crate::verification::ports::CheckpointRepository;
use crate::verification::services::{StateStoreError, VerificationSettings, VerificationStateStore};
use chrono::TimeDelta;
use eyre::{bail, ensure};
use rstest::{fixture, rstest};

#[fixture]
fn repository() -> Arc<InMemoryCheckpointRepository> {
    Arc::new(InMemoryCheckpointRepository::new())
}

fn store_over(
    repository: &Arc<InMemoryCheckpointRepository>,
) -> VerificationStateStore<InMemoryCheckpointRepository> {
    let settings =
        VerificationSettings::default().with_persistence_retries(3, Duration::from_millis(1));
    VerificationStateStore::configured(Arc::clone(repository), &settings)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_task_reads_as_pending(repository: Arc<InMemoryCheckpointRepository>) {
    let store = store_over(&repository);
    let task = TaskId::new();
    assert_eq!(store.get(task), CheckpointState::default());
    assert!(!store.contains(task));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transition_survives_two_failed_writes(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let task = TaskId::new();
    repository.fail_next_saves(2);

    let state = store
        .transition(task, CheckpointPatch::new().with_phase(CheckpointPhase::Started))
        .await?;

    ensure!(state.phase() == CheckpointPhase::Started);
    ensure!(repository.save_attempts() == 3);
    ensure!(repository.stored(task) == Some(state));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_retries_leave_cache_untouched(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let task = TaskId::new();
    repository.fail_next_saves(3);

    let result = store
        .transition(task, CheckpointPatch::new().with_phase(CheckpointPhase::Started))
        .await;

    let Err(StateStoreError::Persistence { attempts, .. }) = result else {
        bail!("expected a persistence failure, got {result:?}");
    };
    ensure!(attempts == 3);
    ensure!(store.get(task).phase() == CheckpointPhase::Pending);
    ensure!(!store.contains(task));
    ensure!(repository.stored(task).is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn regression_is_rejected_before_writing(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let task = TaskId::new();
    store
        .transition(task, CheckpointPatch::new().with_phase(CheckpointPhase::Completed))
        .await?;
    let attempts = repository.save_attempts();

    let result = store
        .transition(task, CheckpointPatch::new().with_phase(CheckpointPhase::Started))
        .await;

    ensure!(matches!(
        result,
        Err(StateStoreError::Domain {
            source: VerificationDomainError::PhaseRegression { .. },
            ..
        })
    ));
    ensure!(repository.save_attempts() == attempts);
    ensure!(store.get(task).phase() == CheckpointPhase::Completed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unchanged_state_is_not_rewritten(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let task = TaskId::new();
    let deadline = start_instant() + TimeDelta::seconds(120);

    store
        .transition(task, CheckpointPatch::new().with_deadline(deadline))
        .await?;
    store
        .transition(task, CheckpointPatch::new().with_deadline(deadline))
        .await?;

    ensure!(repository.save_attempts() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_patch_creates_a_pending_record(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let task = TaskId::new();

    store.transition(task, CheckpointPatch::new()).await?;

    ensure!(store.contains(task));
    ensure!(repository.stored(task) == Some(CheckpointState::default()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reset_forgets_the_task(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let task = TaskId::new();
    store
        .transition(task, CheckpointPatch::new().with_phase(CheckpointPhase::Completed))
        .await?;

    store.reset(task).await?;

    ensure!(!store.contains(task));
    ensure!(store.get(task) == CheckpointState::default());
    ensure!(repository.stored(task).is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn load_restores_what_another_store_wrote(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let task = TaskId::new();
    let written = store_over(&repository)
        .transition(
            task,
            CheckpointPatch::new()
                .with_phase(CheckpointPhase::Started)
                .with_actual_start(start_instant()),
        )
        .await?;

    let restarted = store_over(&repository);
    ensure!(!restarted.contains(task));
    ensure!(restarted.load().await? == 1);
    ensure!(restarted.get(task) == written);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_writers_leave_cache_and_storage_in_step(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = Arc::new(store_over(&repository));
    let task = TaskId::new();

    let writers: Vec<_> = (1..=8_u32)
        .map(|timeouts| {
            let writer = Arc::clone(&store);
            tokio::spawn(async move {
                writer
                    .transition(task, CheckpointPatch::new().with_timeouts(timeouts))
                    .await
            })
        })
        .collect();
    for writer in writers {
        writer.await??;
    }

    let cached = store.get(task);
    ensure!(repository.stored(task) == Some(cached));
    ensure!((1..=8).contains(&cached.timeouts()));
    let reloaded = repository.load_all().await?;
    ensure!(reloaded.get(&task) == Some(&cached));
    ensure!(store.tracked_writers() == 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_penalties_accumulate(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = Arc::new(store_over(&repository));
    let task = TaskId::new();

    let writers: Vec<_> = (0..8)
        .map(|_| {
            let writer = Arc::clone(&store);
            tokio::spawn(async move {
                writer
                    .transition(task, CheckpointPatch::new().owe_penalty(22))
                    .await
            })
        })
        .collect();
    for writer in writers {
        writer.await??;
    }

    ensure!(store.get(task).settlement().penalty_due == 8 * 22);
    ensure!(repository.stored(task) == Some(store.get(task)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn writer_locks_are_released_after_use(
    repository: Arc<InMemoryCheckpointRepository>,
) -> eyre::Result<()> {
    let store = store_over(&repository);
    let tasks: Vec<TaskId> = (0..16).map(|_| TaskId::new()).collect();

    for task in &tasks {
        store
            .transition(*task, CheckpointPatch::new().with_phase(CheckpointPhase::Started))
            .await?;
    }
    ensure!(store.tracked_writers() == 0);

    for task in &tasks {
        store.reset(*task).await?;
    }
    ensure!(store.tracked_writers() == 0);
    ensure!(tasks.iter().all(|task| !store.contains(*task)));

    repository.fail_next_saves(3);
    let failed = store
        .transition(TaskId::new(), CheckpointPatch::new().with_timeouts(1))
        .await;
    ensure!(failed.is_err());
    ensure!(store.tracked_writers() == 0);
    Ok(())
}
