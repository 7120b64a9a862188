//! Tests for the tokio runtime that drives the manager.

use std::sync::Arc;
use std::time::Duration;

use crate::test_helpers::{Stack, task_lasting};
use eyre::{bail, ensure};
use proofgate::verification::{
    adapters::memory::InMemoryCheckpointRepository,
    domain::{CheckpointKind, TaskId, TaskStatus},
    services::{VerificationError, VerificationRuntime},
};
use tokio_util::sync::CancellationToken;

type MemoryStack = Stack<InMemoryCheckpointRepository>;

async fn wait_for_status(
    stack: &MemoryStack,
    id: TaskId,
    expected: TaskStatus,
) -> eyre::Result<()> {
    for _ in 0..200 {
        if stack.status(id) == Some(expected) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    bail!("task never reached {expected}, last seen {:?}", stack.status(id))
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_opens_checkpoints_and_evaluates_submissions() -> eyre::Result<()> {
    let stack = Stack::new(Arc::new(InMemoryCheckpointRepository::new()));
    let id = stack.add_task(task_lasting("Clean the kitchen", 30));
    let shutdown = CancellationToken::new();
    let (runtime, submitter) = VerificationRuntime::new(Arc::clone(&stack.manager), shutdown.clone());
    let running = tokio::spawn(runtime.run());

    wait_for_status(&stack, id, TaskStatus::VerifyingStart).await?;
    let outcome = submitter
        .submit(id, CheckpointKind::Start, b"sink-photo".to_vec())
        .await?;
    ensure!(outcome.success);
    ensure!(stack.status(id) == Some(TaskStatus::InProgress));

    shutdown.cancel();
    running.await??;

    let after = submitter
        .submit(id, CheckpointKind::Completion, b"stove-photo".to_vec())
        .await;
    ensure!(matches!(after, Err(VerificationError::RuntimeStopped)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_stops_when_every_submitter_is_dropped() -> eyre::Result<()> {
    let stack = Stack::new(Arc::new(InMemoryCheckpointRepository::new()));
    let (runtime, submitter) =
        VerificationRuntime::new(Arc::clone(&stack.manager), CancellationToken::new());
    let running = tokio::spawn(runtime.run());

    drop(submitter);
    tokio::time::timeout(Duration::from_secs(5), running).await???;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_runtime_stops_immediately() -> eyre::Result<()> {
    let stack = Stack::new(Arc::new(InMemoryCheckpointRepository::new()));
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let (runtime, _submitter) = VerificationRuntime::new(Arc::clone(&stack.manager), shutdown);

    let result = runtime.run().await;
    ensure!(result.is_ok(), "cancelled runtime should stop cleanly: {result:?}");
    Ok(())
}
