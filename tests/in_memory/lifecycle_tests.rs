//! Full verification lifecycles driven by poll and tick.

use std::sync::Arc;

use crate::test_helpers::{Stack, start_instant, task_lasting};
use chrono::TimeDelta;
use eyre::ensure;
use proofgate::verification::{
    adapters::memory::{InMemoryCheckpointRepository, LedgerEntryKind},
    domain::{CheckpointKind, CheckpointPhase, TaskStatus},
};
use rstest::{fixture, rstest};

type MemoryStack = Stack<InMemoryCheckpointRepository>;

#[fixture]
fn stack() -> MemoryStack {
    Stack::new(Arc::new(InMemoryCheckpointRepository::new()))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn kitchen_task_earns_both_rewards(stack: MemoryStack) -> eyre::Result<()> {
    let id = stack.add_task(task_lasting("Clean the kitchen", 30));

    stack.manager.poll().await?;
    stack.clock.advance(TimeDelta::seconds(10));
    let start = stack
        .manager
        .submit_proof(id, CheckpointKind::Start, b"sink-photo")
        .await?;
    ensure!(start.success && start.reward == 13);

    stack.clock.set(start_instant() + TimeDelta::minutes(25));
    ensure!(stack.manager.poll().await?.reminded == vec![id]);

    stack.clock.set(start_instant() + TimeDelta::minutes(30));
    ensure!(stack.manager.poll().await?.opened_completion == vec![id]);
    ensure!(
        stack.manager.remaining(id, CheckpointKind::Completion) == Some(29 * 60 + 50)
    );

    stack.clock.advance(TimeDelta::minutes(3));
    let completion = stack
        .manager
        .submit_proof(id, CheckpointKind::Completion, b"stove-photo")
        .await?;
    ensure!(completion.success && completion.reward == 31);
    ensure!(completion.matched_objects == vec!["stove".to_owned(), "pot".to_owned()]);

    ensure!(stack.ledger.balance() == 44);
    ensure!(stack.status(id) == Some(TaskStatus::Completed));
    ensure!(
        stack.notifier.event_names()
            == vec![
                "start-verification-opened",
                "verification-passed",
                "completion-reminder",
                "completion-verification-opened",
                "verification-passed",
            ]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn late_completion_pays_after_penalties(stack: MemoryStack) -> eyre::Result<()> {
    let id = stack.add_task(task_lasting("Clean the kitchen", 30));
    stack.manager.poll().await?;
    stack
        .manager
        .submit_proof(id, CheckpointKind::Start, b"sink-photo")
        .await?;

    stack.clock.set(start_instant() + TimeDelta::minutes(30));
    stack.manager.poll().await?;
    stack.clock.advance(TimeDelta::minutes(30));
    ensure!(stack.manager.tick().await.len() == 1);

    let outcome = stack
        .manager
        .submit_proof(id, CheckpointKind::Completion, b"stove-photo")
        .await?;
    ensure!(outcome.success);
    ensure!(stack.ledger.amounts(LedgerEntryKind::Withdrawal) == vec![13]);
    ensure!(stack.ledger.amounts(LedgerEntryKind::Deposit) == vec![13, 31]);
    ensure!(stack.tasks.task(id).map(|task| task.penalty_gold()) == Some(13));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_are_verified_independently(stack: MemoryStack) -> eyre::Result<()> {
    let kitchen = stack.add_task(task_lasting("Clean the kitchen", 30));
    let reading = stack.add_task(
        task_lasting("Evening reading", 60)
            .with_description("Read one chapter of a book"),
    );

    let report = stack.manager.poll().await?;
    ensure!(report.opened_start.len() == 2);

    stack
        .manager
        .submit_proof(kitchen, CheckpointKind::Start, b"sink-photo")
        .await?;
    stack.clock.advance(TimeDelta::seconds(120));
    let expired = stack.manager.tick().await;

    ensure!(expired.len() == 1);
    ensure!(expired.first().map(|signal| signal.task_id) == Some(reading));
    ensure!(stack.ledger.amounts(LedgerEntryKind::Withdrawal) == vec![45]);
    ensure!(stack.status(kitchen) == Some(TaskStatus::InProgress));
    ensure!(stack.status(reading) == Some(TaskStatus::VerifyingStart));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn restart_mid_countdown_keeps_the_deadline(stack: MemoryStack) -> eyre::Result<()> {
    let id = stack.add_task(task_lasting("Clean the kitchen", 30));
    stack.manager.poll().await?;
    stack.clock.advance(TimeDelta::seconds(45));

    let restarted = stack.restart().await?;
    let report = restarted.manager.poll().await?;
    ensure!(report.resumed == vec![id]);
    ensure!(restarted.manager.remaining(id, CheckpointKind::Start) == Some(75));

    let outcome = restarted
        .manager
        .submit_proof(id, CheckpointKind::Start, b"sink-photo")
        .await?;
    ensure!(outcome.success);
    ensure!(
        restarted.repository.stored(id).map(|state| state.phase())
            == Some(CheckpointPhase::Started)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn runtime_added_synonyms_unlock_new_labels(stack: MemoryStack) -> eyre::Result<()> {
    let id = stack.add_task(task_lasting("Water the balcony", 15));
    stack.classifier.insert_labels(b"railing-photo".to_vec(), ["railing"]);
    stack.manager.matcher().extend_synonyms("balcony", ["railing"]);
    stack.manager.poll().await?;

    let outcome = stack
        .manager
        .submit_proof(id, CheckpointKind::Start, b"railing-photo")
        .await?;

    ensure!(outcome.success);
    ensure!(outcome.matched_keywords == vec!["balcony".to_owned()]);
    Ok(())
}
