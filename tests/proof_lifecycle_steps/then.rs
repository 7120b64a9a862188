//! Then steps for proof lifecycle BDD scenarios.

use super::world::ProofWorld;
use proofgate::verification::{
    adapters::memory::LedgerEntryKind, domain::TaskStatus, services::ProofFailure,
};
use rstest_bdd_macros::then;

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &ProofWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let actual = world.stack.status(world.task()?.id());
    if actual != Some(expected) {
        return Err(eyre::eyre!("expected status {expected}, found {actual:?}"));
    }
    Ok(())
}

#[then("the proof is accepted with a reward of {reward:u64} gold")]
fn proof_accepted(world: &ProofWorld, reward: u64) -> Result<(), eyre::Report> {
    let outcome = world.last_outcome()?;
    if !outcome.success {
        return Err(eyre::eyre!("proof was rejected: {}", outcome.reason));
    }
    if outcome.reward != reward {
        return Err(eyre::eyre!("expected reward {reward}, got {}", outcome.reward));
    }
    Ok(())
}

#[then("the proof is rejected")]
fn proof_rejected(world: &ProofWorld) -> Result<(), eyre::Report> {
    let outcome = world.last_outcome()?;
    if outcome.success || outcome.failure != Some(ProofFailure::NoMatch) {
        return Err(eyre::eyre!("expected a mismatch, got {outcome:?}"));
    }
    Ok(())
}

#[then(r#"the suggestions mention "{label}""#)]
fn suggestions_mention(world: &ProofWorld, label: String) -> Result<(), eyre::Report> {
    let outcome = world.last_outcome()?;
    let mentioned = outcome
        .suggestions
        .iter()
        .any(|suggestion| suggestion.candidates.contains(&label));
    if !mentioned {
        return Err(eyre::eyre!(
            "no suggestion lists {label}: {:?}",
            outcome.suggestions
        ));
    }
    Ok(())
}

#[then("the ledger balance is {amount:i64} gold")]
fn ledger_balance(world: &ProofWorld, amount: i64) -> Result<(), eyre::Report> {
    let balance = world.stack.ledger.balance();
    if balance != i128::from(amount) {
        return Err(eyre::eyre!("expected balance {amount}, found {balance}"));
    }
    Ok(())
}

#[then("{count:usize} penalties of {amount:u64} gold have been withdrawn")]
fn penalties_withdrawn(world: &ProofWorld, count: usize, amount: u64) -> Result<(), eyre::Report> {
    let withdrawals = world.stack.ledger.amounts(LedgerEntryKind::Withdrawal);
    if withdrawals != vec![amount; count] {
        return Err(eyre::eyre!(
            "expected {count} withdrawals of {amount}, found {withdrawals:?}"
        ));
    }
    Ok(())
}

#[then("the classifier was not called")]
fn classifier_not_called(world: &ProofWorld) -> Result<(), eyre::Report> {
    let classifier = &world.stack.classifier;
    if classifier.authentication_count() != 0 || classifier.classification_count() != 0 {
        return Err(eyre::eyre!("the classification service was contacted"));
    }
    Ok(())
}

#[then("no checkpoint was opened")]
fn no_checkpoint_opened(world: &ProofWorld) -> Result<(), eyre::Report> {
    let report = world
        .last_poll
        .as_ref()
        .ok_or_else(|| eyre::eyre!("the engine has not polled"))?;
    if !report.opened_start.is_empty() || !report.opened_completion.is_empty() {
        return Err(eyre::eyre!("unexpected checkpoint opened: {report:?}"));
    }
    Ok(())
}
