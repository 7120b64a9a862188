//! Shared world state for proof lifecycle BDD scenarios.

use std::sync::Arc;

use crate::test_helpers::Stack;
use proofgate::verification::{
    adapters::memory::InMemoryCheckpointRepository,
    domain::{CheckpointKind, TaskSnapshot},
    services::{PollReport, ProofOutcome},
};
use rstest::fixture;

/// Scenario world for proof lifecycle behaviour tests.
pub struct ProofWorld {
    pub stack: Stack<InMemoryCheckpointRepository>,
    pub task: Option<TaskSnapshot>,
    pub last_poll: Option<PollReport>,
    pub last_outcome: Option<ProofOutcome>,
}

impl ProofWorld {
    /// Creates a world with a fresh engine and no task.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Stack::new(Arc::new(InMemoryCheckpointRepository::new())),
            task: None,
            last_poll: None,
            last_outcome: None,
        }
    }

    /// Returns the scenario's task.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was declared.
    pub fn task(&self) -> Result<&TaskSnapshot, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Returns the outcome of the last proof submission.
    ///
    /// # Errors
    ///
    /// Returns an error when nothing was submitted.
    pub fn last_outcome(&self) -> Result<&ProofOutcome, eyre::Report> {
        self.last_outcome
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no proof was submitted in this scenario"))
    }
}

impl Default for ProofWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ProofWorld {
    ProofWorld::default()
}

/// Parses a checkpoint name used in step text.
///
/// # Errors
///
/// Returns an error for names other than `start` and `completion`.
pub fn checkpoint(name: &str) -> Result<CheckpointKind, eyre::Report> {
    match name {
        "start" => Ok(CheckpointKind::Start),
        "completion" => Ok(CheckpointKind::Completion),
        other => Err(eyre::eyre!("unknown checkpoint in scenario: {other}")),
    }
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
