//! Error types for verification domain rules and parsing.

use super::{CheckpointPhase, TaskId, TaskStatus};
use thiserror::Error;

/// Errors raised when a domain rule is violated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationDomainError {
    /// A checkpoint update would move its phase backwards.
    #[error("checkpoint phase cannot move from {from} back to {to}")]
    PhaseRegression {
        /// Phase currently recorded.
        from: CheckpointPhase,
        /// Phase the update asked for.
        to: CheckpointPhase,
    },

    /// A persisted epoch-millisecond value is outside the representable range.
    #[error("timestamp {0} ms is out of range")]
    InvalidTimestamp(i64),

    /// The task state machine does not permit the requested status change.
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Task being updated.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
}

/// Error returned while parsing task statuses from storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing checkpoint kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown checkpoint kind: {0}")]
pub struct ParseCheckpointKindError(pub String);

/// Error returned while parsing checkpoint phases from storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown checkpoint phase: {0}")]
pub struct ParseCheckpointPhaseError(pub String);
