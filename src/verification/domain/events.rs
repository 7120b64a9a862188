//! Events and prompts published to the notification collaborator.

use super::{CheckpointKind, CheckpointPhase, TaskId, TaskStatus};
use chrono::{DateTime, Utc};

/// Request to put a proof prompt in front of the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPrompt {
    /// Task awaiting proof.
    pub task_id: TaskId,
    /// Checkpoint awaiting proof.
    pub kind: CheckpointKind,
    /// What the photo must show.
    pub requirement: String,
    /// When the current countdown expires.
    pub deadline: DateTime<Utc>,
}

/// Notable lifecycle event, published for reminders and feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEvent {
    /// A checkpoint countdown was opened.
    CheckpointOpened {
        /// Task concerned.
        task_id: TaskId,
        /// Checkpoint opened.
        kind: CheckpointKind,
        /// When the countdown expires.
        deadline: DateTime<Utc>,
    },
    /// The scheduled end is near.
    CompletionReminder {
        /// Task concerned.
        task_id: TaskId,
        /// Scheduled end of the task.
        scheduled_end: DateTime<Utc>,
    },
    /// A countdown expired and a penalty was applied.
    Timeout {
        /// Task concerned.
        task_id: TaskId,
        /// Checkpoint whose countdown expired.
        kind: CheckpointKind,
        /// Gold withdrawn.
        penalty: u64,
        /// Expiries so far for this checkpoint.
        timeouts: u32,
        /// Deadline of the restarted countdown.
        next_deadline: DateTime<Utc>,
    },
    /// A proof was accepted.
    Passed {
        /// Task concerned.
        task_id: TaskId,
        /// Checkpoint passed.
        kind: CheckpointKind,
        /// Gold deposited.
        reward: u64,
    },
    /// A photo did not match; the countdown keeps running.
    ProofRejected {
        /// Task concerned.
        task_id: TaskId,
        /// Checkpoint still open.
        kind: CheckpointKind,
        /// Human-readable reason.
        reason: String,
    },
    /// A checkpoint was explicitly failed.
    Rejected {
        /// Task concerned.
        task_id: TaskId,
        /// Checkpoint failed.
        kind: CheckpointKind,
        /// Gold withdrawn.
        penalty: u64,
        /// Reason given for the rejection.
        reason: String,
    },
    /// Verification was stopped for a cancelled task.
    Cancelled {
        /// Task concerned.
        task_id: TaskId,
    },
}

impl VerificationEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CheckpointOpened {
                kind: CheckpointKind::Start,
                ..
            } => "start-verification-opened",
            Self::CheckpointOpened {
                kind: CheckpointKind::Completion,
                ..
            } => "completion-verification-opened",
            Self::CompletionReminder { .. } => "completion-reminder",
            Self::Timeout { .. } => "verification-timeout",
            Self::Passed { .. } => "verification-passed",
            Self::ProofRejected { .. } => "proof-rejected",
            Self::Rejected { .. } => "verification-rejected",
            Self::Cancelled { .. } => "verification-cancelled",
        }
    }

    /// Returns the task the event concerns.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::CheckpointOpened { task_id, .. }
            | Self::CompletionReminder { task_id, .. }
            | Self::Timeout { task_id, .. }
            | Self::Passed { task_id, .. }
            | Self::ProofRejected { task_id, .. }
            | Self::Rejected { task_id, .. }
            | Self::Cancelled { task_id } => *task_id,
        }
    }
}

/// Change delivered to state subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// Task concerned.
    pub task_id: TaskId,
    /// Task status after the change.
    pub status: TaskStatus,
    /// Checkpoint phase after the change.
    pub phase: CheckpointPhase,
    /// Active countdown deadline, if any.
    pub deadline: Option<DateTime<Utc>>,
}
