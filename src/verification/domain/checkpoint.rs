//! Checkpoint kinds, phases and the durable per-task checkpoint record.

use super::{
    ParseCheckpointKindError, ParseCheckpointPhaseError, TaskStatus, VerificationDomainError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two proof gates every task passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckpointKind {
    /// Proof that work has begun.
    #[serde(rename = "start")]
    Start,
    /// Proof that work is finished.
    #[serde(rename = "complete")]
    Completion,
}

impl CheckpointKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Completion => "complete",
        }
    }

    /// Task status while this checkpoint is open.
    #[must_use]
    pub const fn awaiting_status(self) -> TaskStatus {
        match self {
            Self::Start => TaskStatus::VerifyingStart,
            Self::Completion => TaskStatus::VerifyingComplete,
        }
    }

    /// Task status once this checkpoint is passed.
    #[must_use]
    pub const fn passed_status(self) -> TaskStatus {
        match self {
            Self::Start => TaskStatus::InProgress,
            Self::Completion => TaskStatus::Completed,
        }
    }

    /// Checkpoint phase recorded while this checkpoint is unresolved.
    #[must_use]
    pub const fn open_phase(self) -> CheckpointPhase {
        match self {
            Self::Start => CheckpointPhase::Pending,
            Self::Completion => CheckpointPhase::Started,
        }
    }

    /// Checkpoint phase recorded once this checkpoint is passed.
    #[must_use]
    pub const fn passed_phase(self) -> CheckpointPhase {
        match self {
            Self::Start => CheckpointPhase::Started,
            Self::Completion => CheckpointPhase::Completed,
        }
    }
}

impl fmt::Display for CheckpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CheckpointKind {
    type Error = ParseCheckpointKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "complete" | "completion" => Ok(Self::Completion),
            _ => Err(ParseCheckpointKindError(value.to_owned())),
        }
    }
}

/// Progress of a task through its checkpoints. Only ever moves forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPhase {
    /// Start proof not yet accepted.
    #[default]
    Pending,
    /// Start proof accepted.
    Started,
    /// Completion proof accepted.
    Completed,
}

impl CheckpointPhase {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CheckpointPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CheckpointPhase {
    type Error = ParseCheckpointPhaseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseCheckpointPhaseError(value.to_owned())),
        }
    }
}

/// Ledger and task-directory effects that were decided but have not landed.
///
/// Amounts move from "due" to "unrecorded" once the ledger accepts them, and
/// are cleared once the task directory has added them to the task's totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Gold still to be deposited.
    pub reward_due: u64,
    /// Gold still to be withdrawn.
    pub penalty_due: u64,
    /// Deposited gold not yet added to the task's earned total.
    pub earned_unrecorded: u64,
    /// Withdrawn gold not yet added to the task's penalty total.
    pub penalty_unrecorded: u64,
    /// Status the task directory has yet to record.
    pub status: Option<TaskStatus>,
    /// When that status was reached.
    pub status_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// Returns `true` when nothing is outstanding.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.reward_due == 0 && self.penalty_due == 0 && !self.has_unrecorded()
    }

    /// Returns `true` when the task directory is behind.
    #[must_use]
    pub const fn has_unrecorded(&self) -> bool {
        self.earned_unrecorded > 0 || self.penalty_unrecorded > 0 || self.status.is_some()
    }

    const fn apply(self, delta: &SettlementDelta) -> Self {
        let (status, status_at) = match delta.status {
            PendingStatusUpdate::Keep => (self.status, self.status_at),
            PendingStatusUpdate::Set(status, at) => (Some(status), Some(at)),
            PendingStatusUpdate::Clear => (None, None),
        };
        Self {
            reward_due: self
                .reward_due
                .saturating_add(delta.owed_reward)
                .saturating_sub(delta.paid_reward),
            penalty_due: self
                .penalty_due
                .saturating_add(delta.owed_penalty)
                .saturating_sub(delta.paid_penalty),
            earned_unrecorded: self
                .earned_unrecorded
                .saturating_add(delta.paid_reward)
                .saturating_sub(delta.recorded_earned),
            penalty_unrecorded: self
                .penalty_unrecorded
                .saturating_add(delta.paid_penalty)
                .saturating_sub(delta.recorded_penalty),
            status,
            status_at,
        }
    }
}

/// Durable checkpoint progress of one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointState {
    phase: CheckpointPhase,
    deadline: Option<DateTime<Utc>>,
    actual_start: Option<DateTime<Utc>>,
    timeouts: u32,
    settlement: Settlement,
}

impl CheckpointState {
    /// Returns the recorded phase.
    #[must_use]
    pub const fn phase(&self) -> CheckpointPhase {
        self.phase
    }

    /// Returns when the active countdown expires, if one is running.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns when the start proof was accepted.
    #[must_use]
    pub const fn actual_start(&self) -> Option<DateTime<Utc>> {
        self.actual_start
    }

    /// Returns the countdown expiries recorded for the open checkpoint.
    #[must_use]
    pub const fn timeouts(&self) -> u32 {
        self.timeouts
    }

    /// Returns the effects still owed to the ledger and task directory.
    #[must_use]
    pub const fn settlement(&self) -> Settlement {
        self.settlement
    }

    /// Returns `true` when the checkpoint of `kind` has been passed.
    #[must_use]
    pub fn has_passed(&self, kind: CheckpointKind) -> bool {
        self.phase >= kind.passed_phase()
    }

    /// Returns the state produced by applying `patch`.
    ///
    /// Advancing the phase clears the timeout counter unless the patch sets
    /// one. The actual start time is write-once.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationDomainError::PhaseRegression`] when the patch
    /// would move the phase backwards.
    pub fn merge(&self, patch: &CheckpointPatch) -> Result<Self, VerificationDomainError> {
        let phase = patch.phase.unwrap_or(self.phase);
        if phase < self.phase {
            return Err(VerificationDomainError::PhaseRegression {
                from: self.phase,
                to: phase,
            });
        }

        let carried_timeouts = if phase > self.phase { 0 } else { self.timeouts };
        let deadline = match patch.deadline {
            DeadlineUpdate::Keep => self.deadline,
            DeadlineUpdate::Set(at) => Some(at),
            DeadlineUpdate::Clear => None,
        };

        Ok(Self {
            phase,
            deadline,
            actual_start: self.actual_start.or(patch.actual_start),
            timeouts: patch.timeouts.unwrap_or(carried_timeouts),
            settlement: self.settlement.apply(&patch.settlement),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PendingStatusUpdate {
    #[default]
    Keep,
    Set(TaskStatus, DateTime<Utc>),
    Clear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SettlementDelta {
    owed_reward: u64,
    owed_penalty: u64,
    paid_reward: u64,
    paid_penalty: u64,
    recorded_earned: u64,
    recorded_penalty: u64,
    status: PendingStatusUpdate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DeadlineUpdate {
    #[default]
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

/// Partial update of a [`CheckpointState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointPatch {
    phase: Option<CheckpointPhase>,
    deadline: DeadlineUpdate,
    actual_start: Option<DateTime<Utc>>,
    timeouts: Option<u32>,
    settlement: SettlementDelta,
}

impl CheckpointPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the phase to `phase`.
    #[must_use]
    pub const fn with_phase(mut self, phase: CheckpointPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Sets the countdown deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = DeadlineUpdate::Set(deadline);
        self
    }

    /// Removes the countdown deadline.
    #[must_use]
    pub const fn clear_deadline(mut self) -> Self {
        self.deadline = DeadlineUpdate::Clear;
        self
    }

    /// Records the actual start time.
    #[must_use]
    pub const fn with_actual_start(mut self, actual_start: DateTime<Utc>) -> Self {
        self.actual_start = Some(actual_start);
        self
    }

    /// Sets the timeout counter.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: u32) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Adds `amount` to the reward still to be deposited.
    #[must_use]
    pub const fn owe_reward(mut self, amount: u64) -> Self {
        self.settlement.owed_reward = amount;
        self
    }

    /// Adds `amount` to the penalty still to be withdrawn.
    #[must_use]
    pub const fn owe_penalty(mut self, amount: u64) -> Self {
        self.settlement.owed_penalty = amount;
        self
    }

    /// Records that the ledger accepted a deposit of `amount`.
    #[must_use]
    pub const fn reward_paid(mut self, amount: u64) -> Self {
        self.settlement.paid_reward = amount;
        self
    }

    /// Records that the ledger accepted a withdrawal of `amount`.
    #[must_use]
    pub const fn penalty_paid(mut self, amount: u64) -> Self {
        self.settlement.paid_penalty = amount;
        self
    }

    /// Records a status the task directory still has to store.
    #[must_use]
    pub const fn with_pending_status(mut self, status: TaskStatus, at: DateTime<Utc>) -> Self {
        self.settlement.status = PendingStatusUpdate::Set(status, at);
        self
    }

    /// Records that the task directory stored the given totals and any
    /// pending status.
    #[must_use]
    pub const fn directory_updated(mut self, earned: u64, penalty: u64) -> Self {
        self.settlement.recorded_earned = earned;
        self.settlement.recorded_penalty = penalty;
        self.settlement.status = PendingStatusUpdate::Clear;
        self
    }
}

/// Storage form of a [`CheckpointState`], with times as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCheckpoint {
    /// Recorded phase.
    pub phase: CheckpointPhase,
    /// Countdown deadline in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_epoch_ms: Option<i64>,
    /// Actual start in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_epoch_ms: Option<i64>,
    /// Countdown expiries for the open checkpoint.
    #[serde(default)]
    pub timeouts: u32,
    /// Outstanding ledger and directory effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<PersistedSettlement>,
}

/// Storage form of a [`Settlement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettlement {
    /// Gold still to be deposited.
    #[serde(default)]
    pub reward_due: u64,
    /// Gold still to be withdrawn.
    #[serde(default)]
    pub penalty_due: u64,
    /// Deposited gold missing from the task's totals.
    #[serde(default)]
    pub earned_unrecorded: u64,
    /// Withdrawn gold missing from the task's totals.
    #[serde(default)]
    pub penalty_unrecorded: u64,
    /// Status the task directory has yet to record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// When that status was reached, in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_epoch_ms: Option<i64>,
}

impl From<Settlement> for PersistedSettlement {
    fn from(settlement: Settlement) -> Self {
        Self {
            reward_due: settlement.reward_due,
            penalty_due: settlement.penalty_due,
            earned_unrecorded: settlement.earned_unrecorded,
            penalty_unrecorded: settlement.penalty_unrecorded,
            status: settlement.status,
            status_epoch_ms: settlement.status_at.map(|at| at.timestamp_millis()),
        }
    }
}

impl TryFrom<PersistedSettlement> for Settlement {
    type Error = VerificationDomainError;

    fn try_from(persisted: PersistedSettlement) -> Result<Self, Self::Error> {
        Ok(Self {
            reward_due: persisted.reward_due,
            penalty_due: persisted.penalty_due,
            earned_unrecorded: persisted.earned_unrecorded,
            penalty_unrecorded: persisted.penalty_unrecorded,
            status: persisted.status,
            status_at: persisted.status_epoch_ms.map(from_epoch_ms).transpose()?,
        })
    }
}

impl From<&CheckpointState> for PersistedCheckpoint {
    fn from(state: &CheckpointState) -> Self {
        Self {
            phase: state.phase,
            deadline_epoch_ms: state.deadline.map(|at| at.timestamp_millis()),
            actual_start_epoch_ms: state.actual_start.map(|at| at.timestamp_millis()),
            timeouts: state.timeouts,
            settlement: (!state.settlement.is_settled())
                .then(|| PersistedSettlement::from(state.settlement)),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for CheckpointState {
    type Error = VerificationDomainError;

    fn try_from(persisted: PersistedCheckpoint) -> Result<Self, Self::Error> {
        Ok(Self {
            phase: persisted.phase,
            deadline: persisted.deadline_epoch_ms.map(from_epoch_ms).transpose()?,
            actual_start: persisted
                .actual_start_epoch_ms
                .map(from_epoch_ms)
                .transpose()?,
            timeouts: persisted.timeouts,
            settlement: persisted
                .settlement
                .map(Settlement::try_from)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

fn from_epoch_ms(millis: i64) -> Result<DateTime<Utc>, VerificationDomainError> {
    DateTime::from_timestamp_millis(millis).ok_or(VerificationDomainError::InvalidTimestamp(millis))
}
