//! Read model of externally owned tasks.

use super::{CheckpointKind, ParseTaskStatusError, TaskId, VerificationDomainError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Countdown length used when a task does not configure its own.
const DEFAULT_TIMEOUT_SECONDS: u32 = 120;

/// Task lifecycle status as seen by the verification engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for the scheduled start.
    Scheduled,
    /// Start checkpoint is open.
    VerifyingStart,
    /// Start proof accepted; work is under way.
    InProgress,
    /// Completion checkpoint is open.
    VerifyingComplete,
    /// Completion proof accepted.
    Completed,
    /// A proof was explicitly rejected.
    Failed,
    /// Cancelled by an external request.
    Cancelled,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::VerifyingStart => "verifying_start",
            Self::InProgress => "in_progress",
            Self::VerifyingComplete => "verifying_complete",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for statuses no transition leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` when the state machine allows moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (from, Self::Cancelled) => !from.is_terminal(),
            (Self::Scheduled, Self::VerifyingStart)
            | (Self::VerifyingStart, Self::InProgress | Self::Failed)
            | (Self::InProgress, Self::VerifyingComplete)
            | (Self::VerifyingComplete, Self::Completed | Self::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "verifying_start" => Ok(Self::VerifyingStart),
            "in_progress" => Ok(Self::InProgress),
            "verifying_complete" => Ok(Self::VerifyingComplete),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// What a photo must show to pass one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRequirement {
    requirement: String,
    timeout_seconds: u32,
    keywords: Vec<String>,
}

impl CheckpointRequirement {
    /// Creates a requirement with the default countdown and no keywords.
    #[must_use]
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            keywords: Vec::new(),
        }
    }

    /// Requirement used when a task leaves the checkpoint unconfigured.
    #[must_use]
    pub fn default_for(kind: CheckpointKind) -> Self {
        match kind {
            CheckpointKind::Start => Self::new("Take a photo showing you have started"),
            CheckpointKind::Completion => Self::new("Take a photo showing the finished task"),
        }
    }

    /// Overrides the countdown length in seconds.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, timeout_seconds: u32) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Sets the explicit keywords a photo must show.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the operator-facing requirement text.
    #[must_use]
    pub fn requirement(&self) -> &str {
        &self.requirement
    }

    /// Returns the countdown length in seconds.
    #[must_use]
    pub const fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }

    /// Returns the countdown length as a duration.
    #[must_use]
    pub fn timeout(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.timeout_seconds))
    }

    /// Returns the explicit keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Snapshot of a task as reported by the task directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    id: TaskId,
    title: String,
    description: String,
    scheduled_start: DateTime<Utc>,
    scheduled_end: DateTime<Utc>,
    duration_minutes: u32,
    status: TaskStatus,
    verification_start: Option<CheckpointRequirement>,
    verification_complete: Option<CheckpointRequirement>,
    gold_earned: u64,
    penalty_gold: u64,
    actual_start: Option<DateTime<Utc>>,
    actual_end: Option<DateTime<Utc>>,
}

impl TaskSnapshot {
    /// Creates a scheduled task whose duration is the length of its window.
    #[must_use]
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        scheduled_start: DateTime<Utc>,
        scheduled_end: DateTime<Utc>,
    ) -> Self {
        let minutes = (scheduled_end - scheduled_start).num_minutes().max(0);
        Self {
            id,
            title: title.into(),
            description: String::new(),
            scheduled_start,
            scheduled_end,
            duration_minutes: u32::try_from(minutes).unwrap_or(u32::MAX),
            status: TaskStatus::Scheduled,
            verification_start: None,
            verification_complete: None,
            gold_earned: 0,
            penalty_gold: 0,
            actual_start: None,
            actual_end: None,
        }
    }

    /// Sets the free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overrides the duration used for reward arithmetic.
    #[must_use]
    pub const fn with_duration_minutes(mut self, duration_minutes: u32) -> Self {
        self.duration_minutes = duration_minutes;
        self
    }

    /// Sets the current status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Configures the requirement for one checkpoint.
    #[must_use]
    pub fn with_requirement(mut self, kind: CheckpointKind, requirement: CheckpointRequirement) -> Self {
        match kind {
            CheckpointKind::Start => self.verification_start = Some(requirement),
            CheckpointKind::Completion => self.verification_complete = Some(requirement),
        }
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the scheduled start.
    #[must_use]
    pub const fn scheduled_start(&self) -> DateTime<Utc> {
        self.scheduled_start
    }

    /// Returns the scheduled end.
    #[must_use]
    pub const fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_end
    }

    /// Returns the duration in minutes.
    #[must_use]
    pub const fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the configured requirement for `kind`, if any.
    #[must_use]
    pub const fn configured_requirement(&self, kind: CheckpointKind) -> Option<&CheckpointRequirement> {
        match kind {
            CheckpointKind::Start => self.verification_start.as_ref(),
            CheckpointKind::Completion => self.verification_complete.as_ref(),
        }
    }

    /// Returns the requirement for `kind`, falling back to the default.
    #[must_use]
    pub fn requirement(&self, kind: CheckpointKind) -> CheckpointRequirement {
        self.configured_requirement(kind)
            .cloned()
            .unwrap_or_else(|| CheckpointRequirement::default_for(kind))
    }

    /// Returns the total gold deposited for this task.
    #[must_use]
    pub const fn gold_earned(&self) -> u64 {
        self.gold_earned
    }

    /// Returns the total gold withdrawn as penalties for this task.
    #[must_use]
    pub const fn penalty_gold(&self) -> u64 {
        self.penalty_gold
    }

    /// Returns when the start proof was accepted, if it was.
    #[must_use]
    pub const fn actual_start(&self) -> Option<DateTime<Utc>> {
        self.actual_start
    }

    /// Returns when the completion proof was accepted, if it was.
    #[must_use]
    pub const fn actual_end(&self) -> Option<DateTime<Utc>> {
        self.actual_end
    }

    /// Applies a status change and the fields that accompany it.
    ///
    /// Re-applying the current status is accepted so that field-only updates
    /// (penalty totals) can use the same path.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationDomainError::InvalidStatusTransition`] when the
    /// state machine forbids the change.
    pub fn apply(
        &mut self,
        status: TaskStatus,
        update: &TaskStatusUpdate,
    ) -> Result<(), VerificationDomainError> {
        if status != self.status && !self.status.can_transition_to(status) {
            return Err(VerificationDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        if let Some(actual_start) = update.actual_start {
            self.actual_start = Some(actual_start);
        }
        if let Some(actual_end) = update.actual_end {
            self.actual_end = Some(actual_end);
        }
        if let Some(gold_earned) = update.gold_earned {
            self.gold_earned = gold_earned;
        }
        if let Some(penalty_gold) = update.penalty_gold {
            self.penalty_gold = penalty_gold;
        }
        Ok(())
    }
}

/// Fields written back to the task directory alongside a status change.
///
/// Gold values are running totals, not increments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStatusUpdate {
    /// Moment the start proof was accepted.
    pub actual_start: Option<DateTime<Utc>>,
    /// Moment the completion proof was accepted.
    pub actual_end: Option<DateTime<Utc>>,
    /// New total of gold earned.
    pub gold_earned: Option<u64>,
    /// New total of penalty gold.
    pub penalty_gold: Option<u64>,
}

impl TaskStatusUpdate {
    /// Records the actual start time.
    #[must_use]
    pub const fn with_actual_start(mut self, at: DateTime<Utc>) -> Self {
        self.actual_start = Some(at);
        self
    }

    /// Records the actual end time.
    #[must_use]
    pub const fn with_actual_end(mut self, at: DateTime<Utc>) -> Self {
        self.actual_end = Some(at);
        self
    }

    /// Records the new gold total.
    #[must_use]
    pub const fn with_gold_earned(mut self, total: u64) -> Self {
        self.gold_earned = Some(total);
        self
    }

    /// Records the new penalty total.
    #[must_use]
    pub const fn with_penalty_gold(mut self, total: u64) -> Self {
        self.penalty_gold = Some(total);
        self
    }
}
