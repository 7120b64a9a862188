//! Gold rewards and penalties derived from a task's duration.

use super::CheckpointKind;

/// Rewards and penalties for one task.
///
/// All values are floored; the two rewards may sum to less than the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSchedule {
    base: u64,
}

impl RewardSchedule {
    /// Builds the schedule for a task lasting `duration_minutes`.
    #[must_use]
    pub fn for_duration(duration_minutes: u32) -> Self {
        Self {
            base: percent_of(u64::from(duration_minutes), 150),
        }
    }

    /// Full value of the task, `floor(duration * 1.5)`.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Gold deposited when the checkpoint of `kind` is passed.
    #[must_use]
    pub fn reward_for(&self, kind: CheckpointKind) -> u64 {
        match kind {
            CheckpointKind::Start => percent_of(self.base, 30),
            CheckpointKind::Completion => percent_of(self.base, 70),
        }
    }

    /// Gold withdrawn each time the countdown of `kind` expires.
    #[must_use]
    pub fn penalty_for(&self, kind: CheckpointKind) -> u64 {
        match kind {
            CheckpointKind::Start => percent_of(self.base, 50),
            CheckpointKind::Completion => percent_of(self.base, 30),
        }
    }
}

fn percent_of(value: u64, percent: u64) -> u64 {
    value.saturating_mul(percent).div_euclid(100)
}
