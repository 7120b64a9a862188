//! Countdown arithmetic for open checkpoints.

use crate::verification::domain::{CheckpointKind, TaskId};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// Signal raised once per expired countdown cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownExpired {
    /// Task whose countdown expired.
    pub task_id: TaskId,
    /// Checkpoint whose countdown expired.
    pub kind: CheckpointKind,
    /// Cycles completed so far, counting this one.
    pub cycle: u32,
    /// Deadline of the restarted countdown.
    pub next_deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    initial: TimeDelta,
    deadline: DateTime<Utc>,
    cycle: u32,
}

/// Set of running countdowns, at most one per task and checkpoint.
///
/// An expired countdown restarts from its initial duration instead of
/// stopping, so an unresolved checkpoint keeps expiring until it is passed
/// or cancelled.
#[derive(Debug, Default)]
pub struct CountdownEngine {
    countdowns: HashMap<(TaskId, CheckpointKind), Countdown>,
}

impl CountdownEngine {
    /// Creates an engine with no countdowns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of a completion countdown for a task that really started at
    /// `actual_start`. Falls back to `fallback` when the schedule has
    /// already run out.
    #[must_use]
    pub fn completion_window(
        scheduled_end: DateTime<Utc>,
        actual_start: DateTime<Utc>,
        fallback: TimeDelta,
    ) -> TimeDelta {
        let window = scheduled_end - actual_start;
        if window > TimeDelta::zero() {
            window
        } else {
            fallback
        }
    }

    /// Starts a countdown of `initial`, replacing any running one for the
    /// pair. Returns the deadline.
    pub fn start(
        &mut self,
        task_id: TaskId,
        kind: CheckpointKind,
        initial: TimeDelta,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let deadline = now + initial;
        self.resume(task_id, kind, initial, deadline);
        deadline
    }

    /// Restores a countdown whose deadline was persisted earlier.
    pub fn resume(
        &mut self,
        task_id: TaskId,
        kind: CheckpointKind,
        initial: TimeDelta,
        deadline: DateTime<Utc>,
    ) {
        self.countdowns.insert(
            (task_id, kind),
            Countdown {
                initial,
                deadline,
                cycle: 0,
            },
        );
    }

    /// Expires every countdown whose deadline is at or before `now` and
    /// restarts it. Results are ordered by task and checkpoint.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<CountdownExpired> {
        let mut expired: Vec<CountdownExpired> = self
            .countdowns
            .iter_mut()
            .filter(|(_, countdown)| countdown.deadline <= now)
            .map(|(&(task_id, kind), countdown)| {
                countdown.cycle = countdown.cycle.saturating_add(1);
                countdown.deadline = now + countdown.initial;
                CountdownExpired {
                    task_id,
                    kind,
                    cycle: countdown.cycle,
                    next_deadline: countdown.deadline,
                }
            })
            .collect();
        expired.sort_by_key(|signal| (signal.task_id, signal.kind));
        expired
    }

    /// Whole seconds left, rounded up. `None` when no countdown is running.
    #[must_use]
    pub fn remaining(
        &self,
        task_id: TaskId,
        kind: CheckpointKind,
        now: DateTime<Utc>,
    ) -> Option<u64> {
        self.deadline(task_id, kind).map(|deadline| {
            let millis = (deadline - now).num_milliseconds();
            u64::try_from(millis).map_or(0, |left| left.div_ceil(1000))
        })
    }

    /// Returns the deadline of a running countdown.
    #[must_use]
    pub fn deadline(&self, task_id: TaskId, kind: CheckpointKind) -> Option<DateTime<Utc>> {
        self.countdowns
            .get(&(task_id, kind))
            .map(|countdown| countdown.deadline)
    }

    /// Returns `true` when a countdown is running for the pair.
    #[must_use]
    pub fn is_active(&self, task_id: TaskId, kind: CheckpointKind) -> bool {
        self.countdowns.contains_key(&(task_id, kind))
    }

    /// Stops the countdown for the pair. Returns `true` if one was running.
    pub fn cancel(&mut self, task_id: TaskId, kind: CheckpointKind) -> bool {
        self.countdowns.remove(&(task_id, kind)).is_some()
    }

    /// Stops every countdown of a task. Returns how many were running.
    pub fn cancel_task(&mut self, task_id: TaskId) -> usize {
        let before = self.countdowns.len();
        self.countdowns.retain(|(owner, _), _| *owner != task_id);
        before - self.countdowns.len()
    }

    /// Returns the number of running countdowns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.countdowns.len()
    }

    /// Returns `true` when no countdown is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.countdowns.is_empty()
    }
}
