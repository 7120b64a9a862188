//! Orchestrates the per-task verification state machine.

use crate::classification::ports::ImageClassifier;
use crate::verification::{
    domain::{
        CheckpointKind, CheckpointPatch, CheckpointPhase, CheckpointState, RewardSchedule,
        StateChange, TaskId, TaskSnapshot, TaskStatus, TaskStatusUpdate, VerificationDomainError,
        VerificationEvent, VerificationPrompt,
    },
    ports::{
        CheckpointRepository, Ledger, LedgerError, Notifier, TaskDirectory, TaskDirectoryError,
    },
    services::{
        CountdownEngine, CountdownExpired, ProofMatcher, ProofOutcome, StateStoreError,
        SubscriptionId, VerificationSettings, VerificationStateStore,
    },
};
use super::subscriptions::Subscriptions;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors returned by [`VerificationManager`].
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    /// The task directory does not know the task.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A lifecycle rule was violated.
    #[error(transparent)]
    Domain(#[from] VerificationDomainError),

    /// The task directory failed.
    #[error(transparent)]
    Tasks(#[from] TaskDirectoryError),

    /// The ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Checkpoint state could not be read or written.
    #[error(transparent)]
    StateStore(#[from] StateStoreError),

    /// The runtime driving the manager has shut down.
    #[error("verification runtime has stopped")]
    RuntimeStopped,
}

/// External collaborators the manager talks to.
pub struct VerificationPorts<D, L, N> {
    /// Task directory.
    pub tasks: Arc<D>,
    /// Gold ledger.
    pub ledger: Arc<L>,
    /// Operator notification surface.
    pub notifier: Arc<N>,
}

/// What one poll pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Tasks whose start checkpoint was opened.
    pub opened_start: Vec<TaskId>,
    /// Tasks whose completion checkpoint was opened.
    pub opened_completion: Vec<TaskId>,
    /// Tasks that received the completion reminder.
    pub reminded: Vec<TaskId>,
    /// Tasks whose countdown was restored from storage.
    pub resumed: Vec<TaskId>,
    /// Tasks whose outstanding rewards, penalties or status were applied.
    pub settled: Vec<TaskId>,
    /// Tasks that could not be processed; details are logged.
    pub failed: Vec<TaskId>,
}

#[derive(Debug, Clone, Copy)]
struct Reminder {
    at: DateTime<Utc>,
    fired: bool,
}

#[derive(Debug, Default)]
struct Submissions {
    in_flight: HashSet<TaskId>,
    discarded: HashSet<TaskId>,
}

/// Drives tasks through their start and completion checkpoints.
///
/// Every phase change is persisted through the [`VerificationStateStore`]
/// together with the rewards, penalties and status update it implies. Those
/// effects are then applied one by one and struck off the stored record, so a
/// restart never repeats a passed checkpoint and a failing ledger or task
/// directory delays an effect without losing it.
pub struct VerificationManager<D, L, N, S, K, C>
where
    D: TaskDirectory,
    L: Ledger,
    N: Notifier,
    S: CheckpointRepository,
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    tasks: Arc<D>,
    ledger: Arc<L>,
    notifier: Arc<N>,
    store: Arc<VerificationStateStore<S>>,
    matcher: Arc<ProofMatcher<K, C>>,
    clock: Arc<C>,
    settings: VerificationSettings,
    countdowns: Mutex<CountdownEngine>,
    reminders: Mutex<HashMap<TaskId, Reminder>>,
    submissions: Mutex<Submissions>,
    settling: Mutex<HashSet<TaskId>>,
    subscriptions: Subscriptions,
}

impl<D, L, N, S, K, C> VerificationManager<D, L, N, S, K, C>
where
    D: TaskDirectory,
    L: Ledger,
    N: Notifier,
    S: CheckpointRepository,
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    /// Creates a manager with default settings.
    #[must_use]
    pub fn new(
        ports: VerificationPorts<D, L, N>,
        store: Arc<VerificationStateStore<S>>,
        matcher: Arc<ProofMatcher<K, C>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks: ports.tasks,
            ledger: ports.ledger,
            notifier: ports.notifier,
            store,
            matcher,
            clock,
            settings: VerificationSettings::default(),
            countdowns: Mutex::new(CountdownEngine::new()),
            reminders: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Submissions::default()),
            settling: Mutex::new(HashSet::new()),
            subscriptions: Subscriptions::default(),
        }
    }

    /// Overrides the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: VerificationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &VerificationSettings {
        &self.settings
    }

    /// Returns the checkpoint state store.
    #[must_use]
    pub const fn state_store(&self) -> &Arc<VerificationStateStore<S>> {
        &self.store
    }

    /// Returns the proof matcher.
    #[must_use]
    pub const fn matcher(&self) -> &Arc<ProofMatcher<K, C>> {
        &self.matcher
    }

    /// Scans active tasks once: applies outstanding rewards, penalties and
    /// status changes, opens checkpoints whose boundary has been crossed,
    /// fires due completion reminders and restores countdowns for
    /// checkpoints recovered from storage.
    ///
    /// A failure on one task is logged and recorded in the report without
    /// stopping the pass.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Tasks`] when active tasks cannot be
    /// listed.
    pub async fn poll(&self) -> Result<PollReport, VerificationError> {
        let now = self.clock.utc();
        let tasks = self.tasks.list_active_tasks().await?;
        let mut report = PollReport::default();
        for task in &tasks {
            if let Err(err) = self.poll_task(task, now, &mut report).await {
                error!(task_id = %task.id(), error = %err, "verification poll failed for task");
                report.failed.push(task.id());
            }
        }
        Ok(report)
    }

    async fn poll_task(
        &self,
        task: &TaskSnapshot,
        now: DateTime<Utc>,
        report: &mut PollReport,
    ) -> Result<(), VerificationError> {
        let state = self.store.get(task.id());
        if !state.settlement().is_settled() {
            self.settle(task.id()).await?;
            report.settled.push(task.id());
            return Ok(());
        }
        match (state.phase(), task.status()) {
            (CheckpointPhase::Pending, TaskStatus::Scheduled | TaskStatus::VerifyingStart) => {
                if let Some(deadline) = state.deadline() {
                    if self.resume_countdown(task, CheckpointKind::Start, &state, deadline) {
                        report.resumed.push(task.id());
                    }
                    self.ensure_awaiting(task, CheckpointKind::Start).await?;
                } else if now >= task.scheduled_start() {
                    self.open_checkpoint(task, CheckpointKind::Start, now).await?;
                    report.opened_start.push(task.id());
                }
            }
            (CheckpointPhase::Started, TaskStatus::InProgress | TaskStatus::VerifyingComplete) => {
                if let Some(deadline) = state.deadline() {
                    if self.resume_countdown(task, CheckpointKind::Completion, &state, deadline) {
                        report.resumed.push(task.id());
                    }
                    return self.ensure_awaiting(task, CheckpointKind::Completion).await;
                }
                if self.remind_if_due(task, now).await {
                    report.reminded.push(task.id());
                }
                if now >= task.scheduled_end() {
                    self.open_checkpoint(task, CheckpointKind::Completion, now)
                        .await?;
                    report.opened_completion.push(task.id());
                }
            }
            (phase, status) => {
                debug!(task_id = %task.id(), %phase, %status, "nothing to do for task");
            }
        }
        Ok(())
    }

    /// Expires due countdowns. Each expiry withdraws the checkpoint penalty,
    /// increments the timeout counter and restarts the countdown; the phase
    /// is left alone.
    ///
    /// A failure on one countdown is logged without stopping the others.
    pub async fn tick(&self) -> Vec<CountdownExpired> {
        let now = self.clock.utc();
        let expired = self.lock_countdowns().tick(now);
        let mut handled = Vec::with_capacity(expired.len());
        for signal in expired {
            match self.handle_timeout(signal).await {
                Ok(true) => handled.push(signal),
                Ok(false) => {}
                Err(err) => {
                    error!(
                        task_id = %signal.task_id,
                        checkpoint = %signal.kind,
                        error = %err,
                        "countdown expiry could not be applied"
                    );
                }
            }
        }
        handled
    }

    async fn handle_timeout(&self, signal: CountdownExpired) -> Result<bool, VerificationError> {
        let CountdownExpired {
            task_id,
            kind,
            next_deadline,
            ..
        } = signal;
        let Some(task) = self.tasks.get_task(task_id).await? else {
            self.lock_countdowns().cancel_task(task_id);
            return Ok(false);
        };
        if !self.is_awaiting(&task, kind) {
            debug!(%task_id, checkpoint = %kind, "stale countdown dropped");
            self.lock_countdowns().cancel(task_id, kind);
            return Ok(false);
        }

        let penalty = RewardSchedule::for_duration(task.duration_minutes()).penalty_for(kind);
        let timeouts = self.store.get(task_id).timeouts().saturating_add(1);
        let updated = self
            .store
            .transition(
                task_id,
                CheckpointPatch::new()
                    .with_deadline(next_deadline)
                    .with_timeouts(timeouts)
                    .owe_penalty(penalty),
            )
            .await?;
        warn!(%task_id, checkpoint = %kind, penalty, timeouts, "verification countdown expired");
        let settled = self.settle(task_id).await;

        self.notify(VerificationEvent::Timeout {
            task_id,
            kind,
            penalty,
            timeouts,
            next_deadline,
        })
        .await;
        self.notifier.announce(&format!(
            "Time is up for {}. {penalty} gold deducted, the countdown starts again.",
            task.title()
        ));
        self.prompt(&task, kind, next_deadline).await;
        self.publish(task_id, task.status(), &updated);
        settled.map(|_| true)
    }

    /// Evaluates a photo for an open checkpoint.
    ///
    /// Classification problems, mismatches, concurrent submissions and
    /// submissions for tasks not awaiting proof resolve to an unsuccessful
    /// [`ProofOutcome`] and leave checkpoint state untouched. A result that
    /// arrives after the task was cancelled or reset is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error when the task is unknown, when a passed checkpoint
    /// cannot be recorded, or when its reward or status update fails. The
    /// pass itself stands in the last case and [`Self::poll`] retries the
    /// outstanding effects.
    pub async fn submit_proof(
        &self,
        task_id: TaskId,
        kind: CheckpointKind,
        image: &[u8],
    ) -> Result<ProofOutcome, VerificationError> {
        let Some(_guard) = SubmissionGuard::acquire(&self.submissions, task_id) else {
            debug!(%task_id, checkpoint = %kind, "submission rejected, another is in flight");
            return Ok(ProofOutcome::in_flight(task_id));
        };

        let task = self
            .tasks
            .get_task(task_id)
            .await?
            .ok_or(VerificationError::TaskNotFound(task_id))?;
        if !self.is_awaiting(&task, kind) {
            return Ok(ProofOutcome::not_awaiting(task_id, kind));
        }

        let evaluation = self.matcher.verify(&task, kind, image).await;
        if self.was_discarded(task_id) || !self.checkpoint_open(task_id, kind) {
            info!(%task_id, checkpoint = %kind, "proof result discarded for cancelled task");
            return Ok(ProofOutcome::discarded(task_id));
        }

        match evaluation {
            Err(err) => {
                warn!(%task_id, checkpoint = %kind, error = %err, "proof could not be classified");
                Ok(ProofOutcome::classification(&err))
            }
            Ok(result) if !result.matched => {
                let outcome = ProofOutcome::no_match(result);
                self.notify(VerificationEvent::ProofRejected {
                    task_id,
                    kind,
                    reason: outcome.reason.clone(),
                })
                .await;
                Ok(outcome)
            }
            Ok(result) => {
                let reward = self.pass_checkpoint(&task, kind).await?;
                Ok(ProofOutcome::passed(kind, result, reward))
            }
        }
    }

    async fn pass_checkpoint(
        &self,
        task: &TaskSnapshot,
        kind: CheckpointKind,
    ) -> Result<u64, VerificationError> {
        let now = self.clock.utc();
        let task_id = task.id();
        let reward = RewardSchedule::for_duration(task.duration_minutes()).reward_for(kind);
        let mut patch = CheckpointPatch::new()
            .with_phase(kind.passed_phase())
            .clear_deadline()
            .owe_reward(reward)
            .with_pending_status(kind.passed_status(), now);
        if kind == CheckpointKind::Start {
            patch = patch.with_actual_start(now);
        }
        self.store.transition(task_id, patch).await?;
        self.lock_countdowns().cancel(task_id, kind);

        match kind {
            CheckpointKind::Start => {
                self.lock_reminders().insert(
                    task_id,
                    Reminder {
                        at: task.scheduled_end() - self.settings.reminder_lead,
                        fired: false,
                    },
                );
            }
            CheckpointKind::Completion => {
                self.lock_reminders().remove(&task_id);
            }
        }
        info!(%task_id, checkpoint = %kind, reward, "verification passed");
        let state = self.settle(task_id).await?;

        self.notify(VerificationEvent::Passed {
            task_id,
            kind,
            reward,
        })
        .await;
        self.notifier.announce(&format!(
            "{} verified. {reward} gold earned.",
            task.title()
        ));
        self.publish(task_id, kind.passed_status(), &state);
        Ok(reward)
    }

    /// Opens the completion checkpoint before the scheduled end.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationDomainError::InvalidStatusTransition`] unless the
    /// task is in progress with its start checkpoint passed, and propagates
    /// store and directory failures.
    pub async fn request_completion(&self, task_id: TaskId) -> Result<(), VerificationError> {
        let task = self.require_task(task_id).await?;
        let state = self.store.get(task_id);
        if task.status() != TaskStatus::InProgress || state.phase() != CheckpointPhase::Started {
            return Err(VerificationDomainError::InvalidStatusTransition {
                task_id,
                from: task.status(),
                to: TaskStatus::VerifyingComplete,
            }
            .into());
        }
        self.open_checkpoint(&task, CheckpointKind::Completion, self.clock.utc())
            .await
    }

    /// Explicitly fails an open checkpoint. The checkpoint penalty is
    /// withdrawn once and the task becomes `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationDomainError::InvalidStatusTransition`] when the
    /// checkpoint is not open, and propagates port failures. Once the
    /// rejection is recorded it stands; a failed withdrawal or status update
    /// is retried by [`Self::poll`].
    pub async fn reject(
        &self,
        task_id: TaskId,
        kind: CheckpointKind,
        reason: &str,
    ) -> Result<(), VerificationError> {
        let task = self.require_task(task_id).await?;
        if !self.is_awaiting(&task, kind) {
            return Err(VerificationDomainError::InvalidStatusTransition {
                task_id,
                from: task.status(),
                to: TaskStatus::Failed,
            }
            .into());
        }

        self.stop_tracking(task_id);
        let penalty = RewardSchedule::for_duration(task.duration_minutes()).penalty_for(kind);
        self.store
            .transition(
                task_id,
                CheckpointPatch::new()
                    .clear_deadline()
                    .owe_penalty(penalty)
                    .with_pending_status(TaskStatus::Failed, self.clock.utc()),
            )
            .await?;
        warn!(%task_id, checkpoint = %kind, penalty, reason, "verification rejected");
        let state = self.settle(task_id).await?;

        self.notify(VerificationEvent::Rejected {
            task_id,
            kind,
            penalty,
            reason: reason.to_owned(),
        })
        .await;
        self.publish(task_id, TaskStatus::Failed, &state);
        Ok(())
    }

    /// Cancels a task: settles what it still owes, stops its countdowns,
    /// discards any in-flight result and marks it `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationDomainError::InvalidStatusTransition`] for a task
    /// that already reached a terminal status, and propagates port failures.
    pub async fn cancel(&self, task_id: TaskId) -> Result<(), VerificationError> {
        if !self.store.get(task_id).settlement().is_settled() {
            self.settle(task_id).await?;
        }
        let task = self.require_task(task_id).await?;
        if task.status().is_terminal() {
            return Err(VerificationDomainError::InvalidStatusTransition {
                task_id,
                from: task.status(),
                to: TaskStatus::Cancelled,
            }
            .into());
        }

        self.stop_tracking(task_id);
        let state = if self.store.contains(task_id) {
            self.store
                .transition(task_id, CheckpointPatch::new().clear_deadline())
                .await?
        } else {
            CheckpointState::default()
        };
        self.tasks
            .update_task_status(task_id, TaskStatus::Cancelled, TaskStatusUpdate::default())
            .await?;
        info!(%task_id, "verification cancelled");

        self.notify(VerificationEvent::Cancelled { task_id }).await;
        self.publish(task_id, TaskStatus::Cancelled, &state);
        Ok(())
    }

    /// Forgets a task that was deleted or reset externally: stops its
    /// countdowns, discards any in-flight result and deletes its checkpoint
    /// state. The task directory is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::StateStore`] when the deletion cannot be
    /// persisted.
    pub async fn reset(&self, task_id: TaskId) -> Result<(), VerificationError> {
        self.stop_tracking(task_id);
        self.store.reset(task_id).await?;
        info!(%task_id, "verification state reset");
        Ok(())
    }

    /// Seconds left on the countdown of an open checkpoint. Read-only.
    #[must_use]
    pub fn remaining(&self, task_id: TaskId, kind: CheckpointKind) -> Option<u64> {
        self.lock_countdowns()
            .remaining(task_id, kind, self.clock.utc())
    }

    /// Calls `callback` whenever the task's status or checkpoint changes.
    pub fn on_state_change<F>(&self, task_id: TaskId, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.subscriptions.subscribe(task_id, Arc::new(callback))
    }

    /// Cancels a subscription. Returns `false` when it was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    async fn open_checkpoint(
        &self,
        task: &TaskSnapshot,
        kind: CheckpointKind,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let task_id = task.id();
        let window = self.window_for(task, kind, now);
        let deadline = now + window;
        let state = self
            .store
            .transition(task_id, CheckpointPatch::new().with_deadline(deadline))
            .await?;
        self.tasks
            .update_task_status(task_id, kind.awaiting_status(), TaskStatusUpdate::default())
            .await?;
        self.lock_countdowns().start(task_id, kind, window, now);
        info!(%task_id, checkpoint = %kind, %deadline, "verification checkpoint opened");

        self.prompt(task, kind, deadline).await;
        self.notify(VerificationEvent::CheckpointOpened {
            task_id,
            kind,
            deadline,
        })
        .await;
        self.notifier.announce(&format!(
            "Time to verify {}: {}",
            task.title(),
            task.requirement(kind).requirement()
        ));
        self.publish(task_id, kind.awaiting_status(), &state);
        Ok(())
    }

    fn window_for(
        &self,
        task: &TaskSnapshot,
        kind: CheckpointKind,
        now: DateTime<Utc>,
    ) -> TimeDelta {
        let configured = task
            .configured_requirement(kind)
            .map_or(self.settings.start_window, |requirement| requirement.timeout());
        match kind {
            CheckpointKind::Start => configured,
            CheckpointKind::Completion => {
                let actual_start = self
                    .store
                    .get(task.id())
                    .actual_start()
                    .or_else(|| task.actual_start())
                    .unwrap_or(now);
                CountdownEngine::completion_window(task.scheduled_end(), actual_start, configured)
            }
        }
    }

    fn resume_countdown(
        &self,
        task: &TaskSnapshot,
        kind: CheckpointKind,
        state: &CheckpointState,
        deadline: DateTime<Utc>,
    ) -> bool {
        let mut countdowns = self.lock_countdowns();
        if countdowns.is_active(task.id(), kind) {
            return false;
        }
        let anchor = state.actual_start().unwrap_or(deadline);
        let initial = self.window_for(task, kind, anchor);
        countdowns.resume(task.id(), kind, initial, deadline);
        info!(task_id = %task.id(), checkpoint = %kind, %deadline, "countdown restored");
        true
    }

    async fn ensure_awaiting(
        &self,
        task: &TaskSnapshot,
        kind: CheckpointKind,
    ) -> Result<(), VerificationError> {
        if task.status() == kind.awaiting_status() {
            return Ok(());
        }
        self.tasks
            .update_task_status(task.id(), kind.awaiting_status(), TaskStatusUpdate::default())
            .await?;
        Ok(())
    }

    async fn remind_if_due(&self, task: &TaskSnapshot, now: DateTime<Utc>) -> bool {
        let due = {
            let mut reminders = self.lock_reminders();
            // Only reached without a reminder after a restart; one already due
            // went out before it.
            let reminder = reminders.entry(task.id()).or_insert_with(|| {
                let at = task.scheduled_end() - self.settings.reminder_lead;
                Reminder {
                    at,
                    fired: now >= at,
                }
            });
            let due = !reminder.fired && now >= reminder.at && now < task.scheduled_end();
            if due {
                reminder.fired = true;
            }
            due
        };
        if due {
            self.notify(VerificationEvent::CompletionReminder {
                task_id: task.id(),
                scheduled_end: task.scheduled_end(),
            })
            .await;
            self.notifier.announce(&format!(
                "{} ends in {} minutes. Get ready to verify.",
                task.title(),
                self.settings.reminder_lead.num_minutes()
            ));
        }
        due
    }

    fn is_awaiting(&self, task: &TaskSnapshot, kind: CheckpointKind) -> bool {
        task.status() == kind.awaiting_status() && self.checkpoint_open(task.id(), kind)
    }

    fn checkpoint_open(&self, task_id: TaskId, kind: CheckpointKind) -> bool {
        let state = self.store.get(task_id);
        state.phase() == kind.open_phase() && state.settlement().status.is_none()
    }

    /// Applies the rewards, penalties and status change recorded in the
    /// task's settlement, striking each off as it lands.
    async fn settle(&self, task_id: TaskId) -> Result<CheckpointState, VerificationError> {
        let Some(_slot) = TaskSlot::acquire(&self.settling, task_id) else {
            debug!(%task_id, "settlement already under way");
            return Ok(self.store.get(task_id));
        };
        let mut state = self.store.get(task_id);
        let due = state.settlement();
        if due.is_settled() {
            return Ok(state);
        }
        let task = self.require_task(task_id).await?;

        if due.reward_due > 0 {
            self.ledger
                .deposit(due.reward_due, &format!("verification reward: {}", task.title()))
                .await?;
            state = self
                .store
                .transition(task_id, CheckpointPatch::new().reward_paid(due.reward_due))
                .await?;
        }
        if due.penalty_due > 0 {
            self.ledger
                .withdraw(due.penalty_due, &format!("verification penalty: {}", task.title()))
                .await?;
            state = self
                .store
                .transition(task_id, CheckpointPatch::new().penalty_paid(due.penalty_due))
                .await?;
        }

        let pending = state.settlement();
        if pending.has_unrecorded() {
            let status = pending.status.unwrap_or_else(|| task.status());
            let mut update = TaskStatusUpdate::default();
            if pending.earned_unrecorded > 0 {
                update = update
                    .with_gold_earned(task.gold_earned().saturating_add(pending.earned_unrecorded));
            }
            if pending.penalty_unrecorded > 0 {
                update = update.with_penalty_gold(
                    task.penalty_gold().saturating_add(pending.penalty_unrecorded),
                );
            }
            if let Some(at) = pending.status_at {
                update = match status {
                    TaskStatus::InProgress => {
                        update.with_actual_start(state.actual_start().unwrap_or(at))
                    }
                    TaskStatus::Completed => update.with_actual_end(at),
                    _ => update,
                };
            }
            self.tasks.update_task_status(task_id, status, update).await?;
            state = self
                .store
                .transition(
                    task_id,
                    CheckpointPatch::new()
                        .directory_updated(pending.earned_unrecorded, pending.penalty_unrecorded),
                )
                .await?;
            debug!(%task_id, %status, "task directory caught up");
        }
        Ok(state)
    }

    async fn require_task(&self, task_id: TaskId) -> Result<TaskSnapshot, VerificationError> {
        self.tasks
            .get_task(task_id)
            .await?
            .ok_or(VerificationError::TaskNotFound(task_id))
    }

    fn stop_tracking(&self, task_id: TaskId) {
        self.lock_countdowns().cancel_task(task_id);
        self.lock_reminders().remove(&task_id);
        let mut submissions = self.lock_submissions();
        if submissions.in_flight.contains(&task_id) {
            submissions.discarded.insert(task_id);
        }
    }

    fn was_discarded(&self, task_id: TaskId) -> bool {
        self.lock_submissions().discarded.contains(&task_id)
    }

    /// Tasks with a submission under evaluation or a pending discard.
    #[cfg(test)]
    pub(crate) fn tracked_submissions(&self) -> usize {
        let submissions = self.lock_submissions();
        submissions.in_flight.len() + submissions.discarded.len()
    }

    async fn prompt(&self, task: &TaskSnapshot, kind: CheckpointKind, deadline: DateTime<Utc>) {
        let prompt = VerificationPrompt {
            task_id: task.id(),
            kind,
            requirement: task.requirement(kind).requirement().to_owned(),
            deadline,
        };
        if let Err(err) = self.notifier.open_verification_prompt(prompt).await {
            warn!(task_id = %task.id(), error = %err, "verification prompt not delivered");
        }
    }

    async fn notify(&self, event: VerificationEvent) {
        let name = event.name();
        let task_id = event.task_id();
        if let Err(err) = self.notifier.emit(event).await {
            warn!(%task_id, event = name, error = %err, "verification event not delivered");
        }
    }

    fn publish(&self, task_id: TaskId, status: TaskStatus, state: &CheckpointState) {
        self.subscriptions.publish(&StateChange {
            task_id,
            status,
            phase: state.phase(),
            deadline: state.deadline(),
        });
    }

    fn lock_countdowns(&self) -> std::sync::MutexGuard<'_, CountdownEngine> {
        self.countdowns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_reminders(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, Reminder>> {
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_submissions(&self) -> std::sync::MutexGuard<'_, Submissions> {
        lock_submissions(&self.submissions)
    }
}

fn lock_submissions(submissions: &Mutex<Submissions>) -> std::sync::MutexGuard<'_, Submissions> {
    submissions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a task as having a submission under evaluation until dropped.
struct SubmissionGuard<'a> {
    submissions: &'a Mutex<Submissions>,
    task_id: TaskId,
}

impl<'a> SubmissionGuard<'a> {
    fn acquire(submissions: &'a Mutex<Submissions>, task_id: TaskId) -> Option<Self> {
        let inserted = lock_submissions(submissions).in_flight.insert(task_id);
        inserted.then_some(Self {
            submissions,
            task_id,
        })
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let mut submissions = lock_submissions(self.submissions);
        submissions.in_flight.remove(&self.task_id);
        submissions.discarded.remove(&self.task_id);
    }
}

/// Holds a task's place in a set until dropped.
struct TaskSlot<'a> {
    set: &'a Mutex<HashSet<TaskId>>,
    task_id: TaskId,
}

impl<'a> TaskSlot<'a> {
    fn acquire(set: &'a Mutex<HashSet<TaskId>>, task_id: TaskId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id);
        inserted.then_some(Self { set, task_id })
    }
}

impl Drop for TaskSlot<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.task_id);
    }
}
