//! Async driver running the manager's poll and tick loops.

use crate::classification::ports::ImageClassifier;
use crate::verification::{
    domain::{CheckpointKind, TaskId},
    ports::{CheckpointRepository, Ledger, Notifier, TaskDirectory},
    services::{ProofOutcome, VerificationError, VerificationManager},
};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Pending submissions held before senders wait.
const SUBMISSION_QUEUE_DEPTH: usize = 32;

/// A photo submitted for an open checkpoint.
#[derive(Debug)]
pub struct ProofSubmitted {
    /// Task the photo is for.
    pub task_id: TaskId,
    /// Checkpoint the photo is for.
    pub kind: CheckpointKind,
    /// Raw image bytes.
    pub image: Vec<u8>,
    /// Where the outcome is sent.
    pub reply: oneshot::Sender<Result<ProofOutcome, VerificationError>>,
}

/// Cloneable handle for submitting photos to a running runtime.
#[derive(Debug, Clone)]
pub struct ProofSubmitter {
    sender: mpsc::Sender<ProofSubmitted>,
}

impl ProofSubmitter {
    /// Submits a photo and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::RuntimeStopped`] when the runtime is no
    /// longer running, otherwise whatever the manager reports.
    pub async fn submit(
        &self,
        task_id: TaskId,
        kind: CheckpointKind,
        image: Vec<u8>,
    ) -> Result<ProofOutcome, VerificationError> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(ProofSubmitted {
                task_id,
                kind,
                image,
                reply,
            })
            .await
            .map_err(|_| VerificationError::RuntimeStopped)?;
        outcome.await.map_err(|_| VerificationError::RuntimeStopped)?
    }
}

/// Runs a [`VerificationManager`] on the tokio runtime.
///
/// Polls on the configured interval, ticks countdowns on the tick interval
/// and evaluates submitted photos concurrently, until the shutdown token is
/// cancelled or every [`ProofSubmitter`] is dropped.
pub struct VerificationRuntime<D, L, N, S, K, C>
where
    D: TaskDirectory,
    L: Ledger,
    N: Notifier,
    S: CheckpointRepository,
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    manager: Arc<VerificationManager<D, L, N, S, K, C>>,
    submissions: mpsc::Receiver<ProofSubmitted>,
    shutdown: CancellationToken,
}

impl<D, L, N, S, K, C> VerificationRuntime<D, L, N, S, K, C>
where
    D: TaskDirectory + 'static,
    L: Ledger + 'static,
    N: Notifier + 'static,
    S: CheckpointRepository + 'static,
    K: ImageClassifier + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a runtime and the handle used to feed it photos.
    #[must_use]
    pub fn new(
        manager: Arc<VerificationManager<D, L, N, S, K, C>>,
        shutdown: CancellationToken,
    ) -> (Self, ProofSubmitter) {
        let (sender, submissions) = mpsc::channel(SUBMISSION_QUEUE_DEPTH);
        (
            Self {
                manager,
                submissions,
                shutdown,
            },
            ProofSubmitter { sender },
        )
    }

    /// Loads persisted checkpoint state and runs until shut down.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::StateStore`] when persisted state cannot
    /// be loaded. Failures inside the loop are logged and do not stop it.
    pub async fn run(mut self) -> Result<(), VerificationError> {
        let restored = self.manager.state_store().load().await?;
        let settings = *self.manager.settings();
        let mut poll = interval(settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick = interval(settings.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(restored, "verification runtime started");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = poll.tick() => {
                    if let Err(err) = self.manager.poll().await {
                        error!(error = %err, "verification poll failed");
                    }
                }
                _ = tick.tick() => {
                    let expired = self.manager.tick().await;
                    if !expired.is_empty() {
                        debug!(expired = expired.len(), "countdowns expired");
                    }
                }
                submission = self.submissions.recv() => {
                    let Some(submission) = submission else { break };
                    self.dispatch(submission);
                }
            }
        }
        info!("verification runtime stopped");
        Ok(())
    }

    fn dispatch(&self, submission: ProofSubmitted) {
        let manager = Arc::clone(&self.manager);
        tokio::spawn(async move {
            let ProofSubmitted {
                task_id,
                kind,
                image,
                reply,
            } = submission;
            let outcome = manager.submit_proof(task_id, kind, &image).await;
            if reply.send(outcome).is_err() {
                debug!(%task_id, "proof submitter went away before the outcome");
            }
        });
    }
}
