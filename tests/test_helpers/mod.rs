//! Shared engine wiring for integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proofgate::classification::{
    adapters::memory::StaticImageClassifier, domain::ClassifierCredentials,
    services::ClassificationClient,
};
use proofgate::clock::ManualClock;
use proofgate::verification::{
    adapters::memory::{InMemoryLedger, InMemoryTaskDirectory, RecordingNotifier},
    domain::{KeywordSynonymTable, TaskId, TaskSnapshot, TaskStatus},
    ports::CheckpointRepository,
    services::{
        ProofMatcher, VerificationError, VerificationManager, VerificationPorts,
        VerificationSettings, VerificationStateStore,
    },
};

/// Manager wired to in-memory ports and the static classifier.
pub type Manager<S> = VerificationManager<
    InMemoryTaskDirectory,
    InMemoryLedger,
    RecordingNotifier,
    S,
    StaticImageClassifier,
    ManualClock,
>;

/// Monday 09:00 UTC, the scheduled start of every test task.
#[must_use]
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Task starting at [`start_instant`] and lasting `minutes`.
#[must_use]
pub fn task_lasting(title: &str, minutes: i64) -> TaskSnapshot {
    let start = start_instant();
    TaskSnapshot::new(TaskId::new(), title, start, start + TimeDelta::minutes(minutes))
}

/// Settings with short loop intervals and near-instant persistence retries.
#[must_use]
pub fn fast_settings() -> VerificationSettings {
    VerificationSettings::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_tick_interval(Duration::from_millis(10))
        .with_persistence_retries(3, Duration::from_millis(1))
}

/// A complete engine plus handles on every collaborator.
pub struct Stack<S: CheckpointRepository> {
    pub clock: ManualClock,
    pub tasks: Arc<InMemoryTaskDirectory>,
    pub ledger: Arc<InMemoryLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub repository: Arc<S>,
    pub classifier: Arc<StaticImageClassifier>,
    pub manager: Arc<Manager<S>>,
}

impl<S: CheckpointRepository> Stack<S> {
    /// Builds an engine over `repository` with the clock at the task start.
    pub fn new(repository: Arc<S>) -> Self {
        let classifier = Arc::new(StaticImageClassifier::new());
        classifier.insert_labels(b"sink-photo".to_vec(), ["sink"]);
        classifier.insert_labels(b"stove-photo".to_vec(), ["stove", "pot"]);
        let clock = ManualClock::new(start_instant());
        let tasks = Arc::new(InMemoryTaskDirectory::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = Arc::new(wire(
            &clock,
            VerificationPorts {
                tasks: Arc::clone(&tasks),
                ledger: Arc::clone(&ledger),
                notifier: Arc::clone(&notifier),
            },
            Arc::clone(&repository),
            &classifier,
        ));
        Self {
            clock,
            tasks,
            ledger,
            notifier,
            repository,
            classifier,
            manager,
        }
    }

    /// Builds a fresh manager over the same collaborators and reloads the
    /// persisted checkpoint state, as a process restart would.
    ///
    /// # Errors
    ///
    /// Returns an error when persisted state cannot be loaded.
    pub async fn restart(&self) -> Result<Self, VerificationError> {
        let manager = wire(
            &self.clock,
            VerificationPorts {
                tasks: Arc::clone(&self.tasks),
                ledger: Arc::clone(&self.ledger),
                notifier: Arc::clone(&self.notifier),
            },
            Arc::clone(&self.repository),
            &self.classifier,
        );
        manager.state_store().load().await?;
        Ok(Self {
            clock: self.clock.clone(),
            tasks: Arc::clone(&self.tasks),
            ledger: Arc::clone(&self.ledger),
            notifier: Arc::clone(&self.notifier),
            repository: Arc::clone(&self.repository),
            classifier: Arc::clone(&self.classifier),
            manager: Arc::new(manager),
        })
    }

    /// Registers a task and returns its id.
    pub fn add_task(&self, task: TaskSnapshot) -> TaskId {
        let id = task.id();
        self.tasks.insert(task);
        id
    }

    /// Current status of a task in the directory.
    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.task(id).map(|task| task.status())
    }
}

fn wire<S: CheckpointRepository>(
    clock: &ManualClock,
    ports: VerificationPorts<InMemoryTaskDirectory, InMemoryLedger, RecordingNotifier>,
    repository: Arc<S>,
    classifier: &Arc<StaticImageClassifier>,
) -> Manager<S> {
    let settings = fast_settings();
    let client = ClassificationClient::new(Arc::clone(classifier), Arc::new(clock.clone()))
        .with_credentials(ClassifierCredentials::new("api-key", "secret-key"));
    let matcher = ProofMatcher::new(Arc::new(client), KeywordSynonymTable::builtin());
    VerificationManager::new(
        ports,
        Arc::new(VerificationStateStore::configured(repository, &settings)),
        Arc::new(matcher),
        Arc::new(clock.clone()),
    )
    .with_settings(settings)
}
