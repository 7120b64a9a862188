//! Shared fixtures for verification unit tests.

use std::sync::Arc;

use crate::classification::{
    adapters::memory::StaticImageClassifier,
    domain::{
        AccessToken, ClassificationResult, ClassifierCredentials, IssuedToken, RecognizedLabel,
    },
    ports::ImageClassifier,
    services::ClassificationClient,
};
use crate::clock::ManualClock;
use crate::verification::{
    adapters::memory::{
        InMemoryCheckpointRepository, InMemoryLedger, InMemoryTaskDirectory, RecordingNotifier,
    },
    domain::{KeywordSynonymTable, TaskId, TaskSnapshot},
    services::{
        ProofMatcher, VerificationManager, VerificationPorts, VerificationSettings,
        VerificationStateStore,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use mockall::mock;
use std::time::Duration;
use tokio::sync::Notify;

mock! {
    pub Classifier {}

    #[async_trait]
    impl ImageClassifier for Classifier {
        async fn authenticate(
            &self,
            credentials: &ClassifierCredentials,
        ) -> ClassificationResult<IssuedToken>;

        async fn classify(
            &self,
            image: &[u8],
            token: &AccessToken,
        ) -> ClassificationResult<Vec<RecognizedLabel>>;
    }
}

/// Monday morning used as time zero in every test.
pub(super) fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
        .single()
        .expect("valid start instant")
}

pub(super) fn kitchen_task(start: DateTime<Utc>) -> TaskSnapshot {
    TaskSnapshot::new(
        TaskId::new(),
        "Clean the kitchen",
        start,
        start + TimeDelta::minutes(30),
    )
}

pub(super) fn client_for<K: ImageClassifier>(
    classifier: Arc<K>,
    clock: &ManualClock,
) -> Arc<ClassificationClient<K, ManualClock>> {
    Arc::new(
        ClassificationClient::new(classifier, Arc::new(clock.clone()))
            .with_credentials(ClassifierCredentials::new("api-key", "secret-key")),
    )
}

/// Classifier that parks inside `classify` until released.
#[derive(Debug, Default)]
pub(super) struct GatedClassifier {
    pub entered: Notify,
    pub release: Notify,
    pub labels: Vec<String>,
}

impl GatedClassifier {
    pub(super) fn recognising(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|label| (*label).to_owned()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageClassifier for GatedClassifier {
    async fn authenticate(
        &self,
        _credentials: &ClassifierCredentials,
    ) -> ClassificationResult<IssuedToken> {
        Ok(IssuedToken::new("gated", TimeDelta::hours(1)))
    }

    async fn classify(
        &self,
        _image: &[u8],
        _token: &AccessToken,
    ) -> ClassificationResult<Vec<RecognizedLabel>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self
            .labels
            .iter()
            .map(|label| RecognizedLabel::new(label.clone(), 0.8))
            .collect())
    }
}

pub(super) type TestManager<K> = VerificationManager<
    InMemoryTaskDirectory,
    InMemoryLedger,
    RecordingNotifier,
    InMemoryCheckpointRepository,
    K,
    ManualClock,
>;

pub(super) struct Harness<K: ImageClassifier> {
    pub clock: ManualClock,
    pub tasks: Arc<InMemoryTaskDirectory>,
    pub ledger: Arc<InMemoryLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub repository: Arc<InMemoryCheckpointRepository>,
    pub classifier: Arc<K>,
    pub manager: Arc<TestManager<K>>,
}

pub(super) fn harness_with<K: ImageClassifier>(classifier: Arc<K>) -> Harness<K> {
    let clock = ManualClock::new(start_instant());
    let tasks = Arc::new(InMemoryTaskDirectory::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let repository = Arc::new(InMemoryCheckpointRepository::new());
    let settings = VerificationSettings::default()
        .with_persistence_retries(3, Duration::from_millis(1));
    let store = Arc::new(VerificationStateStore::configured(
        Arc::clone(&repository),
        &settings,
    ));
    let matcher = Arc::new(ProofMatcher::new(
        client_for(Arc::clone(&classifier), &clock),
        KeywordSynonymTable::builtin(),
    ));
    let manager = VerificationManager::new(
        VerificationPorts {
            tasks: Arc::clone(&tasks),
            ledger: Arc::clone(&ledger),
            notifier: Arc::clone(&notifier),
        },
        store,
        matcher,
        Arc::new(clock.clone()),
    )
    .with_settings(settings);

    Harness {
        clock,
        tasks,
        ledger,
        notifier,
        repository,
        classifier,
        manager: Arc::new(manager),
    }
}

pub(super) fn harness() -> Harness<StaticImageClassifier> {
    let classifier = Arc::new(StaticImageClassifier::new());
    classifier.insert_labels(b"sink-photo".to_vec(), ["sink"]);
    classifier.insert_labels(b"stove-photo".to_vec(), ["stove", "pot"]);
    harness_with(classifier)
}
