//! In-memory classifier for tests and offline runs.

use crate::classification::{
    domain::{
        AccessToken, ClassificationError, ClassificationResult, ClassifierCredentials,
        IssuedToken, RecognizedLabel,
    },
    ports::ImageClassifier,
};
use async_trait::async_trait;
use chrono::TimeDelta;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Classifier that answers from a fixed image-to-labels table.
///
/// Images without an entry yield no labels. Calls are counted so tests can
/// assert whether the service was reached at all.
#[derive(Debug, Clone)]
pub struct StaticImageClassifier {
    state: Arc<RwLock<StaticState>>,
}

#[derive(Debug)]
struct StaticState {
    token_lifetime: TimeDelta,
    catalog: HashMap<Vec<u8>, Vec<RecognizedLabel>>,
    next_failure: Option<ClassificationError>,
    authentications: usize,
    classifications: usize,
}

impl StaticImageClassifier {
    /// Creates an empty classifier issuing 30-day tokens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StaticState {
                token_lifetime: TimeDelta::days(30),
                catalog: HashMap::new(),
                next_failure: None,
                authentications: 0,
                classifications: 0,
            })),
        }
    }

    /// Registers the labels recognised for an image.
    ///
    /// Existing entries for the same bytes are replaced.
    pub fn insert_labels<I, S>(&self, image: impl Into<Vec<u8>>, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recognized = labels
            .into_iter()
            .map(|label| RecognizedLabel::new(label, 0.9))
            .collect();
        self.write().catalog.insert(image.into(), recognized);
    }

    /// Makes the next `classify` call fail with the given error.
    pub fn fail_next_classification(&self, error: ClassificationError) {
        self.write().next_failure = Some(error);
    }

    /// Returns how many tokens have been issued.
    #[must_use]
    pub fn authentication_count(&self) -> usize {
        self.read().authentications
    }

    /// Returns how many recognition calls have been made.
    #[must_use]
    pub fn classification_count(&self) -> usize {
        self.read().classifications
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StaticState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StaticState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StaticImageClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageClassifier for StaticImageClassifier {
    async fn authenticate(
        &self,
        credentials: &ClassifierCredentials,
    ) -> ClassificationResult<IssuedToken> {
        if !credentials.is_complete() {
            return Err(ClassificationError::AuthenticationFailed(
                "empty credentials".to_owned(),
            ));
        }
        let mut state = self.write();
        state.authentications += 1;
        Ok(IssuedToken::new(
            format!("static-token-{}", state.authentications),
            state.token_lifetime,
        ))
    }

    async fn classify(
        &self,
        image: &[u8],
        _token: &AccessToken,
    ) -> ClassificationResult<Vec<RecognizedLabel>> {
        let mut state = self.write();
        state.classifications += 1;
        if let Some(error) = state.next_failure.take() {
            return Err(error);
        }
        Ok(state.catalog.get(image).cloned().unwrap_or_default())
    }
}
