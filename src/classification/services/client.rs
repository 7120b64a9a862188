//! Token-caching client over the classifier port.

use crate::classification::{
    domain::{
        AccessToken, ClassificationError, ClassificationResult, ClassifierCredentials,
        RecognizedLabel, rank_labels,
    },
    ports::ImageClassifier,
};
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Seconds subtracted from every token lifetime.
const DEFAULT_SAFETY_MARGIN_SECS: i64 = 300;

/// Token together with the credentials it was issued for.
struct CachedToken {
    credentials: ClassifierCredentials,
    token: AccessToken,
}

/// Classification client that caches access tokens in memory.
///
/// A token is reused until `issued_at + lifetime - safety_margin`, and only
/// for the credentials it was issued for; after that, or when the service
/// rejects it, the next call authenticates again.
pub struct ClassificationClient<K, C>
where
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    classifier: Arc<K>,
    clock: Arc<C>,
    credentials: RwLock<Option<ClassifierCredentials>>,
    cached_token: Mutex<Option<CachedToken>>,
    safety_margin: TimeDelta,
}

impl<K, C> ClassificationClient<K, C>
where
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    /// Creates a client without credentials.
    #[must_use]
    pub fn new(classifier: Arc<K>, clock: Arc<C>) -> Self {
        Self {
            classifier,
            clock,
            credentials: RwLock::new(None),
            cached_token: Mutex::new(None),
            safety_margin: TimeDelta::seconds(DEFAULT_SAFETY_MARGIN_SECS),
        }
    }

    /// Sets the credentials used by [`Self::recognize`].
    #[must_use]
    pub fn with_credentials(mut self, credentials: ClassifierCredentials) -> Self {
        self.credentials = RwLock::new(Some(credentials));
        self
    }

    /// Overrides the safety margin subtracted from token lifetimes.
    #[must_use]
    pub fn with_safety_margin(mut self, margin: TimeDelta) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Replaces the configured credentials and drops any cached token.
    pub async fn update_credentials(&self, credentials: Option<ClassifierCredentials>) {
        *self.credentials.write().await = credentials;
        self.invalidate_token().await;
        info!("classification credentials updated");
    }

    /// Returns `true` when complete credentials are configured.
    pub async fn is_configured(&self) -> bool {
        self.credentials
            .read()
            .await
            .as_ref()
            .is_some_and(ClassifierCredentials::is_complete)
    }

    /// Drops the cached token so the next call authenticates again.
    pub async fn invalidate_token(&self) {
        self.cached_token.lock().await.take();
    }

    /// Returns a valid token, authenticating only when none is cached for
    /// `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::CredentialsMissing`] for incomplete
    /// credentials without contacting the service, otherwise whatever the
    /// classifier port reports.
    pub async fn authenticate(
        &self,
        credentials: &ClassifierCredentials,
    ) -> ClassificationResult<AccessToken> {
        if !credentials.is_complete() {
            return Err(ClassificationError::CredentialsMissing);
        }
        let mut cached = self.cached_token.lock().await;
        let now = self.clock.utc();
        if let Some(entry) = cached
            .as_ref()
            .filter(|entry| entry.credentials == *credentials && entry.token.is_valid_at(now))
        {
            return Ok(entry.token.clone());
        }

        debug!("requesting a new classification access token");
        let issued = self.classifier.authenticate(credentials).await?;
        let token = issued.into_access_token(self.clock.utc(), self.safety_margin);
        *cached = Some(CachedToken {
            credentials: credentials.clone(),
            token: token.clone(),
        });
        Ok(token)
    }

    /// Recognises labels in an image, ranked by descending score.
    ///
    /// # Errors
    ///
    /// Propagates classifier port errors.
    pub async fn classify(
        &self,
        image: &[u8],
        token: &AccessToken,
    ) -> ClassificationResult<Vec<RecognizedLabel>> {
        let mut labels = self.classifier.classify(image, token).await?;
        rank_labels(&mut labels);
        Ok(labels)
    }

    /// Authenticates with the configured credentials and classifies.
    ///
    /// A token rejected by the service is dropped and the call is retried
    /// once with a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::CredentialsMissing`] when no complete
    /// credentials are configured, otherwise the classifier's error.
    pub async fn recognize(&self, image: &[u8]) -> ClassificationResult<Vec<RecognizedLabel>> {
        let credentials = self
            .credentials
            .read()
            .await
            .clone()
            .filter(ClassifierCredentials::is_complete)
            .ok_or(ClassificationError::CredentialsMissing)?;

        let token = self.authenticate(&credentials).await?;
        match self.classify(image, &token).await {
            Err(ClassificationError::AuthenticationFailed(reason)) => {
                warn!(%reason, "access token rejected, re-authenticating");
                self.invalidate_token().await;
                let fresh = self.authenticate(&credentials).await?;
                self.classify(image, &fresh).await
            }
            other => other,
        }
    }
}
