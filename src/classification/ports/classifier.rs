//! Classifier port for token issue and image recognition.

use crate::classification::domain::{
    AccessToken, ClassificationResult, ClassifierCredentials, IssuedToken, RecognizedLabel,
};
use async_trait::async_trait;

/// Request/response contract of an external image-classification service.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Exchanges client credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::AuthenticationFailed`] when the service
    /// rejects the credentials or cannot be reached, and
    /// [`ClassificationError::MalformedResponse`] when the token payload
    /// cannot be understood.
    ///
    /// [`ClassificationError::AuthenticationFailed`]:
    ///     crate::classification::domain::ClassificationError::AuthenticationFailed
    /// [`ClassificationError::MalformedResponse`]:
    ///     crate::classification::domain::ClassificationError::MalformedResponse
    async fn authenticate(
        &self,
        credentials: &ClassifierCredentials,
    ) -> ClassificationResult<IssuedToken>;

    /// Submits raw image bytes and returns the recognised labels.
    ///
    /// Implementations need not rank the labels; callers sort by score.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::AuthenticationFailed`] when the token is
    /// rejected, [`ClassificationError::ClassificationUnavailable`] on
    /// network or service failure, and
    /// [`ClassificationError::MalformedResponse`] for unexpected payloads.
    ///
    /// [`ClassificationError::AuthenticationFailed`]:
    ///     crate::classification::domain::ClassificationError::AuthenticationFailed
    /// [`ClassificationError::ClassificationUnavailable`]:
    ///     crate::classification::domain::ClassificationError::ClassificationUnavailable
    /// [`ClassificationError::MalformedResponse`]:
    ///     crate::classification::domain::ClassificationError::MalformedResponse
    async fn classify(
        &self,
        image: &[u8],
        token: &AccessToken,
    ) -> ClassificationResult<Vec<RecognizedLabel>>;
}
