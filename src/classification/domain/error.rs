//! Error kinds raised along the classification path.

use thiserror::Error;

/// Result type for classification operations.
pub type ClassificationResult<T> = Result<T, ClassificationError>;

/// Failures raised while authenticating with or calling the classifier.
///
/// None of these are verification failures: the proof was never scored.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    /// No usable credentials are configured.
    #[error("image classification credentials are not configured")]
    CredentialsMissing,

    /// The service rejected the credentials or the token request failed.
    #[error("classification service authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The recognition call failed at the network or service level.
    #[error("classification service unavailable: {0}")]
    ClassificationUnavailable(String),

    /// The service answered with a payload of unexpected shape.
    #[error("malformed classification response: {0}")]
    MalformedResponse(String),
}

impl ClassificationError {
    /// Returns `true` when the operator may simply try again.
    ///
    /// Missing credentials need configuration first and malformed payloads
    /// are unlikely to fix themselves.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::ClassificationUnavailable(_)
        )
    }

    /// Returns operator-facing text describing how to recover.
    #[must_use]
    pub const fn remediation(&self) -> &'static str {
        match self {
            Self::CredentialsMissing => {
                "Image recognition is not configured. Add the classifier API key and secret key in settings."
            }
            Self::AuthenticationFailed(_) => {
                "Could not sign in to the image recognition service. Check the API key and secret key, then try again."
            }
            Self::ClassificationUnavailable(_) => {
                "The image recognition service could not be reached. Check the connection and submit the photo again."
            }
            Self::MalformedResponse(_) => {
                "The image recognition service returned an unexpected answer. Please try again later."
            }
        }
    }
}
