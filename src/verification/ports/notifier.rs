//! Operator notification port.

use crate::verification::domain::{VerificationEvent, VerificationPrompt};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for notifier operations.
pub type NotifierResult<T> = Result<T, NotifierError>;

/// Surface that puts prompts, feedback and speech in front of the operator.
///
/// Delivery is best effort; callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Asks the operator for a proof photo.
    async fn open_verification_prompt(&self, prompt: VerificationPrompt) -> NotifierResult<()>;

    /// Publishes a lifecycle event.
    async fn emit(&self, event: VerificationEvent) -> NotifierResult<()>;

    /// Speaks `text` aloud. Fire-and-forget.
    fn announce(&self, text: &str);
}

/// Errors returned by notifier implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifierError {
    /// Nothing is listening.
    #[error("notification surface unavailable: {0}")]
    Unavailable(String),
}
