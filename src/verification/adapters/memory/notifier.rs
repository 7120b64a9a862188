//! Notifier that records everything it is asked to show.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use crate::verification::{
    domain::{VerificationEvent, VerificationPrompt},
    ports::{Notifier, NotifierError, NotifierResult},
};

/// Thread-safe recording notifier.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<RwLock<Recorded>>,
}

#[derive(Debug, Default)]
struct Recorded {
    prompts: Vec<VerificationPrompt>,
    events: Vec<VerificationEvent>,
    announcements: Vec<String>,
    unavailable: bool,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes prompt and event delivery fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unavailable = unavailable;
    }

    /// Returns the prompts opened so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<VerificationPrompt> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .prompts
            .clone()
    }

    /// Returns the events emitted so far.
    #[must_use]
    pub fn events(&self) -> Vec<VerificationEvent> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    /// Returns the names of the events emitted so far.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .iter()
            .map(VerificationEvent::name)
            .collect()
    }

    /// Returns the announcements spoken so far.
    #[must_use]
    pub fn announcements(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .announcements
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn open_verification_prompt(&self, prompt: VerificationPrompt) -> NotifierResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.unavailable {
            return Err(NotifierError::Unavailable("recording disabled".to_owned()));
        }
        state.prompts.push(prompt);
        Ok(())
    }

    async fn emit(&self, event: VerificationEvent) -> NotifierResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.unavailable {
            return Err(NotifierError::Unavailable("recording disabled".to_owned()));
        }
        state.events.push(event);
        Ok(())
    }

    fn announce(&self, text: &str) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .announcements
            .push(text.to_owned());
    }
}
