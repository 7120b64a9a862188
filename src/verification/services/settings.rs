//! Tunables for the verification services.

use chrono::TimeDelta;
use std::time::Duration;

/// Timing and retry settings for the verification engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationSettings {
    /// How often active tasks are scanned for boundary crossings.
    pub poll_interval: Duration,
    /// Countdown tick resolution.
    pub tick_interval: Duration,
    /// Countdown length for checkpoints a task leaves unconfigured.
    pub start_window: TimeDelta,
    /// How long before the scheduled end the completion reminder fires.
    pub reminder_lead: TimeDelta,
    /// Attempts made to persist a checkpoint change before giving up.
    pub persistence_attempts: u32,
    /// Pause between persistence attempts.
    pub persistence_retry_delay: Duration,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            tick_interval: Duration::from_secs(1),
            start_window: TimeDelta::seconds(120),
            reminder_lead: TimeDelta::minutes(5),
            persistence_attempts: 3,
            persistence_retry_delay: Duration::from_millis(50),
        }
    }
}

impl VerificationSettings {
    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the countdown tick interval.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Overrides the default checkpoint window.
    #[must_use]
    pub const fn with_start_window(mut self, window: TimeDelta) -> Self {
        self.start_window = window;
        self
    }

    /// Overrides the completion reminder lead time.
    #[must_use]
    pub const fn with_reminder_lead(mut self, lead: TimeDelta) -> Self {
        self.reminder_lead = lead;
        self
    }

    /// Overrides the persistence retry policy. At least one attempt is made.
    #[must_use]
    pub const fn with_persistence_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.persistence_attempts = if attempts == 0 { 1 } else { attempts };
        self.persistence_retry_delay = delay;
        self
    }
}
