//! Endpoint and transport settings for the HTTP classifier.

use std::time::Duration;

const DEFAULT_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
const DEFAULT_CLASSIFY_URL: &str =
    "https://aip.baidubce.com/rest/2.0/image-classify/v2/advanced_general";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_LABELS: usize = 15;

const TOKEN_URL_VAR: &str = "PROOFGATE_CLASSIFIER_TOKEN_URL";
const CLASSIFY_URL_VAR: &str = "PROOFGATE_CLASSIFIER_CLASSIFY_URL";
const TIMEOUT_VAR: &str = "PROOFGATE_CLASSIFIER_TIMEOUT_SECS";
const MAX_LABELS_VAR: &str = "PROOFGATE_CLASSIFIER_MAX_LABELS";

/// Settings for [`super::HttpImageClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierSettings {
    token_url: String,
    classify_url: String,
    request_timeout: Duration,
    max_labels: usize,
}

impl ClassifierSettings {
    /// Creates settings pointing at the given endpoints with default limits.
    #[must_use]
    pub fn new(token_url: impl Into<String>, classify_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            classify_url: classify_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_labels: DEFAULT_MAX_LABELS,
        }
    }

    /// Builds settings from the defaults overridden by environment variables.
    ///
    /// Recognised variables are `PROOFGATE_CLASSIFIER_TOKEN_URL`,
    /// `PROOFGATE_CLASSIFIER_CLASSIFY_URL`,
    /// `PROOFGATE_CLASSIFIER_TIMEOUT_SECS` and
    /// `PROOFGATE_CLASSIFIER_MAX_LABELS`. Unparseable numbers are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from the defaults overridden through a key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(url) = non_blank(lookup(TOKEN_URL_VAR)) {
            settings.token_url = url;
        }
        if let Some(url) = non_blank(lookup(CLASSIFY_URL_VAR)) {
            settings.classify_url = url;
        }
        if let Some(secs) = lookup(TIMEOUT_VAR).and_then(|raw| raw.trim().parse::<u64>().ok()) {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = lookup(MAX_LABELS_VAR).and_then(|raw| raw.trim().parse::<usize>().ok())
        {
            settings.max_labels = max;
        }
        settings
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum number of labels kept from one recognition call.
    #[must_use]
    pub const fn with_max_labels(mut self, max_labels: usize) -> Self {
        self.max_labels = max_labels;
        self
    }

    /// Returns the token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns the recognition endpoint URL.
    #[must_use]
    pub fn classify_url(&self) -> &str {
        &self.classify_url
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the maximum number of labels kept.
    #[must_use]
    pub const fn max_labels(&self) -> usize {
        self.max_labels
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_URL, DEFAULT_CLASSIFY_URL)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}
