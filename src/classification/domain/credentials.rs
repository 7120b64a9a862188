//! Client credentials for the classification service.

use std::fmt;

/// Environment variable holding the classification API key.
const API_KEY_VAR: &str = "PROOFGATE_CLASSIFIER_API_KEY";
/// Environment variable holding the classification secret key.
const SECRET_KEY_VAR: &str = "PROOFGATE_CLASSIFIER_SECRET_KEY";

/// API key and secret used to obtain classification access tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct ClassifierCredentials {
    api_key: String,
    secret_key: String,
}

impl ClassifierCredentials {
    /// Creates credentials from an API key and secret key.
    ///
    /// Surrounding whitespace is trimmed from both values.
    #[must_use]
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_owned(),
            secret_key: secret_key.into().trim().to_owned(),
        }
    }

    /// Reads credentials from `PROOFGATE_CLASSIFIER_API_KEY` and
    /// `PROOFGATE_CLASSIFIER_SECRET_KEY`.
    ///
    /// Returns `None` unless both variables are set and non-blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through an arbitrary key lookup.
    ///
    /// Returns `None` unless both keys resolve to non-blank values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup(API_KEY_VAR)?;
        let secret_key = lookup(SECRET_KEY_VAR)?;
        let credentials = Self::new(api_key, secret_key);
        credentials.is_complete().then_some(credentials)
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Returns `true` when both the key and the secret are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl fmt::Debug for ClassifierCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.api_key.chars().take(4).collect();
        f.debug_struct("ClassifierCredentials")
            .field("api_key", &format_args!("{prefix}…"))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
