//! Bearer tokens issued by the classification service.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// A token exactly as issued, with the lifetime the service stated.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    value: String,
    lifetime: TimeDelta,
}

impl IssuedToken {
    /// Creates an issued token.
    #[must_use]
    pub fn new(value: impl Into<String>, lifetime: TimeDelta) -> Self {
        Self {
            value: value.into(),
            lifetime,
        }
    }

    /// Returns the lifetime stated by the service.
    #[must_use]
    pub const fn lifetime(&self) -> TimeDelta {
        self.lifetime
    }

    /// Converts the issued token into a cached token.
    ///
    /// The expiry is `issued_at + lifetime - safety_margin`, never earlier
    /// than `issued_at`.
    #[must_use]
    pub fn into_access_token(self, issued_at: DateTime<Utc>, safety_margin: TimeDelta) -> AccessToken {
        let usable = (self.lifetime - safety_margin).max(TimeDelta::zero());
        AccessToken {
            value: self.value,
            expires_at: issued_at + usable,
        }
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// A bearer token with its local expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates an access token that expires at the given instant.
    #[must_use]
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Returns the bearer value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the local expiry instant.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns `true` while the token may still be used.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
