//! HTTP adapter for Baidu-compatible image classification endpoints.
//!
//! Tokens come from an OAuth client-credentials endpoint; recognition takes
//! a form-encoded, base64 image and answers with scored labels. Every
//! request is bounded by the configured timeout, and a timeout is reported
//! as a network failure rather than a verification failure.

mod settings;
mod wire;

pub use settings::ClassifierSettings;

use crate::classification::{
    domain::{
        AccessToken, ClassificationError, ClassificationResult, ClassifierCredentials,
        IssuedToken, RecognizedLabel, rank_labels,
    },
    ports::ImageClassifier,
};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use tracing::{debug, warn};
use wire::{ClassifyResponse, TokenResponse};

/// Number of body characters kept in error details.
const BODY_EXCERPT_CHARS: usize = 200;

/// reqwest-backed [`ImageClassifier`].
#[derive(Debug, Clone)]
pub struct HttpImageClassifier {
    client: Client,
    settings: ClassifierSettings,
}

impl HttpImageClassifier {
    /// Creates a classifier with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::ClassificationUnavailable`] when the
    /// HTTP client cannot be constructed.
    pub fn new(settings: ClassifierSettings) -> ClassificationResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| {
                ClassificationError::ClassificationUnavailable(format!(
                    "failed to build HTTP client: {err}"
                ))
            })?;
        Ok(Self { client, settings })
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }
}

#[async_trait]
impl ImageClassifier for HttpImageClassifier {
    async fn authenticate(
        &self,
        credentials: &ClassifierCredentials,
    ) -> ClassificationResult<IssuedToken> {
        let response = self
            .client
            .post(self.settings.token_url())
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.api_key()),
                ("client_secret", credentials.secret_key()),
            ])
            .send()
            .await
            .map_err(|err| ClassificationError::AuthenticationFailed(describe(&err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClassificationError::AuthenticationFailed(describe(&err)))?;
        if !status.is_success() {
            warn!(%status, "token endpoint rejected the request");
            return Err(ClassificationError::AuthenticationFailed(format!(
                "token endpoint returned HTTP {status}: {}",
                excerpt(&body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            ClassificationError::MalformedResponse(format!(
                "undecodable token payload ({err}): {}",
                excerpt(&body)
            ))
        })?;
        let issued = parsed.into_issued_token()?;
        debug!(
            lifetime_secs = issued.lifetime().num_seconds(),
            "obtained classification access token"
        );
        Ok(issued)
    }

    async fn classify(
        &self,
        image: &[u8],
        token: &AccessToken,
    ) -> ClassificationResult<Vec<RecognizedLabel>> {
        let encoded = STANDARD.encode(image);
        let response = self
            .client
            .post(self.settings.classify_url())
            .query(&[("access_token", token.value())])
            .form(&[("image", encoded.as_str())])
            .send()
            .await
            .map_err(|err| ClassificationError::ClassificationUnavailable(describe(&err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClassificationError::ClassificationUnavailable(describe(&err)))?;
        if !status.is_success() {
            warn!(%status, "recognition endpoint returned an error status");
            return Err(ClassificationError::ClassificationUnavailable(format!(
                "recognition endpoint returned HTTP {status}: {}",
                excerpt(&body)
            )));
        }

        let parsed: ClassifyResponse = serde_json::from_str(&body).map_err(|err| {
            ClassificationError::MalformedResponse(format!(
                "undecodable recognition payload ({err}): {}",
                excerpt(&body)
            ))
        })?;
        let log_id = parsed.log_id();
        let mut labels = parsed.into_labels()?;
        rank_labels(&mut labels);
        labels.truncate(self.settings.max_labels());
        debug!(?log_id, count = labels.len(), "image recognised");
        Ok(labels)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
