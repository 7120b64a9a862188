//! Wire payloads of the token and recognition endpoints.

use crate::classification::domain::{
    ClassificationError, ClassificationResult, IssuedToken, RecognizedLabel,
};
use chrono::TimeDelta;
use serde::Deserialize;

/// Error codes the recognition endpoint uses for invalid or expired tokens.
const TOKEN_REJECTED_CODES: [i64; 2] = [110, 111];

/// Token endpoint payload, either a token or an OAuth error.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    pub(super) fn into_issued_token(self) -> ClassificationResult<IssuedToken> {
        if let Some(error) = self.error {
            let description = self.error_description.unwrap_or_default();
            return Err(ClassificationError::AuthenticationFailed(format!(
                "{error}: {description}"
            )));
        }

        let token = self
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| malformed("token payload has no access_token"))?;
        let lifetime = self
            .expires_in
            .filter(|secs| *secs >= 0)
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| malformed("token payload has no usable expires_in"))?;
        Ok(IssuedToken::new(token, lifetime))
    }
}

/// Recognition endpoint payload, either results or a service error.
#[derive(Debug, Deserialize)]
pub(super) struct ClassifyResponse {
    log_id: Option<u64>,
    result: Option<Vec<WireLabel>>,
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    keyword: String,
    score: f64,
    root: Option<String>,
}

impl ClassifyResponse {
    pub(super) const fn log_id(&self) -> Option<u64> {
        self.log_id
    }

    pub(super) fn into_labels(self) -> ClassificationResult<Vec<RecognizedLabel>> {
        if let Some(code) = self.error_code {
            let message = self.error_msg.unwrap_or_default();
            let detail = format!("service error {code}: {message}");
            return Err(if TOKEN_REJECTED_CODES.contains(&code) {
                ClassificationError::AuthenticationFailed(detail)
            } else {
                ClassificationError::ClassificationUnavailable(detail)
            });
        }

        let results = self
            .result
            .ok_or_else(|| malformed("recognition payload has no result list"))?;
        Ok(results
            .into_iter()
            .map(|wire| {
                let label = RecognizedLabel::new(wire.keyword, wire.score);
                match wire.root {
                    Some(root) if !root.is_empty() => label.with_category(root),
                    _ => label,
                }
            })
            .collect())
    }
}

fn malformed(detail: &str) -> ClassificationError {
    ClassificationError::MalformedResponse(detail.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{ClassifyResponse, TokenResponse};
    use crate::classification::domain::ClassificationError;
    use chrono::TimeDelta;
    use rstest::rstest;

    fn token(json: &str) -> TokenResponse {
        serde_json::from_str(json).expect("token payload should decode")
    }

    fn classify(json: &str) -> ClassifyResponse {
        serde_json::from_str(json).expect("recognition payload should decode")
    }

    #[rstest]
    fn token_payload_yields_lifetime() {
        let issued = token(r#"{"access_token":"24.abc","expires_in":2592000}"#)
            .into_issued_token()
            .expect("token should be issued");
        assert_eq!(issued.lifetime(), TimeDelta::days(30));
    }

    #[rstest]
    fn oauth_error_is_authentication_failure() {
        let result = token(r#"{"error":"invalid_client","error_description":"unknown client id"}"#)
            .into_issued_token();
        assert_eq!(
            result,
            Err(ClassificationError::AuthenticationFailed(
                "invalid_client: unknown client id".to_owned()
            ))
        );
    }

    #[rstest]
    #[case(r#"{"expires_in":100}"#)]
    #[case(r#"{"access_token":"","expires_in":100}"#)]
    #[case(r#"{"access_token":"x"}"#)]
    #[case(r#"{"access_token":"x","expires_in":-5}"#)]
    fn incomplete_token_payload_is_malformed(#[case] json: &str) {
        assert!(matches!(
            token(json).into_issued_token(),
            Err(ClassificationError::MalformedResponse(_))
        ));
    }

    #[rstest]
    fn recognition_payload_maps_labels_and_roots() {
        let response = classify(
            r#"{"log_id":42,"result_num":2,"result":[
                {"keyword":"sink","score":0.81,"root":"商品-厨具"},
                {"keyword":"tap","score":0.4,"root":""}
            ]}"#,
        );
        assert_eq!(response.log_id(), Some(42));
        let labels = response.into_labels().expect("labels should decode");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.first().and_then(|l| l.category()), Some("商品-厨具"));
        assert_eq!(labels.get(1).and_then(|l| l.category()), None);
    }

    #[rstest]
    #[case(110, true)]
    #[case(111, true)]
    #[case(17, false)]
    fn service_error_codes(#[case] code: i64, #[case] token_rejected: bool) {
        let json = format!(r#"{{"error_code":{code},"error_msg":"nope"}}"#);
        let result = classify(&json).into_labels();
        if token_rejected {
            assert!(matches!(result, Err(ClassificationError::AuthenticationFailed(_))));
        } else {
            assert!(matches!(
                result,
                Err(ClassificationError::ClassificationUnavailable(_))
            ));
        }
    }

    #[rstest]
    fn missing_result_list_is_malformed() {
        assert!(matches!(
            classify(r#"{"log_id":1}"#).into_labels(),
            Err(ClassificationError::MalformedResponse(_))
        ));
    }
}
