//! Request gate.
//!
//! Decides, per viewer request, whether it continues to the origin or is
//! answered with the fixed 403. Paths without the protected marker always
//! pass. Protected paths need a valid access token.
//!
//! This is the only place an `AuthError` becomes a [`ValidationOutcome`].
//! Validation runs in its own task so that even a panic inside a
//! collaborator comes back as `UnexpectedFailure` instead of unwinding into
//! the edge handler.

pub mod event;
pub mod request;

pub use event::{EventError, ViewerRequestEvent};
pub use request::{DenialResponse, EdgeRequest, GateDecision, HeaderEntry};

use crate::auth::cache::KeySetCache;
use crate::auth::validator::TokenValidator;
use crate::config::Config;
use crate::errors::{Rejection, ValidationOutcome};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Optional scheme prefix on the token header value.
const BEARER_PREFIX: &str = "Bearer ";

/// Whether a path requires a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Unprotected,
    Protected,
}

/// Allow/deny orchestrator in front of the token validator.
pub struct RequestGate {
    validator: Arc<TokenValidator>,
    protected_path_marker: String,
    token_header: String,
}

impl RequestGate {
    /// Create a gate.
    ///
    /// # Arguments
    ///
    /// * `validator` - Token validator (owns the key-set cache)
    /// * `protected_path_marker` - Substring that marks a path as protected
    /// * `token_header` - Header carrying the access token
    pub fn new(
        validator: Arc<TokenValidator>,
        protected_path_marker: impl Into<String>,
        token_header: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            protected_path_marker: protected_path_marker.into(),
            token_header: token_header.into().to_ascii_lowercase(),
        }
    }

    /// Build a gate that fetches keys from the configured identity provider.
    pub fn from_config(config: &Config, cache: Arc<KeySetCache>) -> Self {
        Self::new(
            Arc::new(TokenValidator::from_config(config, cache)),
            config.protected_path_marker.clone(),
            config.token_header.clone(),
        )
    }

    /// Protected iff the path contains the marker.
    pub fn classify(&self, uri: &str) -> PathState {
        if uri.contains(&self.protected_path_marker) {
            PathState::Protected
        } else {
            PathState::Unprotected
        }
    }

    /// The access token carried by the request, if any.
    ///
    /// Reads the first value of the token header and strips an optional
    /// `Bearer ` prefix. A blank value counts as no token.
    pub fn extract_token<'a>(&self, request: &'a EdgeRequest) -> Option<&'a str> {
        let value = request.header(&self.token_header)?.trim();
        let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Produce exactly one outcome for a request.
    #[instrument(skip_all, fields(uri = %request.uri))]
    pub async fn evaluate(&self, request: &EdgeRequest) -> ValidationOutcome {
        if self.classify(&request.uri) == PathState::Unprotected {
            tracing::debug!(target: "gate.request", "Unprotected path, forwarding");
            return ValidationOutcome::Valid;
        }

        let start = Instant::now();
        let outcome = match self.extract_token(request) {
            None => ValidationOutcome::Rejected(Rejection::NoToken),
            Some(token) => self.validate_isolated(token.to_string()).await,
        };
        metrics::record_validation(&outcome, start.elapsed());

        match outcome {
            ValidationOutcome::Valid => {
                tracing::debug!(target: "gate.request", "Access granted");
            }
            ValidationOutcome::Rejected(Rejection::UnexpectedFailure) => {
                tracing::warn!(
                    target: "gate.request",
                    reason = Rejection::UnexpectedFailure.as_str(),
                    "Access denied"
                );
            }
            ValidationOutcome::Rejected(rejection) => {
                tracing::info!(target: "gate.request", reason = rejection.as_str(), "Access denied");
            }
        }

        outcome
    }

    /// Forward the request unchanged, or deny it with the fixed response.
    pub async fn handle(&self, request: EdgeRequest) -> GateDecision {
        if self.evaluate(&request).await.is_valid() {
            GateDecision::Forward(request)
        } else {
            GateDecision::Deny(DenialResponse::forbidden())
        }
    }

    async fn validate_isolated(&self, token: String) -> ValidationOutcome {
        let validator = Arc::clone(&self.validator);
        let task = tokio::spawn(async move { validator.validate(&token).await.map(|_| ()) });

        match task.await {
            Ok(result) => ValidationOutcome::from(result),
            Err(join_error) => {
                if join_error.is_panic() {
                    tracing::error!(target: "gate.request", "Token validation panicked");
                } else {
                    tracing::error!(target: "gate.request", error = %join_error, "Token validation task cancelled");
                }
                ValidationOutcome::Rejected(Rejection::UnexpectedFailure)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::claims::{ClaimsValidator, FixedClock};
    use crate::auth::jwks::mock::MockKeySetSource;
    use crate::auth::jwks::KeySet;
    use crate::auth::resolver::KeyResolver;
    use crate::auth::rsa::{RsaPublicKey, SignatureVerifier};
    use crate::errors::AuthError;
    use chrono::Utc;
    use gate_test_utils::{TestRsaKey, TestTokenBuilder, TEST_CLIENT_ID, TEST_ISSUER};

    fn validator_with(source: MockKeySetSource) -> TokenValidator {
        let resolver = KeyResolver::new(Arc::new(KeySetCache::new()), Arc::new(source));
        let claims = ClaimsValidator::new(
            TEST_CLIENT_ID,
            TEST_ISSUER,
            Arc::new(FixedClock(Utc::now().timestamp())),
        );
        TokenValidator::new(resolver, claims)
    }

    fn primary_set() -> KeySet {
        KeySet::new(vec![
            serde_json::from_value(TestRsaKey::primary().jwk_json()).unwrap()
        ])
    }

    fn gate() -> RequestGate {
        let validator = validator_with(MockKeySetSource::serving(primary_set()));
        RequestGate::new(Arc::new(validator), "images/", "auth")
    }

    fn valid_token() -> String {
        TestTokenBuilder::new().sign_with(&TestRsaKey::primary())
    }

    #[test]
    fn test_classify_substring() {
        let gate = gate();

        assert_eq!(gate.classify("/images/cat.png"), PathState::Protected);
        assert_eq!(gate.classify("/static/images/x/y.jpg"), PathState::Protected);
        assert_eq!(gate.classify("/index.html"), PathState::Unprotected);
        assert_eq!(gate.classify("/images"), PathState::Unprotected);
        assert_eq!(gate.classify("/"), PathState::Unprotected);
    }

    #[test]
    fn test_extract_token() {
        let gate = gate();

        let plain = EdgeRequest::new("/images/a").with_header("auth", "abc.def.ghi");
        assert_eq!(gate.extract_token(&plain), Some("abc.def.ghi"));

        let bearer = EdgeRequest::new("/images/a").with_header("Auth", "Bearer abc.def.ghi");
        assert_eq!(gate.extract_token(&bearer), Some("abc.def.ghi"));

        let blank = EdgeRequest::new("/images/a").with_header("auth", "  ");
        assert_eq!(gate.extract_token(&blank), None);

        let bare_scheme = EdgeRequest::new("/images/a").with_header("auth", "Bearer ");
        assert_eq!(gate.extract_token(&bare_scheme), None);

        let other_header = EdgeRequest::new("/images/a").with_header("user-id", "abc.def.ghi");
        assert_eq!(gate.extract_token(&other_header), None);
    }

    #[test]
    fn test_token_header_name_is_case_insensitive() {
        let validator = validator_with(MockKeySetSource::serving(primary_set()));
        let gate = RequestGate::new(Arc::new(validator), "images/", "X-Access-Token");
        let request = EdgeRequest::new("/images/a").with_header("x-access-token", "t");

        assert_eq!(gate.extract_token(&request), Some("t"));
    }

    #[tokio::test]
    async fn test_unprotected_path_forwards_without_token() {
        let gate = gate();
        let request = EdgeRequest::new("/css/site.css");

        assert_eq!(gate.evaluate(&request).await, ValidationOutcome::Valid);
        assert_eq!(gate.handle(request.clone()).await, GateDecision::Forward(request));
    }

    #[tokio::test]
    async fn test_unprotected_path_ignores_garbage_token() {
        let gate = gate();
        let request = EdgeRequest::new("/about").with_header("auth", "garbage");

        assert!(gate.handle(request).await.is_forward());
    }

    #[tokio::test]
    async fn test_protected_without_token_is_no_token() {
        let gate = gate();
        let request = EdgeRequest::new("/images/cat.png");

        assert_eq!(
            gate.evaluate(&request).await,
            ValidationOutcome::Rejected(Rejection::NoToken)
        );
        assert_eq!(
            gate.handle(request).await,
            GateDecision::Deny(DenialResponse::forbidden())
        );
    }

    #[tokio::test]
    async fn test_protected_with_valid_token_forwards_unchanged() {
        let gate = gate();
        let request = EdgeRequest::new("/images/cat.png").with_header("auth", valid_token());

        assert_eq!(
            gate.handle(request.clone()).await,
            GateDecision::Forward(request)
        );
    }

    #[tokio::test]
    async fn test_protected_with_malformed_token() {
        let gate = gate();
        let request = EdgeRequest::new("/images/cat.png").with_header("auth", "not-a-token");

        assert_eq!(
            gate.evaluate(&request).await,
            ValidationOutcome::Rejected(Rejection::MalformedToken)
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_unexpected_failure() {
        let gate = RequestGate::new(
            Arc::new(validator_with(MockKeySetSource::failing())),
            "images/",
            "auth",
        );
        let request = EdgeRequest::new("/images/cat.png").with_header("auth", valid_token());

        assert_eq!(
            gate.evaluate(&request).await,
            ValidationOutcome::Rejected(Rejection::UnexpectedFailure)
        );
    }

    struct PanickingVerifier;

    impl SignatureVerifier for PanickingVerifier {
        #[allow(clippy::panic)]
        fn verify(&self, _: &RsaPublicKey, _: &[u8], _: &[u8]) -> Result<(), AuthError> {
            panic!("verifier blew up");
        }
    }

    #[tokio::test]
    async fn test_panicking_collaborator_is_contained() {
        let validator = validator_with(MockKeySetSource::serving(primary_set()))
            .with_verifier(Arc::new(PanickingVerifier));
        let gate = RequestGate::new(Arc::new(validator), "images/", "auth");
        let request = EdgeRequest::new("/images/cat.png").with_header("auth", valid_token());

        assert_eq!(
            gate.evaluate(&request).await,
            ValidationOutcome::Rejected(Rejection::UnexpectedFailure)
        );
        assert_eq!(
            gate.handle(request).await,
            GateDecision::Deny(DenialResponse::forbidden())
        );
    }

    #[tokio::test]
    async fn test_denial_is_identical_for_every_reason() {
        let gate = gate();
        let key = TestRsaKey::primary();
        let tokens = [
            "a.b".to_string(),
            TestTokenBuilder::new().expires_in(-10).sign_with(&key),
            TestTokenBuilder::new().client_id("other").sign_with(&key),
            TestTokenBuilder::new().sign_with(&TestRsaKey::rotated()),
        ];

        for token in tokens {
            let request = EdgeRequest::new("/images/cat.png").with_header("auth", token);
            let decision = serde_json::to_value(gate.handle(request).await).unwrap();
            assert_eq!(
                decision,
                serde_json::json!({
                    "status": "403",
                    "statusDescription": "Forbidden",
                    "body": "Unauthorized access."
                })
            );
        }
    }
}
