//! Access-token validation pipeline.
//!
//! # Security Checks
//!
//! 1. Size and shape check - oversized or non three-segment tokens are
//!    rejected before any network or crypto work
//! 2. Header algorithm must be RS256, checked before key resolution so a
//!    forged `alg` never costs a JWKS fetch
//! 3. Key resolved by `kid` (cache, then exactly one refresh)
//! 4. Key type and algorithm must be RSA / RS256
//! 5. RS256 signature over the raw `header.payload` text
//! 6. Audience, issuer and expiration

use crate::auth::cache::KeySetCache;
use crate::auth::claims::{Claims, ClaimsValidator, Clock, SystemClock};
use crate::auth::jwks::{JwksFetcher, KeySetSource};
use crate::auth::resolver::KeyResolver;
use crate::auth::rsa::{
    ensure_supported_algorithm, ensure_supported_key, Rs256Verifier, RsaPublicKey,
    SignatureVerifier,
};
use crate::auth::token::parse_token;
use crate::config::Config;
use crate::errors::AuthError;
use std::sync::Arc;
use tracing::instrument;

/// Validates access tokens against the identity provider's published keys.
pub struct TokenValidator {
    resolver: KeyResolver,
    verifier: Arc<dyn SignatureVerifier>,
    claims_validator: ClaimsValidator,
}

impl TokenValidator {
    /// Create a validator using the RS256 verifier.
    pub fn new(resolver: KeyResolver, claims_validator: ClaimsValidator) -> Self {
        Self {
            resolver,
            verifier: Arc::new(Rs256Verifier),
            claims_validator,
        }
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Build a validator from configuration with an explicit key source and
    /// clock.
    pub fn with_source(
        config: &Config,
        cache: Arc<KeySetCache>,
        source: Arc<dyn KeySetSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = KeyResolver::new(cache, source);
        let claims_validator =
            ClaimsValidator::new(config.client_id.clone(), config.issuer(), clock);
        Self::new(resolver, claims_validator)
    }

    /// Build a validator that fetches keys from the configured JWKS URL.
    ///
    /// # Arguments
    ///
    /// * `config` - Deployment configuration (pool, client, timeouts)
    /// * `cache` - Process-wide key-set cache shared across requests
    pub fn from_config(config: &Config, cache: Arc<KeySetCache>) -> Self {
        let fetcher = JwksFetcher::new(config.jwks_url(), config.jwks_fetch_timeout);
        Self::with_source(config, cache, Arc::new(fetcher), Arc::new(SystemClock))
    }

    #[cfg(test)]
    pub(crate) fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first check that fails. Only
    /// `JwksUnavailable` and `InvalidKeyMaterial` are infrastructure faults;
    /// every other variant is an ordinary rejection.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let parsed = parse_token(token)?;

        ensure_supported_algorithm(&parsed.header.alg)?;

        let jwk = self.resolver.resolve(&parsed.header.kid).await?;
        ensure_supported_key(&jwk)?;

        let public_key = RsaPublicKey::from_jwk(&jwk)?;
        self.verifier
            .verify(&public_key, parsed.signing_input(), &parsed.signature)?;

        let claims = Claims::from_payload(parsed.payload)?;
        self.claims_validator.validate(&claims)?;

        tracing::debug!(target: "gate.auth.validator", kid = %jwk.kid, "Token validated successfully");
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::claims::FixedClock;
    use crate::auth::jwks::mock::MockKeySetSource;
    use crate::auth::jwks::{Jwk, KeySet};
    use chrono::Utc;
    use gate_test_utils::{
        forge_token, tamper_payload, TestRsaKey, TestTokenBuilder, TEST_CLIENT_ID, TEST_ISSUER,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls, then defers to the real verifier.
    struct CountingVerifier {
        calls: AtomicUsize,
    }

    impl CountingVerifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SignatureVerifier for CountingVerifier {
        fn verify(
            &self,
            key: &RsaPublicKey,
            message: &[u8],
            signature: &[u8],
        ) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Rs256Verifier.verify(key, message, signature)
        }
    }

    fn jwk(key: &TestRsaKey) -> Jwk {
        serde_json::from_value(key.jwk_json()).unwrap()
    }

    fn key_set(keys: &[&TestRsaKey]) -> KeySet {
        KeySet::new(keys.iter().map(|k| jwk(k)).collect())
    }

    struct Harness {
        validator: TokenValidator,
        source: Arc<MockKeySetSource>,
        verifier: Arc<CountingVerifier>,
    }

    fn harness_with(source: MockKeySetSource) -> Harness {
        let source = Arc::new(source);
        let verifier = CountingVerifier::new();
        let resolver = KeyResolver::new(Arc::new(KeySetCache::new()), source.clone());
        let claims = ClaimsValidator::new(
            TEST_CLIENT_ID,
            TEST_ISSUER,
            Arc::new(FixedClock(Utc::now().timestamp())),
        );
        let validator = TokenValidator::new(resolver, claims).with_verifier(verifier.clone());
        Harness {
            validator,
            source,
            verifier,
        }
    }

    fn harness() -> Harness {
        harness_with(MockKeySetSource::serving(key_set(&[&TestRsaKey::primary()])))
    }

    #[tokio::test]
    async fn test_valid_token() {
        let h = harness();
        let token = TestTokenBuilder::new().sign_with(&TestRsaKey::primary());

        let claims = h.validator.validate(&token).await.unwrap();

        assert_eq!(claims.audience(), Some(TEST_CLIENT_ID));
        assert_eq!(claims.token_use.as_deref(), Some("access"));
        assert_eq!(h.source.fetch_count(), 1);
        assert_eq!(h.verifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_validation_uses_cache() {
        let h = harness();
        let token = TestTokenBuilder::new().sign_with(&TestRsaKey::primary());

        h.validator.validate(&token).await.unwrap();
        h.validator.validate(&token).await.unwrap();

        assert_eq!(h.source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_token_makes_no_fetch() {
        let h = harness();

        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.@@@.###"] {
            assert_eq!(
                h.validator.validate(token).await.unwrap_err(),
                AuthError::MalformedToken,
                "token '{}'",
                token
            );
        }

        assert_eq!(h.source.fetch_count(), 0);
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_hs256_header_rejected_without_fetch_or_crypto() {
        let h = harness();
        let payload = TestTokenBuilder::new().build();
        let token = forge_token(
            &json!({"alg": "HS256", "kid": TestRsaKey::primary().kid}),
            &payload,
            b"hmac-over-public-key",
        );

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::UnsupportedAlgorithm
        );
        assert_eq!(h.source.fetch_count(), 0);
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_alg_none_rejected() {
        let h = harness();
        let token = forge_token(
            &json!({"alg": "none", "kid": TestRsaKey::primary().kid}),
            &TestTokenBuilder::new().build(),
            b"x",
        );

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::UnsupportedAlgorithm
        );
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_key_with_wrong_algorithm_rejected_before_crypto() {
        let primary = TestRsaKey::primary();
        let mut published = jwk(&primary);
        published.alg = Some("RS512".to_string());
        let h = harness_with(MockKeySetSource::serving(KeySet::new(vec![published])));
        let token = TestTokenBuilder::new().sign_with(&primary);

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::UnsupportedAlgorithm
        );
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_key_with_wrong_type_rejected() {
        let primary = TestRsaKey::primary();
        let mut published = jwk(&primary);
        published.kty = "EC".to_string();
        let h = harness_with(MockKeySetSource::serving(KeySet::new(vec![published])));
        let token = TestTokenBuilder::new().sign_with(&primary);

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::UnsupportedAlgorithm
        );
    }

    #[tokio::test]
    async fn test_unknown_kid() {
        let h = harness();
        let token = TestTokenBuilder::new().sign_with(&TestRsaKey::rotated());

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::SigningKeyNotFound
        );
        assert_eq!(h.source.fetch_count(), 1);
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_rotation_resolved_with_one_refresh() {
        let primary = TestRsaKey::primary();
        let rotated = TestRsaKey::rotated();
        let h = harness_with(MockKeySetSource::with_responses(vec![
            Ok(key_set(&[&primary])),
            Ok(key_set(&[&primary, &rotated])),
        ]));

        h.validator
            .validate(&TestTokenBuilder::new().sign_with(&primary))
            .await
            .unwrap();
        h.validator
            .validate(&TestTokenBuilder::new().sign_with(&rotated))
            .await
            .unwrap();

        assert_eq!(h.source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_tampered_payload_is_invalid_signature() {
        let h = harness();
        let token = TestTokenBuilder::new().sign_with(&TestRsaKey::primary());
        let tampered = tamper_payload(
            &token,
            &TestTokenBuilder::new().claim("username", json!("admin")).build(),
        );

        assert_eq!(
            h.validator.validate(&tampered).await.unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn test_signed_by_other_key_under_known_kid() {
        let h = harness();
        let impostor = TestRsaKey::rotated().with_kid(&TestRsaKey::primary().kid);
        let token = TestTokenBuilder::new().sign_with(&impostor);

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn test_claims_checked_after_signature() {
        let h = harness();
        let key = TestRsaKey::primary();

        let wrong_audience = TestTokenBuilder::new().client_id("other").sign_with(&key);
        assert_eq!(
            h.validator.validate(&wrong_audience).await.unwrap_err(),
            AuthError::InvalidAudience
        );

        let wrong_issuer = TestTokenBuilder::new()
            .issuer("https://evil.example.com/pool")
            .sign_with(&key);
        assert_eq!(
            h.validator.validate(&wrong_issuer).await.unwrap_err(),
            AuthError::InvalidIssuer
        );

        let expired = TestTokenBuilder::new().expires_in(-60).sign_with(&key);
        assert_eq!(
            h.validator.validate(&expired).await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn test_signed_payload_without_exp_is_malformed() {
        let h = harness();
        let token = TestTokenBuilder::new()
            .without("exp")
            .sign_with(&TestRsaKey::primary());

        assert_eq!(
            h.validator.validate(&token).await.unwrap_err(),
            AuthError::MalformedToken
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_infrastructure_fault() {
        let h = harness_with(MockKeySetSource::failing());
        let token = TestTokenBuilder::new().sign_with(&TestRsaKey::primary());

        let err = h.validator.validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::JwksUnavailable(_)));
    }

    #[tokio::test]
    async fn test_from_config_starts_with_cold_cache() {
        let vars = std::collections::HashMap::from([
            ("COGNITO_USER_POOL_ID".to_string(), "us-west-2_abc".to_string()),
            ("COGNITO_CLIENT_ID".to_string(), "client".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        let validator = TokenValidator::from_config(&config, Arc::new(KeySetCache::new()));

        assert!(validator.resolver().cache().get().await.is_none());
    }
}
