//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating signed, forged and tampered access
//! tokens.

use crate::crypto_fixtures::TestRsaKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, Header};
use serde_json::{json, Map, Value};

/// Region of the test user pool.
pub const TEST_REGION: &str = "us-west-2";

/// Test user pool ID.
pub const TEST_USER_POOL_ID: &str = "us-west-2_TestPool1";

/// App client ID tokens are issued to.
pub const TEST_CLIENT_ID: &str = "test-client-id-123";

/// Issuer of the test user pool on the real identity provider host.
pub const TEST_ISSUER: &str = "https://cognito-idp.us-west-2.amazonaws.com/us-west-2_TestPool1";

/// Builder for creating test access-token claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .issuer(&idp.issuer())
///     .expires_in(60)
///     .sign_with(&TestRsaKey::primary());
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee"));
        claims.insert("client_id".to_string(), json!(TEST_CLIENT_ID));
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("token_use".to_string(), json!("access"));
        claims.insert("scope".to_string(), json!("aws.cognito.signin.user.admin"));
        claims.insert("auth_time".to_string(), json!(now.timestamp()));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("username".to_string(), json!("test-user"));
        Self { claims }
    }

    /// Set the client the token was issued to
    pub fn client_id(self, client_id: &str) -> Self {
        self.claim("client_id", json!(client_id))
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim("exp", json!(timestamp))
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with RS256 under the key's ID
    pub fn sign_with(self, key: &TestRsaKey) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid.clone());
        jsonwebtoken::encode(&header, &self.build(), &key.encoding_key())
            .expect("RS256 encoding with fixture key should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a token from arbitrary parts without signing anything.
///
/// Used to build tokens with hostile headers (`alg: HS256`, `alg: none`,
/// missing `kid`) or garbage signatures.
pub fn forge_token(header: &Value, payload: &Value, signature: &[u8]) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(payload.to_string()),
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Replace a signed token's payload, keeping its header and signature.
pub fn tamper_payload(token: &str, payload: &Value) -> String {
    let mut parts = token.split('.');
    let header = parts.next().expect("token should have a header segment");
    let _ = parts.next().expect("token should have a payload segment");
    let signature = parts.next().expect("token should have a signature segment");
    format!(
        "{}.{}.{}",
        header,
        URL_SAFE_NO_PAD.encode(payload.to_string()),
        signature
    )
}
