//! Fixed cryptographic fixtures for testing
//!
//! Two RSA-2048 keypairs checked in as PEM files. The public modulus and
//! exponent are listed alongside in the base64url form an identity provider
//! publishes in its JWKS document.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{json, Value};

const PRIMARY_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_key_1.pem");
const PRIMARY_N: &str = "zCayJRxifKCc5i5v6JP6J6jJMi_HsisD1QbbJHeCBZD4NxyWBPkj2WIEHnEdAunj0Yt2KPUnylzKrKORuLuerbfLJEejC_QJ_oTO2BmYjv21NbqKHVvGQ9Rm5E_Cnan2IMp87GTnKujlyB8wEVoTTPlGttvstFcmp1GK-AqWP7Huw1pFiQvtPF9-6dFGkXrcE5NdxIYpJ2SnWmEZn55_ZBmLGwQHxusWwpGWJVmQMBlzPgTIDZlYwKc18mYWCBX989UJEDANQ5TkAKlDT18u-nsrMLS-_6IdGK0QpRvoLJM_ITJjCXEoyhS8OGbXqRvfRT5sbgaQJ94B2wNvxTDAsQ";

const ROTATED_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_key_2.pem");
const ROTATED_N: &str = "wKHOhXZaC_BCvFHwFVlQDIj18IJmD19YHa0GlT9hQmSzPMxMfteoTYnsrkcpwfzNMrt9_jt-aolL-3-zwk2e1G2ndqp0uUZptxOiM97vD6jnjxyO9Q_zaPQVErdgNXovNm1AmCM1G42OeVe5h0wadVp1TR38QBWVpNnGLPimw3CCJy-iAFdwmKhIm50ax5WZwI4wgGTE56mWGh1U6FYmfv9AUbwn77sC-LRO6VFmS1LRHiLf81ID0j-Og_kH7qmV4hEGGwMR-sbC6p_70_SWTcGUVStkDRQ9O5lyTNCtPpn4o-eRR98s5cvc3JwocGQjEY4oXrqqXB5jAZRZdF8_Dw";

/// 65537
const PUBLIC_EXPONENT: &str = "AQAB";

/// Key ID of the primary fixture key.
pub const PRIMARY_KID: &str = "test-key-01";

/// Key ID of the rotated fixture key.
pub const ROTATED_KID: &str = "test-key-02";

/// An RSA signing key with its public JWK components.
#[derive(Debug, Clone)]
pub struct TestRsaKey {
    /// Key ID advertised in the JWKS and placed in token headers.
    pub kid: String,

    /// Base64url modulus.
    pub n: &'static str,

    /// Base64url public exponent.
    pub e: &'static str,

    private_pem: &'static str,
}

impl TestRsaKey {
    /// The key the identity provider publishes first.
    pub fn primary() -> Self {
        Self {
            kid: PRIMARY_KID.to_string(),
            n: PRIMARY_N,
            e: PUBLIC_EXPONENT,
            private_pem: PRIMARY_PRIVATE_PEM,
        }
    }

    /// A second, unrelated key, used to simulate rotation.
    pub fn rotated() -> Self {
        Self {
            kid: ROTATED_KID.to_string(),
            n: ROTATED_N,
            e: PUBLIC_EXPONENT,
            private_pem: ROTATED_PRIVATE_PEM,
        }
    }

    /// Same key material under a different key ID.
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    /// jsonwebtoken signing key.
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .expect("fixture PEM should be a valid RSA private key")
    }

    /// RS256 signature over `message`, as raw bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature = jsonwebtoken::crypto::sign(message, &self.encoding_key(), Algorithm::RS256)
            .expect("RS256 signing with fixture key should succeed");
        URL_SAFE_NO_PAD
            .decode(signature)
            .expect("jsonwebtoken returns base64url signatures")
    }

    /// Public JWK as the identity provider would publish it.
    pub fn jwk_json(&self) -> Value {
        json!({
            "alg": "RS256",
            "e": self.e,
            "kid": self.kid,
            "kty": "RSA",
            "n": self.n,
            "use": "sig"
        })
    }
}

/// JWKS document containing the given keys, in order.
pub fn jwks_json(keys: &[&TestRsaKey]) -> Value {
    json!({
        "keys": keys.iter().map(|key| key.jwk_json()).collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_keys_are_distinct() {
        let primary = TestRsaKey::primary();
        let rotated = TestRsaKey::rotated();

        assert_ne!(primary.kid, rotated.kid);
        assert_ne!(primary.n, rotated.n);
    }

    #[test]
    fn test_modulus_is_2048_bits() {
        for key in [TestRsaKey::primary(), TestRsaKey::rotated()] {
            let modulus = URL_SAFE_NO_PAD.decode(key.n).unwrap();
            assert_eq!(modulus.len(), 256);
        }
    }

    #[test]
    fn test_signature_is_modulus_sized_and_deterministic() {
        let key = TestRsaKey::primary();
        let first = key.sign(b"message");
        let second = key.sign(b"message");

        // PKCS#1 v1.5 signatures are deterministic
        assert_eq!(first, second);
        assert_eq!(first.len(), 256);
    }

    #[test]
    fn test_jwks_json_lists_keys_in_order() {
        let primary = TestRsaKey::primary();
        let rotated = TestRsaKey::rotated();
        let jwks = jwks_json(&[&rotated, &primary]);

        assert_eq!(jwks["keys"][0]["kid"], ROTATED_KID);
        assert_eq!(jwks["keys"][1]["kid"], PRIMARY_KID);
        assert_eq!(jwks["keys"][1]["kty"], "RSA");
    }

    #[test]
    fn test_with_kid_keeps_material() {
        let key = TestRsaKey::primary().with_kid("renamed");
        assert_eq!(key.kid, "renamed");
        assert_eq!(key.n, PRIMARY_N);
    }
}
