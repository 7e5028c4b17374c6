//! RSA key material decoding and RS256 signature verification.
//!
//! # Security
//!
//! - RS256 (RSASSA-PKCS1-v1_5 with SHA-256) is the only accepted scheme
//! - The header and key algorithms are checked by the caller BEFORE the
//!   cryptographic primitive runs (algorithm-confusion guard)
//! - Decoded key material lives only for one verification

use crate::auth::jwks::Jwk;
use crate::auth::token::decode_base64url;
use crate::errors::AuthError;
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_2048_8192_SHA256};
use std::fmt;

/// The single supported signature algorithm.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// The only accepted JWK key type.
pub const SUPPORTED_KEY_TYPE: &str = "RSA";

/// Reject any declared token algorithm other than RS256.
pub fn ensure_supported_algorithm(alg: &str) -> Result<(), AuthError> {
    if alg != SUPPORTED_ALGORITHM {
        tracing::debug!(target: "gate.auth.rsa", alg = %alg, "Unsupported header algorithm");
        return Err(AuthError::UnsupportedAlgorithm);
    }
    Ok(())
}

/// Reject keys that are not RS256 RSA keys.
///
/// A key without a declared `alg` is rejected as well.
pub fn ensure_supported_key(jwk: &Jwk) -> Result<(), AuthError> {
    if jwk.kty != SUPPORTED_KEY_TYPE {
        tracing::warn!(target: "gate.auth.rsa", kid = %jwk.kid, kty = %jwk.kty, "Unexpected JWK key type");
        return Err(AuthError::UnsupportedAlgorithm);
    }
    if jwk.alg.as_deref() != Some(SUPPORTED_ALGORITHM) {
        tracing::warn!(target: "gate.auth.rsa", kid = %jwk.kid, alg = ?jwk.alg, "Unsupported key algorithm");
        return Err(AuthError::UnsupportedAlgorithm);
    }
    Ok(())
}

/// RSA public key as big-endian unsigned integers without leading zeros.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl RsaPublicKey {
    /// Build a key from base64url-encoded modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKeyMaterial` if either component fails to
    /// decode or is zero.
    pub fn from_components(n_b64: &str, e_b64: &str) -> Result<Self, AuthError> {
        let modulus = decode_unsigned(n_b64, "n")?;
        let exponent = decode_unsigned(e_b64, "e")?;
        Ok(Self { modulus, exponent })
    }

    /// Build a key from a JWK's `n` and `e` fields.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, AuthError> {
        let n = jwk.n.as_deref().ok_or_else(|| {
            tracing::error!(target: "gate.auth.rsa", kid = %jwk.kid, "JWK missing n field");
            AuthError::InvalidKeyMaterial("missing modulus".to_string())
        })?;
        let e = jwk.e.as_deref().ok_or_else(|| {
            tracing::error!(target: "gate.auth.rsa", kid = %jwk.kid, "JWK missing e field");
            AuthError::InvalidKeyMaterial("missing exponent".to_string())
        })?;
        Self::from_components(n, e)
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        match self.modulus.first() {
            Some(top) => self.modulus.len() * 8 - top.leading_zeros() as usize,
            None => 0,
        }
    }
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("modulus_bits", &self.modulus_bits())
            .field("exponent", &self.exponent)
            .finish()
    }
}

fn decode_unsigned(b64: &str, name: &'static str) -> Result<Vec<u8>, AuthError> {
    let bytes = decode_base64url(b64).map_err(|e| {
        tracing::error!(target: "gate.auth.rsa", component = name, error = %e, "Invalid key component encoding");
        AuthError::InvalidKeyMaterial(format!("{} is not base64url", name))
    })?;

    let significant: Vec<u8> = bytes.into_iter().skip_while(|b| *b == 0).collect();
    if significant.is_empty() {
        return Err(AuthError::InvalidKeyMaterial(format!("{} is zero", name)));
    }
    Ok(significant)
}

/// Verifies a signature over a message with a resolved public key.
pub trait SignatureVerifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSignature` if the signature does not verify.
    fn verify(
        &self,
        key: &RsaPublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AuthError>;
}

/// RSASSA-PKCS1-v1_5 / SHA-256 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rs256Verifier;

impl SignatureVerifier for Rs256Verifier {
    fn verify(
        &self,
        key: &RsaPublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AuthError> {
        let components = RsaPublicKeyComponents {
            n: key.modulus(),
            e: key.exponent(),
        };

        components
            .verify(&RSA_PKCS1_2048_8192_SHA256, message, signature)
            .map_err(|_| {
                tracing::debug!(
                    target: "gate.auth.rsa",
                    modulus_bits = key.modulus_bits(),
                    "Signature verification failed"
                );
                AuthError::InvalidSignature
            })
    }
}
