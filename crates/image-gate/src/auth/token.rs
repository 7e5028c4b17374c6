//! Compact-serialization token parsing.
//!
//! Splits `header.payload.signature`, base64url-decodes each segment and
//! parses the header and payload as JSON. Nothing here is verified; the
//! parsed token only tells the validator which key to fetch and what the
//! signed message is.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE splitting or decoding
//! - The signed message is the literal `header_segment.payload_segment`
//!   text, never a re-serialization of the decoded JSON
//! - Every decode failure is `MalformedToken`, never a signature failure

use crate::errors::AuthError;
use base64::{engine::general_purpose::URL_SAFE, Engine};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Maximum accepted token size in bytes (8KB).
///
/// Access tokens from the identity provider are around 1KB. Anything larger
/// is rejected before base64 decoding allocates for it.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Decoded token header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Declared signature algorithm.
    pub alg: String,

    /// Key ID used to select the verification key.
    pub kid: String,

    #[serde(default)]
    pub typ: Option<String>,
}

/// A token split into its three decoded segments.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    pub header: TokenHeader,

    /// Decoded payload claims, not yet trusted.
    pub payload: Map<String, Value>,

    /// Raw signature bytes.
    pub signature: Vec<u8>,

    /// `header_segment.payload_segment` exactly as presented.
    signing_input: String,
}

impl ParsedToken {
    /// The byte string the signature was computed over.
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }
}

/// Decode base64url text, restoring `=` padding first.
///
/// Identity providers publish JWK components and token segments without
/// padding; the padded URL-safe engine needs a length that is a multiple
/// of four.
pub fn decode_base64url(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut padded = String::with_capacity(input.len() + 3);
    padded.push_str(input);
    let remainder = input.len() % 4;
    if remainder != 0 {
        for _ in remainder..4 {
            padded.push('=');
        }
    }
    URL_SAFE.decode(padded)
}

/// Parse a compact-serialization token.
///
/// # Errors
///
/// Returns `AuthError::MalformedToken` when the token is oversized, does not
/// have exactly three segments, or any segment fails to decode.
pub fn parse_token(token: &str) -> Result<ParsedToken, AuthError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "gate.auth.token",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(AuthError::MalformedToken);
    }

    let segments = token.split('.').count();
    if segments != 3 {
        tracing::debug!(
            target: "gate.auth.token",
            segments,
            "Token rejected: invalid compact serialization"
        );
        return Err(AuthError::MalformedToken);
    }

    let (signing_input, signature_segment) =
        token.rsplit_once('.').ok_or(AuthError::MalformedToken)?;
    let (header_segment, payload_segment) = signing_input
        .split_once('.')
        .ok_or(AuthError::MalformedToken)?;

    let header_bytes = decode_segment(header_segment, "header")?;
    let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "gate.auth.token", error = %e, "Failed to parse token header JSON");
        AuthError::MalformedToken
    })?;
    if header.kid.is_empty() {
        tracing::debug!(target: "gate.auth.token", "Token rejected: empty kid");
        return Err(AuthError::MalformedToken);
    }

    let payload_bytes = decode_segment(payload_segment, "payload")?;
    let payload: Map<String, Value> = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "gate.auth.token", error = %e, "Failed to parse token payload JSON");
        AuthError::MalformedToken
    })?;

    let signature = decode_segment(signature_segment, "signature")?;
    if signature.is_empty() {
        tracing::debug!(target: "gate.auth.token", "Token rejected: empty signature");
        return Err(AuthError::MalformedToken);
    }

    Ok(ParsedToken {
        header,
        payload,
        signature,
        signing_input: signing_input.to_string(),
    })
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Vec<u8>, AuthError> {
    decode_base64url(segment).map_err(|e| {
        tracing::debug!(target: "gate.auth.token", segment = name, error = %e, "Failed to decode token segment");
        AuthError::MalformedToken
    })
}
