//! Access-token claims and their validation.
//!
//! The `username` and `sub` fields identify a person and are redacted in
//! Debug output to keep them out of logs.

use crate::errors::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Claims carried by a verified access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Client the token was issued to (access tokens).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Audience (ID tokens); only a string value is ever accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,

    /// Issuer URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,

    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Username - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Remaining claims, kept opaque.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("client_id", &self.client_id)
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("token_use", &self.token_use)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username.as_ref().map(|_| "[REDACTED]"))
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}

impl Claims {
    /// Build claims from a decoded payload.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if required claims are missing or
    /// have the wrong type.
    pub fn from_payload(payload: Map<String, Value>) -> Result<Self, AuthError> {
        serde_json::from_value(Value::Object(payload)).map_err(|e| {
            tracing::debug!(target: "gate.auth.claims", error = %e, "Token payload does not match claims shape");
            AuthError::MalformedToken
        })
    }

    /// The audience: `client_id`, falling back to a string `aud`.
    pub fn audience(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .or_else(|| self.aud.as_ref().and_then(Value::as_str))
    }
}

/// Source of the current time in Unix epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock frozen at one instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Checks audience, issuer and expiration of verified claims.
pub struct ClaimsValidator {
    expected_audience: String,
    expected_issuer: String,
    clock: Arc<dyn Clock>,
}

impl ClaimsValidator {
    pub fn new(
        expected_audience: impl Into<String>,
        expected_issuer: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            expected_audience: expected_audience.into(),
            expected_issuer: expected_issuer.into(),
            clock,
        }
    }

    pub fn expected_issuer(&self) -> &str {
        &self.expected_issuer
    }

    /// Validate claims. String comparisons run before the clock is read.
    ///
    /// # Errors
    ///
    /// `InvalidAudience`, `InvalidIssuer` or `TokenExpired`.
    pub fn validate(&self, claims: &Claims) -> Result<(), AuthError> {
        if claims.audience() != Some(self.expected_audience.as_str()) {
            tracing::debug!(target: "gate.auth.claims", "Token rejected: audience mismatch");
            return Err(AuthError::InvalidAudience);
        }

        if claims.iss.as_deref() != Some(self.expected_issuer.as_str()) {
            tracing::debug!(
                target: "gate.auth.claims",
                iss = ?claims.iss,
                "Token rejected: issuer mismatch"
            );
            return Err(AuthError::InvalidIssuer);
        }

        let now = self.clock.now();
        if claims.exp <= now {
            tracing::debug!(
                target: "gate.auth.claims",
                exp = claims.exp,
                now = now,
                "Token rejected: expired"
            );
            return Err(AuthError::TokenExpired);
        }

        Ok(())
    }
}
