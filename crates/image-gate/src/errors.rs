//! Error and outcome types for token validation.
//!
//! Collaborators (parser, fetcher, decoder, verifier, claims validator)
//! return a typed [`AuthError`]. The request gate is the single place where
//! an `AuthError` becomes a [`ValidationOutcome`]. Every rejection maps to the
//! same fixed denial response; the reason is only ever logged.

use thiserror::Error;

/// Typed failure returned by the validation collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Signing key not found")]
    SigningKeyNotFound,

    #[error("Unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Token expired")]
    TokenExpired,

    #[error("JWKS unavailable: {0}")]
    JwksUnavailable(String),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

impl AuthError {
    /// Map this error onto the closed rejection taxonomy.
    pub fn rejection(&self) -> Rejection {
        match self {
            AuthError::MalformedToken => Rejection::MalformedToken,
            AuthError::SigningKeyNotFound => Rejection::SigningKeyNotFound,
            AuthError::UnsupportedAlgorithm => Rejection::UnsupportedAlgorithm,
            AuthError::InvalidSignature => Rejection::InvalidSignature,
            AuthError::InvalidAudience => Rejection::InvalidAudience,
            AuthError::InvalidIssuer => Rejection::InvalidIssuer,
            AuthError::TokenExpired => Rejection::TokenExpired,
            AuthError::JwksUnavailable(_) | AuthError::InvalidKeyMaterial(_) => {
                Rejection::UnexpectedFailure
            }
        }
    }
}

/// Why a protected request was denied.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash)]
pub enum Rejection {
    #[error("malformed token")]
    MalformedToken,

    #[error("no token passed")]
    NoToken,

    #[error("signing key not found")]
    SigningKeyNotFound,

    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("token expired")]
    TokenExpired,

    #[error("unexpected failure")]
    UnexpectedFailure,
}

impl Rejection {
    /// Stable snake_case label used for metrics and structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MalformedToken => "malformed_token",
            Rejection::NoToken => "no_token",
            Rejection::SigningKeyNotFound => "signing_key_not_found",
            Rejection::UnsupportedAlgorithm => "unsupported_algorithm",
            Rejection::InvalidSignature => "invalid_signature",
            Rejection::InvalidAudience => "invalid_audience",
            Rejection::InvalidIssuer => "invalid_issuer",
            Rejection::TokenExpired => "token_expired",
            Rejection::UnexpectedFailure => "unexpected_failure",
        }
    }
}

impl From<AuthError> for Rejection {
    fn from(err: AuthError) -> Self {
        err.rejection()
    }
}

/// Result of validating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// Label for metrics (`valid` or `rejected`).
    pub fn label(&self) -> &'static str {
        match self {
            ValidationOutcome::Valid => "valid",
            ValidationOutcome::Rejected(_) => "rejected",
        }
    }
}

impl<T> From<Result<T, AuthError>> for ValidationOutcome {
    fn from(result: Result<T, AuthError>) -> Self {
        match result {
            Ok(_) => ValidationOutcome::Valid,
            Err(err) => ValidationOutcome::Rejected(err.rejection()),
        }
    }
}
