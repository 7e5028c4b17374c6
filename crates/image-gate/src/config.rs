//! Image gate configuration.
//!
//! Loaded from environment variables by the binary and handed to the gate.
//! The validation core never reads the environment itself.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default substring marking a protected request path.
pub const DEFAULT_PROTECTED_PATH_MARKER: &str = "images/";

/// Default header carrying the access token.
pub const DEFAULT_TOKEN_HEADER: &str = "auth";

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for the JWKS fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Image gate configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// User pool identifier, e.g. `us-west-2_4czmlJC5x`.
    pub user_pool_id: String,

    /// Region derived from the user pool id prefix.
    pub region: String,

    /// Expected `client_id` (audience) of presented tokens.
    pub client_id: String,

    /// Issuer host URL without the pool path, no trailing slash.
    pub idp_base_url: String,

    /// Paths containing this substring require a valid token.
    pub protected_path_marker: String,

    /// Lowercase name of the header carrying the token.
    pub token_header: String,

    /// Timeout applied to the JWKS HTTP request.
    pub jwks_fetch_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid user pool id: {0}")]
    InvalidUserPoolId(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),

    #[error("Invalid value for {0}: must not be empty")]
    EmptyValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let user_pool_id = vars
            .get("COGNITO_USER_POOL_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("COGNITO_USER_POOL_ID".to_string()))?
            .clone();

        let region = region_from_pool_id(&user_pool_id)?;

        let client_id = vars
            .get("COGNITO_CLIENT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("COGNITO_CLIENT_ID".to_string()))?
            .clone();
        if client_id.is_empty() {
            return Err(ConfigError::EmptyValue("COGNITO_CLIENT_ID".to_string()));
        }

        let idp_base_url = vars
            .get("IDP_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com", region));
        if idp_base_url.is_empty() {
            return Err(ConfigError::EmptyValue("IDP_BASE_URL".to_string()));
        }

        let protected_path_marker = vars
            .get("PROTECTED_PATH_MARKER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROTECTED_PATH_MARKER.to_string());
        if protected_path_marker.is_empty() {
            return Err(ConfigError::EmptyValue("PROTECTED_PATH_MARKER".to_string()));
        }

        let token_header = vars
            .get("TOKEN_HEADER")
            .map(|h| h.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_TOKEN_HEADER.to_string());
        if token_header.is_empty() {
            return Err(ConfigError::EmptyValue("TOKEN_HEADER".to_string()));
        }

        // Parse JWKS fetch timeout with validation
        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidJwksFetchTimeout(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                if value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                        MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
            };

        Ok(Config {
            user_pool_id,
            region,
            client_id,
            idp_base_url,
            protected_path_marker,
            token_header,
            jwks_fetch_timeout: Duration::from_secs(jwks_fetch_timeout_seconds),
        })
    }

    /// Expected `iss` claim: `<idp base url>/<user pool id>`.
    pub fn issuer(&self) -> String {
        format!("{}/{}", self.idp_base_url, self.user_pool_id)
    }

    /// Well-known JWKS endpoint for the configured pool.
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }
}

/// The region is the part of the pool id before the first underscore.
fn region_from_pool_id(user_pool_id: &str) -> Result<String, ConfigError> {
    match user_pool_id.split_once('_') {
        Some((region, suffix)) if !region.is_empty() && !suffix.is_empty() => {
            Ok(region.to_string())
        }
        _ => Err(ConfigError::InvalidUserPoolId(format!(
            "expected '<region>_<id>', got '{}'",
            user_pool_id
        ))),
    }
}
