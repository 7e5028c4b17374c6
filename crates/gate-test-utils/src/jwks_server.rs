//! Mocked identity-provider JWKS endpoint
//!
//! Wraps a wiremock server that answers `GET /<pool-id>/.well-known/jwks.json`
//! the way the real identity provider does. Tests point the gate's
//! `IDP_BASE_URL` at it and count how many fetches the gate made.

use crate::crypto_fixtures::{jwks_json, TestRsaKey};
use crate::token_builders::{TEST_CLIENT_ID, TEST_USER_POOL_ID};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock identity provider serving one user pool's JWKS.
pub struct JwksMockServer {
    server: MockServer,
    user_pool_id: String,
}

impl JwksMockServer {
    /// Start a server for the default test user pool. Nothing is mounted yet.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            user_pool_id: TEST_USER_POOL_ID.to_string(),
        }
    }

    /// Path of the JWKS document on this server.
    pub fn jwks_path(&self) -> String {
        format!("/{}/.well-known/jwks.json", self.user_pool_id)
    }

    /// Base URL to configure as `IDP_BASE_URL`.
    pub fn idp_base_url(&self) -> String {
        self.server.uri()
    }

    /// Issuer tokens must carry to be accepted against this server.
    pub fn issuer(&self) -> String {
        format!("{}/{}", self.server.uri(), self.user_pool_id)
    }

    /// Serve a JWKS with exactly these keys.
    ///
    /// Replaces anything mounted before and resets the fetch count.
    pub async fn serve_keys(&self, keys: &[&TestRsaKey]) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .mount(&self.server)
            .await;
    }

    /// Serve an arbitrary JSON body (for hostile or unusual key sets).
    pub async fn serve_json(&self, body: serde_json::Value) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer every JWKS request with the given HTTP status.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Serve the keys only after `delay`.
    pub async fn serve_keys_slowly(&self, keys: &[&TestRsaKey], delay: Duration) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(self.jwks_path()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_json(keys))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// JWKS requests received since the last (re)mount.
    pub async fn fetch_count(&self) -> usize {
        let jwks_path = self.jwks_path();
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == jwks_path)
            .count()
    }

    /// Environment for `Config::from_vars` pointing at this server.
    pub fn config_vars(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "COGNITO_USER_POOL_ID".to_string(),
                self.user_pool_id.clone(),
            ),
            ("COGNITO_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
            ("IDP_BASE_URL".to_string(), self.idp_base_url()),
        ])
    }
}
