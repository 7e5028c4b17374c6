//! # Gate Test Utilities
//!
//! Shared test utilities for the image gate.
//!
//! This crate provides:
//! - Fixed RSA-2048 signing keys with their published JWK components
//! - Test token builders (TestTokenBuilder, forged and tampered tokens)
//! - A mocked identity-provider JWKS endpoint (JwksMockServer)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = TestRsaKey::primary();
//!     let idp = JwksMockServer::start().await;
//!     idp.serve_keys(&[&key]).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .issuer(&idp.issuer())
//!         .sign_with(&key);
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use token_builders::*;
