//! Image Gate Library
//!
//! Edge access control for image paths. Requests whose path contains the
//! protected marker must carry an access token issued by the configured
//! identity provider; everything else passes straight through.
//!
//! # Architecture
//!
//! ```text
//! gate::RequestGate -> auth::TokenValidator -> token / resolver (cache, jwks) / rsa / claims
//! ```
//!
//! # Modules
//!
//! - `auth` - Token parsing, key resolution, signature and claims checks
//! - `config` - Configuration from environment
//! - `errors` - Typed errors, the rejection taxonomy and outcomes
//! - `gate` - Allow/deny orchestration and edge request shapes
//! - `observability` - Metrics

pub mod auth;
pub mod config;
pub mod errors;
pub mod gate;
pub mod observability;

pub use config::Config;
pub use errors::{AuthError, Rejection, ValidationOutcome};
pub use gate::{GateDecision, RequestGate};
