//! Access-token validation.
//!
//! [`validator::TokenValidator`] drives the pipeline: parse, algorithm
//! check, key resolution, key check, signature, claims.

pub mod cache;
pub mod claims;
pub mod jwks;
pub mod resolver;
pub mod rsa;
pub mod token;
pub mod validator;

pub use cache::KeySetCache;
pub use claims::{Claims, ClaimsValidator, Clock, FixedClock, SystemClock};
pub use jwks::{Jwk, JwksFetcher, KeySet, KeySetSource};
pub use resolver::KeyResolver;
pub use validator::TokenValidator;
