//! Observability for the image gate.
//!
//! Metric labels are bounded to prevent cardinality explosion:
//! - `outcome`: 2 values (valid, rejected)
//! - `reason`: the closed rejection taxonomy plus `none`
//! - `status`: 2 values (success, error)
//!
//! Token contents never appear in labels or log fields.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `image_gate_validations_total` | Counter | `outcome`, `reason` | Gate decisions on protected paths |
//! | `image_gate_validation_duration_seconds` | Histogram | `outcome` | Time to a decision |
//! | `image_gate_jwks_fetches_total` | Counter | `status` | Key-set refreshes |
//! | `image_gate_jwks_fetch_duration_seconds` | Histogram | `status` | Key-set refresh latency |
//! | `image_gate_key_rotations_total` | Counter | none | Refreshes that found a new key |

pub mod metrics;
