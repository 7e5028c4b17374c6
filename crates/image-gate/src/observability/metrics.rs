//! Metrics definitions for the image gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `image_gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! No exporter is installed by this crate; without a recorder the macros
//! are no-ops.

use crate::errors::ValidationOutcome;
use metrics::{counter, histogram};
use std::time::Duration;

/// Record a decision on a protected path.
///
/// Metric: `image_gate_validations_total`, `image_gate_validation_duration_seconds`
/// Labels: `outcome`, `reason`
pub fn record_validation(outcome: &ValidationOutcome, duration: Duration) {
    let reason = match outcome {
        ValidationOutcome::Valid => "none",
        ValidationOutcome::Rejected(rejection) => rejection.as_str(),
    };

    histogram!("image_gate_validation_duration_seconds",
        "outcome" => outcome.label()
    )
    .record(duration.as_secs_f64());

    counter!("image_gate_validations_total",
        "outcome" => outcome.label(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a JWKS fetch.
///
/// Metric: `image_gate_jwks_fetches_total`, `image_gate_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("image_gate_jwks_fetch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("image_gate_jwks_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a refresh that turned up a previously unknown key.
///
/// Metric: `image_gate_key_rotations_total`
pub fn record_key_rotation() {
    counter!("image_gate_key_rotations_total").increment(1);
}
