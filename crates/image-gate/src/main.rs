//! Image Gate
//!
//! Viewer-request handler. Reads newline-delimited edge events from stdin
//! and writes one decision per event (the forwarded request or the 403
//! response) to stdout. One gate, and so one key-set cache, serves every
//! event of the process.

use anyhow::Context;
use image_gate::auth::KeySetCache;
use image_gate::config::Config;
use image_gate::gate::{DenialResponse, GateDecision, RequestGate, ViewerRequestEvent};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Decide one event line. An unreadable event is denied.
async fn decide(gate: &RequestGate, line: &str) -> GateDecision {
    let request = serde_json::from_str::<ViewerRequestEvent>(line)
        .context("not a viewer-request event")
        .and_then(|event| event.into_request().map_err(anyhow::Error::from));

    match request {
        Ok(request) => gate.handle(request).await,
        Err(e) => {
            warn!(error = %e, "Rejecting unreadable event");
            GateDecision::Deny(DenialResponse::forbidden())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the decision
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_gate=info,gate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        region = %config.region,
        jwks_url = %config.jwks_url(),
        protected_path_marker = %config.protected_path_marker,
        "Configuration loaded successfully"
    );

    let gate = RequestGate::from_config(&config, Arc::new(KeySetCache::new()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read event from stdin")?
    {
        if line.trim().is_empty() {
            continue;
        }
        let decision = decide(&gate, &line).await;
        println!("{}", serde_json::to_string(&decision)?);
    }

    info!("Input closed, shutting down");
    Ok(())
}
