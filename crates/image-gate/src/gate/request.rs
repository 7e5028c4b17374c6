//! Edge request and response descriptors.
//!
//! Shapes follow the CDN viewer-request contract: headers are keyed by
//! lowercase name and each holds a list of `{key, value}` entries. Fields
//! the gate does not inspect are carried through untouched so an allowed
//! request reaches the origin exactly as it arrived.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Status code of the denial response.
pub const DENIAL_STATUS: &str = "403";

/// Status text of the denial response.
pub const DENIAL_STATUS_DESCRIPTION: &str = "Forbidden";

/// Body of the denial response. Identical for every rejection reason.
pub const DENIAL_BODY: &str = "Unauthorized access.";

/// One header value as the edge delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    /// Original-case header name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    pub value: String,
}

/// A viewer request as seen at the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRequest {
    /// Request path, e.g. `/images/cat.png`.
    pub uri: String,

    /// Headers keyed by lowercase name. `None` only when the field was
    /// absent, so an empty map is written back as `{}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Vec<HeaderEntry>>>,

    /// Everything else (method, querystring, clientIp, origin...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl EdgeRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: None,
            other: Map::new(),
        }
    }

    /// Append a header value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(HeaderEntry {
                key: Some(name.to_string()),
                value: value.into(),
            });
        self
    }

    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .get(&name.to_ascii_lowercase())
            .and_then(|entries| entries.first())
            .map(|entry| entry.value.as_str())
    }
}

/// The fixed 403 response returned for every rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialResponse {
    pub status: String,
    pub status_description: String,
    pub body: String,
}

impl DenialResponse {
    pub fn forbidden() -> Self {
        Self {
            status: DENIAL_STATUS.to_string(),
            status_description: DENIAL_STATUS_DESCRIPTION.to_string(),
            body: DENIAL_BODY.to_string(),
        }
    }
}

impl Default for DenialResponse {
    fn default() -> Self {
        Self::forbidden()
    }
}

/// What the edge should do with a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GateDecision {
    /// Continue to the origin with the request unchanged.
    Forward(EdgeRequest),

    /// Answer the viewer directly.
    Deny(DenialResponse),
}

impl GateDecision {
    pub fn is_forward(&self) -> bool {
        matches!(self, GateDecision::Forward(_))
    }
}
