//! Viewer-request event envelope.
//!
//! The edge delivers `{"Records":[{"cf":{"config":{...},"request":{...}}}]}`.
//! Only the request of the first record is used.

use crate::gate::request::EdgeRequest;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Event contains no records")]
    NoRecords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerRequestEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub cf: CfRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CfRecord {
    pub request: EdgeRequest,
}

impl ViewerRequestEvent {
    /// Take the request out of the first record.
    ///
    /// # Errors
    ///
    /// Returns `EventError::NoRecords` for an empty envelope.
    pub fn into_request(self) -> Result<EdgeRequest, EventError> {
        self.records
            .into_iter()
            .next()
            .map(|record| record.cf.request)
            .ok_or(EventError::NoRecords)
    }
}
