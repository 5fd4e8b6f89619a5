//! Error taxonomy for the sensor dashboard core.
//!
//! - [`MalformedReading`] is raised by the decoder and always handled
//!   per-reading by the aggregators (the reading is skipped and logged).
//! - [`StoreError`] is surfaced to callers of the store's update operations.
//! - [`UpstreamFetchError`] is surfaced to callers of the ingestion interface;
//!   nothing in the core retries it.

use thiserror::Error;

// ---

/// An encoded sensor record that could not be turned into a [`crate::RawReading`].
#[derive(Debug, Error)]
pub enum MalformedReading {
    /// Not JSON, or a required field (`timestamp`, `room`, `attribute`) is
    /// missing or has the wrong type.
    #[error("invalid reading record: {0}")]
    Json(#[from] serde_json::Error),

    /// The `attribute` mapping carries more than one sensor kind.
    #[error("attribute carries {0} kinds, expected exactly one")]
    AmbiguousAttribute(usize),

    /// The payload under the kind key is neither an object nor null.
    #[error("payload for {kind} is not an object")]
    PayloadNotObject { kind: String },
}

/// Errors returned by the situation store's update operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{resource} not found: {key}")]
    NotFound { resource: &'static str, key: String },
}

impl StoreError {
    // ---
    pub fn situation_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            resource: "situation",
            key: key.to_string(),
        }
    }

    pub fn anomaly_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            resource: "anomaly",
            key: key.to_string(),
        }
    }
}

/// Failure of the external situation source.
#[derive(Debug, Error)]
pub enum UpstreamFetchError {
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("situation file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("situation data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upstream returned an unexpected document: {0}")]
    UnexpectedShape(String),
}
