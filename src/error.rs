// src/error.rs
//! Error taxonomy for gateway calls. Both kinds are recoverable: the failed
//! operation leaves held data untouched and is retried on the next tick.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Request failed, timed out, or returned a non-success status.
    Network(String),
    /// Payload arrived but lacks the shape the engine relies on (e.g. `id`).
    DataShape(String),
}

impl FeedError {
    pub fn network(msg: impl Into<String>) -> Self {
        FeedError::Network(msg.into())
    }

    pub fn data_shape(msg: impl Into<String>) -> Self {
        FeedError::DataShape(msg.into())
    }

    /// Short label used in logs and API status payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Network(_) => "network",
            FeedError::DataShape(_) => "data_shape",
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Network(err.to_string())
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Network(e) => write!(f, "network error: {}", e),
            FeedError::DataShape(e) => write!(f, "data shape error: {}", e),
        }
    }
}

impl std::error::Error for FeedError {}
