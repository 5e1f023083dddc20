//! Error taxonomy for the search pipeline
//!
//! Catalog-level errors abort a request. Group-level errors are captured by
//! the aggregator and reported as failures next to the results.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("CATALOG_URL not set")]
    ConfigMissing,

    #[error("Fetch {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u128 },

    #[error("Fetch {url} failed {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed JSON from {url}: {source}")]
    MalformedJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fetch {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Cannot resolve URL: {url}")]
    InvalidUrl { url: String },
}

impl SearchError {
    /// Whether this error ends the request before any network work happens.
    pub fn is_fatal_for_request(&self) -> bool {
        matches!(self, SearchError::ConfigMissing)
    }

    /// The URL involved in the failure, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            SearchError::ConfigMissing => None,
            SearchError::Timeout { url, .. }
            | SearchError::HttpStatus { url, .. }
            | SearchError::MalformedJson { url, .. }
            | SearchError::Transport { url, .. }
            | SearchError::InvalidUrl { url } => Some(url),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
