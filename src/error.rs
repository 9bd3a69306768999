//! Resource cache error types

use std::time::Duration;

/// Resource cache error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    // Configuration errors (programmer misuse, never data availability)
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    #[error("unknown relation '{relation}' for entity type '{entity_type}'")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no resource api configured")]
    NoApi,

    // Fetch failures
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The coordinator task has shut down and no longer accepts requests.
    #[error("request coordinator closed")]
    Closed,
}

impl CacheError {
    /// Whether this error comes from misconfiguration rather than from
    /// talking to the API.
    ///
    /// Configuration errors are raised synchronously from reads and builders;
    /// everything else is a fetch failure that the coordinator swallows.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CacheError::UnknownType(_)
                | CacheError::UnknownRelation { .. }
                | CacheError::Configuration(_)
                | CacheError::NoApi
        )
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CacheError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => CacheError::Http(err.to_string()),
        }
    }
}

/// Result type alias for resource cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
