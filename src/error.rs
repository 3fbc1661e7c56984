//! Error types for conflict resolution.
//!
//! Errors fall into three groups:
//!
//! | Group | Variants | Meaning |
//! |-------|----------|---------|
//! | Fetch | [`NotFound`](DeconflictError::NotFound), [`Fetch`](DeconflictError::Fetch) | The document or its revision tree could not be retrieved |
//! | Structural | [`Structural`](DeconflictError::Structural) | A fetched document lacks `_id` or `_rev` |
//! | Transport | [`Http`](DeconflictError::Http), [`Status`](DeconflictError::Status), [`Json`](DeconflictError::Json) | The store client failed to talk to the server |
//!
//! A document with no actionable conflict is *not* an error; strategies report it as
//! [`Outcome::NotConflicted`](crate::Outcome::NotConflicted). Likewise, a rejected
//! row inside a bulk write is reported in the [`BulkReport`](crate::BulkReport),
//! never as a call-level error.

use thiserror::Error;

/// Errors that can occur while resolving a conflicted document.
#[derive(Debug, Error)]
pub enum DeconflictError {
    /// The store has no document with this id.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document or its revision tree could not be fetched.
    #[error("document could not be fetched: {0}")]
    Fetch(String),

    /// A fetched document is missing a required identity field.
    #[error("malformed document: {0}")]
    Structural(String),

    /// The nominated winning revision is not a live leaf of the document.
    #[error("nominated revision {rev} is not a live leaf of {id}")]
    NominatedRevisionMissing {
        /// Document id
        id: String,
        /// Revision that was nominated
        rev: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The store answered with an unexpected status code.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL could not be built from the configuration or document id.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration or strategy specification.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeconflictError {
    /// Whether this error means the document could not be retrieved at all.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, DeconflictError::NotFound(_) | DeconflictError::Fetch(_))
    }

    /// Whether the failed request may succeed if sent again.
    ///
    /// Only consulted by [`CouchClient`](crate::client::CouchClient) for idempotent reads.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeconflictError::Http(_) => true,
            DeconflictError::Status { status, .. } => {
                crate::client::is_retryable_status(*status)
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DeconflictError {
    fn from(err: reqwest::Error) -> Self {
        DeconflictError::Http(err.to_string())
    }
}

impl From<url::ParseError> for DeconflictError {
    fn from(err: url::ParseError) -> Self {
        DeconflictError::InvalidUrl(err.to_string())
    }
}

/// Result type for conflict resolution operations.
pub type Result<T> = std::result::Result<T, DeconflictError>;
