//! Record service error types.

use thiserror::Error;

/// Result type for record service operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors that can occur against the record service.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The backend refused the request. Deliberately opaque: a guard
    /// mismatch and a missing record surface identically so a rejected
    /// token cannot act as an existence oracle.
    #[error("request was rejected by the record service")]
    Rejected,

    #[error("API request failed: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no session token set")]
    AuthRequired,

    /// Raised after decrypt retries are exhausted; user-facing as
    /// "re-authenticate".
    #[error("encryption key unavailable, re-authentication required")]
    KeyMissing,

    /// Fatal to the enclosing account-deletion flow; never silently
    /// downgraded.
    #[error("purge left {remaining} record(s) in namespace {namespace}")]
    PurgeIncomplete { namespace: String, remaining: usize },

    #[error("crypto error: {0}")]
    Crypto(#[from] haven_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
