//! Error types for the tiered cache provider.

use thiserror::Error;

/// Errors surfaced by [`crate::CacheProvider`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// A required argument was missing, empty, or otherwise malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote backend rejected the call or the connection was lost.
    #[error("remote backend unavailable: {0}")]
    BackendUnavailable(#[source] anyhow::Error),

    /// A value came back from the remote tier in a shape the codec could not parse.
    #[error("failed to decode value for key {key}")]
    DecodeFailure {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The provider has already been disposed.
    #[error("cache provider has been disposed")]
    Disposed,

    /// The operation was cancelled before it could complete.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CacheError>;
