//! Error types shared across the session stack.

/// User-facing text for any failure that is not a well-formed backend reply.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error occurred. Please try again.";

/// Failure talking to the backend before a status line was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(String),
}

/// Failure reading or writing durable key-value state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Recoverable failure of a session-mutating call.
///
/// Callers render [`NetworkError::user_message`]; the variant detail is for logs.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend answered, but the body was not the expected JSON shape.
    #[error("malformed response body (status {status}): {reason}")]
    MalformedBody { status: u16, reason: String },

    /// A session was granted but could not be written to durable storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl NetworkError {
    /// Generic message suitable for a notification banner.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        NETWORK_ERROR_MESSAGE
    }
}
