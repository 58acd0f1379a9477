//! Error types for the core library.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration-related error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A path resolution or validation error.
    #[error("path error: {0}")]
    Path(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An authentication or session error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The request never produced a response (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error: {context} failed: {status} - {body}")]
    Api {
        /// What the client was doing when the call failed.
        context: String,
        /// HTTP status returned by the server.
        status: reqwest::StatusCode,
        /// Response body, if any could be read.
        body: String,
    },

    /// A reference was expected to carry file versions but has none.
    #[error("reference {0} has no file versions")]
    NoFileVersions(i64),

    /// A generic error for other cases.
    #[error("error: {0}")]
    Other(String),
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;
