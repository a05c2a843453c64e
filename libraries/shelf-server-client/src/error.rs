//! Error types for the server client.

use shelf_core::ShelfError;
use thiserror::Error;

/// Errors that can occur when talking to the media server.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Authentication required but no token available, or the token was rejected
    #[error("Authentication required")]
    AuthRequired,

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Requested entity does not exist on the server
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

impl ServerClientError {
    /// Classify a transport-level reqwest failure.
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::ServerUnreachable(e.to_string())
        } else {
            Self::Request(e)
        }
    }
}

impl From<ServerClientError> for ShelfError {
    fn from(err: ServerClientError) -> Self {
        match err {
            ServerClientError::Request(e) => ShelfError::network(e.to_string()),
            ServerClientError::ServerUnreachable(msg) => ShelfError::network(msg),
            ServerClientError::ServerError { status, message } => {
                ShelfError::Server { status, message }
            }
            ServerClientError::AuthRequired => ShelfError::AuthRequired,
            ServerClientError::InvalidUrl(msg) => ShelfError::invalid_input(msg),
            ServerClientError::ParseError(msg) => {
                ShelfError::Other(format!("Failed to parse response: {}", msg))
            }
            ServerClientError::NotFound { entity, id } => ShelfError::not_found(entity, id),
        }
    }
}

/// Result type for server client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;
