/// Core error types for Shelf Player
use thiserror::Error;

/// Result type alias using `ShelfError`
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Core error type for Shelf Player
#[derive(Error, Debug)]
pub enum ShelfError {
    /// The remote server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The remote server answered with an error status
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Request was rejected because the client is not authenticated
    #[error("Authentication required")]
    AuthRequired,

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ShelfError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
