/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The backing file exists but is not a JSON object
    #[error("Corrupt store at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
