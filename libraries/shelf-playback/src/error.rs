//! Error types for the playback engine

use shelf_core::ShelfError;
use shelf_storage::StorageError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The server rejected or failed a session request
    #[error(transparent)]
    Server(#[from] ShelfError),

    /// Client-local persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Operation needs a loaded session
    #[error("No active playback session")]
    NoActiveSession,

    /// Local audio transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation not allowed in the current player state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
