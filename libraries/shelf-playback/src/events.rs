//! Session Events
//!
//! Broadcast to subscribers of [`crate::PlaybackSessionManager::subscribe`].
//! Errors are carried as display strings so events stay cheap to clone.

use serde::{Deserialize, Serialize};
use shelf_core::{LibraryItemId, SessionId};

/// Events emitted by the session manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A session was opened and is ready for playback
    Started {
        session_id: SessionId,
        library_item_id: LibraryItemId,
        /// Resolved start position in seconds
        start_time: f64,
        is_hls_transcode: bool,
    },

    /// The server refused or failed to open a session
    StartFailed {
        library_item_id: LibraryItemId,
        message: String,
    },

    /// Progress sync failed repeatedly
    ///
    /// Emitted once per run of consecutive failures reaching the threshold.
    SyncFailed {
        session_id: SessionId,
        message: String,
    },

    /// The session was closed locally
    Closed {
        session_id: SessionId,
        /// Whether a final progress payload was sent with the close
        with_progress: bool,
    },
}
