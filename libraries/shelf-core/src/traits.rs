/// Core traits for Shelf Player
use crate::error::Result;
use crate::types::{
    EpisodeId, LibraryItemId, PlaybackSession, SessionId, StartSessionRequest, SyncPayload,
};
use async_trait::async_trait;

/// Remote playback session operations
///
/// Implemented by the HTTP client in `shelf-server-client`. The playback engine
/// only talks to the server through this trait, so tests can substitute a fake
/// server without any networking.
#[async_trait]
pub trait PlaybackSessionApi: Send + Sync {
    /// Open a playback session for a library item (or one of its episodes)
    ///
    /// # Errors
    /// Returns an error if the request fails or the server refuses to start playback
    async fn start_session(
        &self,
        library_item_id: &LibraryItemId,
        episode_id: Option<&EpisodeId>,
        request: &StartSessionRequest,
    ) -> Result<PlaybackSession>;

    /// Push the current position and listened time for an open session
    ///
    /// # Errors
    /// Returns an error if the request fails
    async fn sync_session(&self, session_id: &SessionId, payload: &SyncPayload) -> Result<()>;

    /// Close a session, optionally with a final progress payload
    ///
    /// # Errors
    /// Returns an error if the request fails
    async fn close_session(
        &self,
        session_id: &SessionId,
        payload: Option<&SyncPayload>,
    ) -> Result<()>;
}
