//! Playable tracks bound to a server session

use shelf_core::{RawAudioTrack, SessionId};
use std::hash::{Hash, Hasher};

/// A session's audio track, as handed to the local transport
///
/// Two tracks are equal when they belong to the same session and have the
/// same index; nothing else is compared.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    raw: RawAudioTrack,
    session_id: SessionId,
    router_base_path: String,
}

impl AudioTrack {
    /// Track for a server mounted at the root path
    pub fn new(raw: RawAudioTrack, session_id: SessionId) -> Self {
        Self::with_router_base_path(raw, session_id, "")
    }

    /// Track for a server mounted under `router_base_path`
    pub fn with_router_base_path(
        raw: RawAudioTrack,
        session_id: SessionId,
        router_base_path: &str,
    ) -> Self {
        let trimmed = router_base_path.trim().trim_matches('/');
        let router_base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };

        Self {
            raw,
            session_id,
            router_base_path,
        }
    }

    pub fn index(&self) -> u32 {
        self.raw.index
    }

    /// Offset of this track within the whole item, in seconds
    pub fn start_offset(&self) -> f64 {
        self.raw.start_offset
    }

    pub fn duration(&self) -> f64 {
        self.raw.duration
    }

    /// Offset where this track ends, in seconds
    pub fn end_offset(&self) -> f64 {
        self.raw.start_offset + self.raw.duration
    }

    pub fn mime_type(&self) -> &str {
        &self.raw.mime_type
    }

    pub fn title(&self) -> &str {
        &self.raw.title
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Server-provided descriptor
    pub fn raw(&self) -> &RawAudioTrack {
        &self.raw
    }

    /// Whether this track is a transcode playlist
    pub fn is_hls(&self) -> bool {
        self.raw.content_url.starts_with("/hls")
    }

    /// Path of the media, relative to the server root and including the router base path
    ///
    /// Direct files go through the session-scoped public route so the URL
    /// stays authorized for as long as the session is open.
    pub fn relative_content_url(&self) -> String {
        if self.is_hls() {
            format!("{}{}", self.router_base_path, self.raw.content_url)
        } else {
            format!(
                "{}/public/session/{}/track/{}",
                self.router_base_path, self.session_id, self.raw.index
            )
        }
    }

    /// Absolute media URL on `server_url`
    pub fn full_content_url(&self, server_url: &str) -> String {
        format!(
            "{}{}",
            server_url.trim_end_matches('/'),
            self.relative_content_url()
        )
    }
}

impl PartialEq for AudioTrack {
    fn eq(&self, other: &Self) -> bool {
        self.session_id == other.session_id && self.raw.index == other.raw.index
    }
}

impl Eq for AudioTrack {}

impl Hash for AudioTrack {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.session_id.hash(state);
        self.raw.index.hash(state);
    }
}
