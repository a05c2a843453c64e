/// Playback session descriptors exchanged with the media server
use super::{Chapter, DeviceInfo, EpisodeId, LibraryItemId, SessionId};
use serde::{Deserialize, Serialize};

/// How the server delivers media for a session
///
/// Encoded on the wire as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayMethod {
    /// Original files streamed unmodified
    DirectPlay,
    /// Remuxed stream without re-encoding
    DirectStream,
    /// Server-side HLS transcode
    Transcode,
    /// Files already on the device
    Local,
}

impl PlayMethod {
    /// Whether the session plays the original files
    pub fn is_direct_play(self) -> bool {
        self == Self::DirectPlay
    }
}

impl TryFrom<u8> for PlayMethod {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::DirectPlay),
            1 => Ok(Self::DirectStream),
            2 => Ok(Self::Transcode),
            3 => Ok(Self::Local),
            other => Err(format!("unknown play method: {}", other)),
        }
    }
}

impl From<PlayMethod> for u8 {
    fn from(method: PlayMethod) -> Self {
        match method {
            PlayMethod::DirectPlay => 0,
            PlayMethod::DirectStream => 1,
            PlayMethod::Transcode => 2,
            PlayMethod::Local => 3,
        }
    }
}

/// One playable media segment as described by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAudioTrack {
    /// Ordinal position within the session (1-based on most servers)
    #[serde(default)]
    pub index: u32,

    /// Total duration of all previous tracks, in seconds
    #[serde(default)]
    pub start_offset: f64,

    /// Track duration in seconds
    #[serde(default)]
    pub duration: f64,

    #[serde(default)]
    pub title: String,

    /// Server-relative URL (`/hls/...` for transcodes)
    #[serde(default)]
    pub content_url: String,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default)]
    pub codec: Option<String>,

    /// Opaque file metadata, passed through untouched
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Server-issued playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub id: SessionId,

    pub library_item_id: LibraryItemId,

    #[serde(default)]
    pub episode_id: Option<EpisodeId>,

    pub play_method: PlayMethod,

    #[serde(default)]
    pub audio_tracks: Vec<RawAudioTrack>,

    /// Server's last known position, in seconds
    #[serde(default)]
    pub current_time: f64,

    /// Total duration in seconds
    #[serde(default)]
    pub duration: f64,

    #[serde(default)]
    pub chapters: Vec<Chapter>,

    #[serde(default)]
    pub display_title: Option<String>,

    #[serde(default)]
    pub display_author: Option<String>,

    /// "book" or "podcast"
    #[serde(default)]
    pub media_type: Option<String>,
}

impl PlaybackSession {
    /// Copy of this session with its position replaced
    #[must_use]
    pub fn with_current_time(mut self, current_time: f64) -> Self {
        self.current_time = current_time;
        self
    }
}

/// Request body for opening a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub device_info: DeviceInfo,

    /// MIME types the local transport can decode
    pub supported_mime_types: Vec<String>,

    /// Name of the local media player implementation
    pub media_player: String,

    pub force_transcode: bool,

    pub force_direct_play: bool,
}

impl StartSessionRequest {
    /// Request that lets the server pick direct play or transcode
    pub fn new(
        device_info: DeviceInfo,
        supported_mime_types: Vec<String>,
        media_player: impl Into<String>,
    ) -> Self {
        Self {
            device_info,
            supported_mime_types,
            media_player: media_player.into(),
            force_transcode: false,
            force_direct_play: false,
        }
    }
}

/// Progress pushed to the server on sync and close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    /// Playback position in seconds
    pub current_time: f64,

    /// Whole seconds listened since the previous sync
    pub time_listened: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_method_wire_format() {
        let method: PlayMethod = serde_json::from_str("2").unwrap();
        assert_eq!(method, PlayMethod::Transcode);
        assert_eq!(serde_json::to_string(&PlayMethod::DirectPlay).unwrap(), "0");
        assert!(serde_json::from_str::<PlayMethod>("7").is_err());
    }

    #[test]
    fn only_direct_play_is_direct() {
        assert!(PlayMethod::DirectPlay.is_direct_play());
        assert!(!PlayMethod::DirectStream.is_direct_play());
        assert!(!PlayMethod::Transcode.is_direct_play());
        assert!(!PlayMethod::Local.is_direct_play());
    }

    #[test]
    fn session_from_server_json() {
        let json = serde_json::json!({
            "id": "play_abc",
            "libraryItemId": "li_1",
            "episodeId": null,
            "playMethod": 2,
            "mediaType": "book",
            "displayTitle": "The Book",
            "audioTracks": [{
                "index": 1,
                "startOffset": 0,
                "duration": 3600.5,
                "title": "output.m3u8",
                "contentUrl": "/hls/play_abc/output.m3u8",
                "mimeType": "application/vnd.apple.mpegurl"
            }],
            "currentTime": 125.0,
            "duration": 3600.5,
            "chapters": [
                {"id": 0, "title": "Opening", "start": 0, "end": 1800},
                {"id": 1, "title": "Ending", "start": 1800, "end": 3600.5}
            ],
            "userId": "ignored"
        });

        let session: PlaybackSession = serde_json::from_value(json).unwrap();
        assert_eq!(session.id.as_str(), "play_abc");
        assert_eq!(session.play_method, PlayMethod::Transcode);
        assert_eq!(session.audio_tracks.len(), 1);
        assert_eq!(session.audio_tracks[0].content_url, "/hls/play_abc/output.m3u8");
        assert_eq!(session.chapters[1].title, "Ending");
        assert_eq!(session.current_time, 125.0);
        assert!(session.episode_id.is_none());
    }

    #[test]
    fn start_request_never_forces_a_mode() {
        let request = StartSessionRequest::new(
            DeviceInfo {
                client_name: "Shelf Player".into(),
                client_version: "0.1.0".into(),
                device_id: "dev-1".into(),
            },
            vec!["audio/mpeg".into()],
            "clock",
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["forceTranscode"], false);
        assert_eq!(value["forceDirectPlay"], false);
        assert_eq!(value["deviceInfo"]["deviceId"], "dev-1");
        assert_eq!(value["supportedMimeTypes"][0], "audio/mpeg");
    }

    #[test]
    fn sync_payload_is_camel_case() {
        let payload = SyncPayload {
            current_time: 12.5,
            time_listened: 10,
        };
        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(value, serde_json::json!({"currentTime": 12.5, "timeListened": 10}));
    }
}
