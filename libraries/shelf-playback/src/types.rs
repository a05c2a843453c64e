//! Core types for player state

use serde::{Deserialize, Serialize};
use shelf_core::{Chapter, SessionId};

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing loaded
    #[default]
    Idle,

    /// Waiting for the server to open a session
    Loading,

    /// Transport running
    Playing,

    /// Transport loaded but not running
    Paused,

    /// Start or transport failure; `load` again to recover
    Error,
}

/// Local transport flavour chosen from the session's play method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Server-side transcode delivered as an HLS playlist
    HlsStream,

    /// Original files played directly
    Direct,
}

/// Point-in-time view of the player, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub state: PlayerState,
    pub session_id: Option<SessionId>,
    pub is_hls_transcode: bool,

    /// Position in seconds
    pub current_time: f64,
    /// Total duration in seconds
    pub duration: f64,
    /// How far ahead the transport has data, in seconds
    pub buffered_time: f64,

    /// Volume (0.0 - 1.0)
    pub volume: f64,
    pub playback_rate: f64,

    pub current_chapter: Option<Chapter>,
    pub next_chapter: Option<Chapter>,
    pub previous_chapter: Option<Chapter>,

    /// Whether progress is shown relative to the current chapter
    pub use_chapter_track: bool,
}

impl PlayerSnapshot {
    /// Snapshot of a player with nothing loaded
    pub fn idle(volume: f64, playback_rate: f64, use_chapter_track: bool) -> Self {
        Self {
            state: PlayerState::Idle,
            session_id: None,
            is_hls_transcode: false,
            current_time: 0.0,
            duration: 0.0,
            buffered_time: 0.0,
            volume,
            playback_rate,
            current_chapter: None,
            next_chapter: None,
            previous_chapter: None,
            use_chapter_track,
        }
    }

    /// `(elapsed, total)` for a progress bar
    ///
    /// With chapter-track mode on and a current chapter, both values are
    /// relative to that chapter.
    pub fn display_progress(&self) -> (f64, f64) {
        if self.use_chapter_track {
            if let Some(chapter) = &self.current_chapter {
                let elapsed = (self.current_time - chapter.start).clamp(0.0, chapter.duration());
                return (elapsed, chapter.duration());
            }
        }
        (self.current_time, self.duration)
    }

    /// Playback reached the end of the media
    pub fn is_finished(&self) -> bool {
        self.duration > 0.0 && self.current_time >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_relative_progress() {
        let mut snapshot = PlayerSnapshot::idle(1.0, 1.0, true);
        snapshot.current_time = 130.0;
        snapshot.duration = 1000.0;
        snapshot.current_chapter = Some(Chapter::new(1, "Two", 100.0, 400.0));

        assert_eq!(snapshot.display_progress(), (30.0, 300.0));

        snapshot.use_chapter_track = false;
        assert_eq!(snapshot.display_progress(), (130.0, 1000.0));
    }

    #[test]
    fn chapter_mode_without_chapters_falls_back() {
        let mut snapshot = PlayerSnapshot::idle(1.0, 1.0, true);
        snapshot.current_time = 5.0;
        snapshot.duration = 50.0;
        assert_eq!(snapshot.display_progress(), (5.0, 50.0));
        assert!(!snapshot.is_finished());

        snapshot.current_time = 50.0;
        assert!(snapshot.is_finished());
    }
}
