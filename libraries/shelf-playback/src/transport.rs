//! Local audio transport abstraction
//!
//! The engine never decodes audio itself. A platform provides an
//! [`AudioTransport`] (native player, HLS stream player, ...) through a
//! [`TransportFactory`]. [`ClockTransport`] is a headless implementation that
//! advances a position from the tokio clock, for CLIs and tests.

use crate::audio_track::AudioTrack;
use crate::error::{PlaybackError, Result};
use crate::types::TransportKind;
use tokio::time::Instant;
use tracing::debug;

/// Seconds of look-ahead reported by streamed transports
const HLS_BUFFER_AHEAD: f64 = 30.0;

/// Platform audio output for one loaded session
///
/// Times are in seconds on the whole item's timeline, not per track.
pub trait AudioTransport: Send {
    fn kind(&self) -> TransportKind;

    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Move to `time`; callers clamp to `[0, duration]`
    fn seek(&mut self, time: f64);

    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    /// Furthest position with data available
    fn buffered_time(&self) -> f64;

    /// Volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f64);

    fn volume(&self) -> f64;

    fn set_playback_rate(&mut self, rate: f64);

    fn playback_rate(&self) -> f64;

    /// Release resources; the transport is not used again
    fn destroy(&mut self);
}

/// Creates transports for loaded sessions
pub trait TransportFactory: Send + Sync {
    /// MIME types the created transports can play, sent to the server so it
    /// can decide between direct play and transcoding
    fn supported_mime_types(&self) -> Vec<String>;

    /// Build a transport for `tracks`
    fn create(&self, kind: TransportKind, tracks: &[AudioTrack])
        -> Result<Box<dyn AudioTransport>>;
}

/// Transport that plays silence in real time
///
/// Position advances with [`tokio::time::Instant`] scaled by the playback
/// rate, so paused-clock tests control it exactly.
#[derive(Debug)]
pub struct ClockTransport {
    kind: TransportKind,
    tracks: Vec<AudioTrack>,
    duration: f64,
    /// Position at `anchor`
    position: f64,
    /// Set while playing
    anchor: Option<Instant>,
    rate: f64,
    volume: f64,
    destroyed: bool,
}

impl ClockTransport {
    pub fn new(kind: TransportKind, tracks: &[AudioTrack]) -> Self {
        let duration = tracks
            .iter()
            .map(AudioTrack::end_offset)
            .fold(0.0_f64, f64::max);

        Self {
            kind,
            tracks: tracks.to_vec(),
            duration,
            position: 0.0,
            anchor: None,
            rate: 1.0,
            volume: 1.0,
            destroyed: false,
        }
    }

    /// Track containing the current position
    pub fn current_track(&self) -> Option<&AudioTrack> {
        let time = self.current_time();
        self.tracks
            .iter()
            .find(|track| time >= track.start_offset() && time < track.end_offset())
            .or_else(|| self.tracks.last().filter(|_| time >= self.duration))
    }

    fn rebase(&mut self) {
        self.position = self.current_time();
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }
}

impl AudioTransport for ClockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn play(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(PlaybackError::Transport("transport was destroyed".into()));
        }
        if self.tracks.is_empty() {
            return Err(PlaybackError::Transport("no playable tracks".into()));
        }
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.anchor = None;
    }

    fn is_playing(&self) -> bool {
        self.anchor.is_some() && self.current_time() < self.duration
    }

    fn seek(&mut self, time: f64) {
        self.position = time.clamp(0.0, self.duration);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    fn current_time(&self) -> f64 {
        match self.anchor {
            Some(anchor) => {
                (self.position + anchor.elapsed().as_secs_f64() * self.rate).min(self.duration)
            }
            None => self.position,
        }
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn buffered_time(&self) -> f64 {
        match self.kind {
            TransportKind::Direct => self.duration,
            TransportKind::HlsStream => {
                (self.current_time() + HLS_BUFFER_AHEAD).min(self.duration)
            }
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rebase();
        self.rate = rate;
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn destroy(&mut self) {
        self.pause();
        self.tracks.clear();
        self.destroyed = true;
        debug!("Clock transport destroyed");
    }
}

/// Factory for [`ClockTransport`]
#[derive(Debug, Clone)]
pub struct ClockTransportFactory {
    supported_mime_types: Vec<String>,
}

impl ClockTransportFactory {
    pub fn new(supported_mime_types: Vec<String>) -> Self {
        Self {
            supported_mime_types,
        }
    }
}

impl Default for ClockTransportFactory {
    fn default() -> Self {
        Self::new(
            [
                "audio/flac",
                "audio/mpeg",
                "audio/mp4",
                "audio/ogg",
                "audio/aac",
                "audio/webm",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        )
    }
}

impl TransportFactory for ClockTransportFactory {
    fn supported_mime_types(&self) -> Vec<String> {
        self.supported_mime_types.clone()
    }

    fn create(
        &self,
        kind: TransportKind,
        tracks: &[AudioTrack],
    ) -> Result<Box<dyn AudioTransport>> {
        debug!(?kind, tracks = tracks.len(), "Creating clock transport");
        Ok(Box::new(ClockTransport::new(kind, tracks)))
    }
}
