//! Player handler - local player state machine
//!
//! Coordinates session manager, settings, and local transport

use crate::chapters::ChapterIndex;
use crate::error::{PlaybackError, Result};
use crate::session::{PlaybackClock, PlaybackSessionManager};
use crate::settings::{PlayerSettings, PlayerSettingsStore, PlayerSettingsUpdate};
use crate::transport::{AudioTransport, TransportFactory};
use crate::types::{PlayerSnapshot, PlayerState, TransportKind};
use parking_lot::Mutex;
use shelf_core::{EpisodeId, LibraryItemId, SessionId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Seconds into a chapter after which "previous chapter" restarts it instead
const PREVIOUS_CHAPTER_RESTART_THRESHOLD: f64 = 3.0;

type SharedTransport = Arc<Mutex<Box<dyn AudioTransport>>>;

/// Clock bound to the live transport, read by the sync timer
struct TransportClock {
    transport: SharedTransport,
}

impl PlaybackClock for TransportClock {
    fn current_time(&self) -> f64 {
        self.transport.lock().current_time()
    }

    fn is_playing(&self) -> bool {
        self.transport.lock().is_playing()
    }
}

/// What is loaded right now
struct Loaded {
    session_id: SessionId,
    is_hls_transcode: bool,
    chapters: ChapterIndex,
    transport: SharedTransport,
}

/// Player state machine
///
/// `Idle -> Loading -> Paused <-> Playing -> Idle`, with `Error` reachable
/// from `Loading` (the server refused the session) and from a loaded state
/// (the transport failed). Loading again recovers from `Error`.
pub struct PlayerHandler {
    manager: PlaybackSessionManager,
    settings: PlayerSettingsStore,
    factory: Arc<dyn TransportFactory>,
    state: PlayerState,
    loaded: Option<Loaded>,
    /// Volume (0.0 - 1.0), kept across loads
    volume: f64,
    last_error: Option<String>,
}

impl PlayerHandler {
    pub fn new(
        manager: PlaybackSessionManager,
        settings: PlayerSettingsStore,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            manager,
            settings,
            factory,
            state: PlayerState::Idle,
            loaded: None,
            volume: 1.0,
            last_error: None,
        }
    }

    /// `Paused` once playback has run off the end of the media
    pub fn state(&self) -> PlayerState {
        if self.reached_end() {
            PlayerState::Paused
        } else {
            self.state
        }
    }

    /// Message of the failure that put the player into `Error`
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn settings(&self) -> PlayerSettings {
        self.settings.settings()
    }

    pub fn manager(&self) -> &PlaybackSessionManager {
        &self.manager
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Open a session and prepare local playback, leaving the player paused
    ///
    /// Any session already loaded is closed first. A failure leaves the player
    /// in `Error` and is not retried.
    pub async fn load(
        &mut self,
        library_item_id: &LibraryItemId,
        episode_id: Option<&EpisodeId>,
        start_time_override: Option<f64>,
    ) -> Result<()> {
        if self.loaded.is_some() || self.manager.is_active() {
            info!("Closing current session before loading a new one");
            self.close_player().await;
        }

        self.state = PlayerState::Loading;
        self.last_error = None;

        let started = match self
            .manager
            .start_session(
                library_item_id,
                self.factory.supported_mime_types(),
                episode_id,
                start_time_override,
            )
            .await
        {
            Ok(started) => started,
            Err(e) => return Err(self.fail(e)),
        };

        let kind = if started.is_hls_transcode {
            TransportKind::HlsStream
        } else {
            TransportKind::Direct
        };

        let mut transport = match self.factory.create(kind, &started.audio_tracks) {
            Ok(transport) => transport,
            Err(e) => {
                // The server session is useless without local playback
                self.manager.close_session(None).await;
                return Err(self.fail(e));
            }
        };

        let settings = self.settings.settings();
        transport.set_volume(self.volume);
        transport.set_playback_rate(settings.playback_rate);
        let duration = transport.duration().max(0.0);
        transport.seek(started.start_time().clamp(0.0, duration));

        let transport: SharedTransport = Arc::new(Mutex::new(transport));
        self.manager.start_sync_interval(Arc::new(TransportClock {
            transport: transport.clone(),
        }));

        info!(
            session_id = %started.session.id,
            ?kind,
            start_time = started.start_time(),
            chapters = started.session.chapters.len(),
            "Player loaded"
        );

        self.loaded = Some(Loaded {
            session_id: started.session.id.clone(),
            is_hls_transcode: started.is_hls_transcode,
            chapters: ChapterIndex::new(started.session.chapters),
            transport,
        });
        self.state = PlayerState::Paused;
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        self.settle_end();
        match self.state {
            PlayerState::Playing => return Ok(()),
            PlayerState::Paused => {}
            other => {
                return Err(PlaybackError::InvalidState(format!(
                    "cannot play while {:?}",
                    other
                )))
            }
        }

        let transport = self.transport()?;
        let result = transport.lock().play();
        match result {
            Ok(()) => {
                self.state = PlayerState::Playing;
                debug!("Playback started");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        self.settle_end();
        match self.state {
            PlayerState::Paused => Ok(()),
            PlayerState::Playing => {
                self.transport()?.lock().pause();
                self.state = PlayerState::Paused;
                debug!("Playback paused");
                Ok(())
            }
            other => Err(PlaybackError::InvalidState(format!(
                "cannot pause while {:?}",
                other
            ))),
        }
    }

    pub fn play_pause(&mut self) -> Result<()> {
        if self.state() == PlayerState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Move to `time`, clamped to the media; returns the applied position
    ///
    /// Does not force a progress sync.
    pub fn seek(&mut self, time: f64) -> Result<f64> {
        self.settle_end();
        let transport = self.transport()?;
        let mut transport = transport.lock();
        let time = if time.is_finite() { time } else { 0.0 };
        let time = time.clamp(0.0, transport.duration().max(0.0));
        transport.seek(time);
        debug!(time, "Seeked");
        Ok(time)
    }

    pub fn jump_forward(&mut self) -> Result<f64> {
        let amount = self.settings.settings().jump_forward_amount;
        let current = self.current_time()?;
        self.seek(current + amount)
    }

    pub fn jump_backward(&mut self) -> Result<f64> {
        let amount = self.settings.settings().jump_backward_amount;
        let current = self.current_time()?;
        self.seek(current - amount)
    }

    /// Jump to the start of the next chapter; returns whether there was one
    pub fn seek_next_chapter(&mut self) -> Result<bool> {
        let current = self.current_time()?;
        let next_start = self
            .chapters()
            .and_then(|chapters| chapters.next(current))
            .map(|chapter| chapter.start);

        match next_start {
            Some(start) => {
                self.seek(start)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restart the current chapter, or go to the previous one when near its start
    pub fn seek_previous_chapter(&mut self) -> Result<f64> {
        let current = self.current_time()?;
        let target = self.chapters().map_or(0.0, |chapters| {
            let position = chapters.lookup(current);
            match (position.current, position.previous) {
                (Some(chapter), _)
                    if current - chapter.start > PREVIOUS_CHAPTER_RESTART_THRESHOLD =>
                {
                    chapter.start
                }
                (Some(_), Some(previous)) => previous.start,
                (Some(chapter), None) => chapter.start,
                (None, _) => 0.0,
            }
        });
        self.seek(target)
    }

    /// Set volume, clamped to `[0, 1]`; returns the applied volume
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 1.0);
        }
        if let Some(loaded) = &self.loaded {
            loaded.transport.lock().set_volume(self.volume);
        }
        self.volume
    }

    /// Set and persist the playback rate; returns the applied rate
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<f64> {
        let rate = self.settings.set_playback_rate(rate)?;
        self.apply_playback_rate(rate);
        Ok(rate)
    }

    pub fn increment_playback_rate(&mut self) -> Result<f64> {
        let rate = self.settings.increment_playback_rate()?;
        self.apply_playback_rate(rate);
        Ok(rate)
    }

    pub fn decrement_playback_rate(&mut self) -> Result<f64> {
        let rate = self.settings.decrement_playback_rate()?;
        self.apply_playback_rate(rate);
        Ok(rate)
    }

    /// Apply a partial settings change and persist it
    pub fn update_settings(&mut self, update: PlayerSettingsUpdate) -> Result<PlayerSettings> {
        let previous_rate = self.settings.settings().playback_rate;
        let settings = self.settings.update_settings(update)?;
        if (settings.playback_rate - previous_rate).abs() > f64::EPSILON {
            self.apply_playback_rate(settings.playback_rate);
        }
        Ok(settings)
    }

    /// Close the session and release the transport
    ///
    /// The server is told about unreported listening time where it applies;
    /// any failure doing so is logged, and the player always ends `Idle`.
    pub async fn close_player(&mut self) {
        let loaded = self.loaded.take();
        let clock = loaded.as_ref().map(|loaded| TransportClock {
            transport: loaded.transport.clone(),
        });

        self.manager
            .close_session(clock.as_ref().map(|clock| clock as &dyn PlaybackClock))
            .await;

        if let Some(loaded) = loaded {
            loaded.transport.lock().destroy();
            info!(session_id = %loaded.session_id, "Player closed");
        }

        self.state = PlayerState::Idle;
        self.last_error = None;
    }

    /// Current player state for display
    pub fn snapshot(&self) -> PlayerSnapshot {
        let settings = self.settings.settings();
        let Some(loaded) = &self.loaded else {
            let mut snapshot = PlayerSnapshot::idle(
                self.volume,
                settings.playback_rate,
                settings.use_chapter_track,
            );
            snapshot.state = self.state;
            return snapshot;
        };

        let (current_time, duration, buffered_time, playback_rate) = {
            let transport = loaded.transport.lock();
            (
                transport.current_time(),
                transport.duration(),
                transport.buffered_time(),
                transport.playback_rate(),
            )
        };
        let position = loaded.chapters.lookup(current_time);

        PlayerSnapshot {
            state: self.state(),
            session_id: Some(loaded.session_id.clone()),
            is_hls_transcode: loaded.is_hls_transcode,
            current_time,
            duration,
            buffered_time,
            volume: self.volume,
            playback_rate,
            current_chapter: position.current.cloned(),
            next_chapter: position.next.cloned(),
            previous_chapter: position.previous.cloned(),
            use_chapter_track: settings.use_chapter_track,
        }
    }

    fn transport(&self) -> Result<SharedTransport> {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.transport.clone())
            .ok_or(PlaybackError::NoActiveSession)
    }

    fn chapters(&self) -> Option<&ChapterIndex> {
        self.loaded.as_ref().map(|loaded| &loaded.chapters)
    }

    fn current_time(&self) -> Result<f64> {
        Ok(self.transport()?.lock().current_time())
    }

    fn reached_end(&self) -> bool {
        self.state == PlayerState::Playing
            && self
                .loaded
                .as_ref()
                .is_some_and(|loaded| !loaded.transport.lock().is_playing())
    }

    /// Drop from `Playing` to `Paused` when the transport ran out of media
    fn settle_end(&mut self) {
        if !self.reached_end() {
            return;
        }
        if let Some(loaded) = &self.loaded {
            loaded.transport.lock().pause();
        }
        self.state = PlayerState::Paused;
        debug!("Reached the end of the media");
    }

    fn apply_playback_rate(&self, rate: f64) {
        if let Some(loaded) = &self.loaded {
            loaded.transport.lock().set_playback_rate(rate);
        }
        debug!(rate, "Playback rate changed");
    }

    /// Enter `Error`; the sync timer stops but the session stays open for close
    fn fail(&mut self, err: PlaybackError) -> PlaybackError {
        match &err {
            PlaybackError::Transport(_) => {
                error!(error = %err, "Transport failed");
                self.manager.stop_sync_interval();
            }
            _ => warn!(error = %err, "Player error"),
        }
        self.state = PlayerState::Error;
        self.last_error = Some(err.to_string());
        err
    }
}
