//! Playback session manager - server session lifecycle and progress sync
//!
//! Owns the single active server session and its sync bookkeeping. A 1 s
//! background tick accumulates listening time while the local clock reports
//! playback, and pushes progress once enough has built up: 20 s before the
//! first sync of a session, 10 s after that.
//!
//! Network calls are never made with the state lock held. Each call captures
//! the session id it was made for; when the result arrives after the session
//! was closed or replaced, it is dropped without touching the new state.

use crate::audio_track::AudioTrack;
use crate::device::DeviceIdentity;
use crate::error::Result;
use crate::events::SessionEvent;
use parking_lot::Mutex;
use shelf_core::{
    EpisodeId, LibraryItemId, PlaybackSession, PlaybackSessionApi, SessionId,
    StartSessionRequest, SyncPayload,
};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Listening time required before the first sync of a session
pub const FIRST_SYNC_DELAY: Duration = Duration::from_secs(20);

/// Listening time required between later syncs
pub const SUBSEQUENT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// Sync timer period
pub const SYNC_TICK: Duration = Duration::from_secs(1);

/// Consecutive sync failures that raise [`SessionEvent::SyncFailed`]
pub const MAX_FAILED_SYNCS: u32 = 4;

/// Minimum position change, in seconds, for a sync to be sent
pub const SYNC_DEBOUNCE_SECS: f64 = 1.0;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Source of the playback position for the sync timer
pub trait PlaybackClock: Send + Sync {
    /// Position in seconds
    fn current_time(&self) -> f64;

    /// Whether time is currently being listened to
    ///
    /// Wall-clock time is only counted as listening time while this is true.
    fn is_playing(&self) -> bool {
        true
    }
}

impl<F> PlaybackClock for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn current_time(&self) -> f64 {
        self()
    }
}

/// Client identity and capabilities sent when opening sessions
#[derive(Debug, Clone)]
pub struct SessionManagerOptions {
    pub client_name: String,
    pub client_version: String,
    /// Name of the local player implementation
    pub media_player: String,
    /// Prefix for session track URLs when the server is not mounted at `/`
    pub router_base_path: String,
}

impl Default for SessionManagerOptions {
    fn default() -> Self {
        Self {
            client_name: "Shelf Player".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            media_player: "clock".to_string(),
            router_base_path: String::new(),
        }
    }
}

/// Result of a successful session start
#[derive(Debug, Clone)]
pub struct StartedSession {
    /// Session descriptor with `current_time` set to the resolved start time
    pub session: PlaybackSession,
    pub audio_tracks: Vec<AudioTrack>,
    /// Whether the server chose a stream instead of the original files
    pub is_hls_transcode: bool,
}

impl StartedSession {
    /// Position playback should begin at
    pub fn start_time(&self) -> f64 {
        self.session.current_time
    }
}

/// Per-session sync bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SyncState {
    /// Position sent with the most recent sync attempt
    pub last_sync_time: f64,
    /// Listening seconds not yet reported
    pub listening_time_since_sync: f64,
    /// Consecutive failed syncs, reset on success and on reporting
    pub failed_syncs: u32,
    /// Whether a sync has been attempted for this session
    pub has_synced: bool,
}

impl SyncState {
    fn threshold(&self) -> f64 {
        if self.has_synced {
            SUBSEQUENT_SYNC_INTERVAL.as_secs_f64()
        } else {
            FIRST_SYNC_DELAY.as_secs_f64()
        }
    }

    /// Report the accumulated time as whole seconds and reset the accumulator
    fn take_listened(&mut self) -> u64 {
        let listened = self.listening_time_since_sync.max(0.0).floor() as u64;
        self.listening_time_since_sync = 0.0;
        listened
    }
}

/// Read-only view of the active session's sync state
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub session_id: SessionId,
    pub sync: SyncState,
}

struct ActiveSession {
    session: PlaybackSession,
    sync: SyncState,
}

enum SessionSlot {
    NoSession,
    Active(ActiveSession),
}

impl SessionSlot {
    fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        match self {
            Self::Active(active) => Some(active),
            Self::NoSession => None,
        }
    }

    /// The active session, only if it is `session_id`
    fn matching_mut(&mut self, session_id: &SessionId) -> Option<&mut ActiveSession> {
        self.active_mut()
            .filter(|active| &active.session.id == session_id)
    }
}

struct ManagerState {
    slot: SessionSlot,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    api: Arc<dyn PlaybackSessionApi>,
    identity: DeviceIdentity,
    options: SessionManagerOptions,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Claim a sync for `current_time`, unless debounced
    fn prepare_sync(&self, current_time: f64) -> Option<(SessionId, SyncPayload)> {
        let mut state = self.state.lock();
        let active = state.slot.active_mut()?;
        Self::prepare_sync_locked(active, current_time)
    }

    fn prepare_sync_locked(
        active: &mut ActiveSession,
        current_time: f64,
    ) -> Option<(SessionId, SyncPayload)> {
        if (active.sync.last_sync_time - current_time).abs() < SYNC_DEBOUNCE_SECS {
            trace!(
                session_id = %active.session.id,
                current_time,
                last_sync_time = active.sync.last_sync_time,
                "Skipping sync, position barely moved"
            );
            return None;
        }

        active.sync.last_sync_time = current_time;
        active.sync.has_synced = true;
        let time_listened = active.sync.take_listened();

        Some((
            active.session.id.clone(),
            SyncPayload {
                current_time,
                time_listened,
            },
        ))
    }

    /// Add one tick's listening time; returns a sync to send once due
    fn accumulate(
        &self,
        elapsed: f64,
        current_time: f64,
    ) -> Option<(SessionId, SyncPayload)> {
        let mut state = self.state.lock();
        let active = state.slot.active_mut()?;

        active.sync.listening_time_since_sync += elapsed;
        if active.sync.listening_time_since_sync >= active.sync.threshold() {
            Self::prepare_sync_locked(active, current_time)
        } else {
            None
        }
    }

    async fn send_sync(&self, session_id: SessionId, payload: SyncPayload) {
        debug!(
            session_id = %session_id,
            current_time = payload.current_time,
            time_listened = payload.time_listened,
            "Syncing progress"
        );

        let result = self.api.sync_session(&session_id, &payload).await;

        let event = {
            let mut state = self.state.lock();
            let Some(active) = state.slot.matching_mut(&session_id) else {
                debug!(session_id = %session_id, "Ignoring sync result for a session that is no longer active");
                return;
            };

            match result {
                Ok(()) => {
                    active.sync.failed_syncs = 0;
                    None
                }
                Err(e) => {
                    active.sync.failed_syncs += 1;
                    warn!(
                        session_id = %session_id,
                        failed_syncs = active.sync.failed_syncs,
                        error = %e,
                        "Progress sync failed"
                    );

                    if active.sync.failed_syncs >= MAX_FAILED_SYNCS {
                        active.sync.failed_syncs = 0;
                        Some(SessionEvent::SyncFailed {
                            session_id: session_id.clone(),
                            message: e.to_string(),
                        })
                    } else {
                        None
                    }
                }
            }
        };

        if let Some(event) = event {
            error!(session_id = %session_id, "Progress sync keeps failing");
            self.emit(event);
        }
    }
}

/// Owner of the active server playback session
///
/// Cloning yields another handle to the same manager.
///
/// # Example
///
/// ```rust,no_run
/// use shelf_playback::{DeviceIdentity, PlaybackSessionManager, SessionManagerOptions};
/// use std::sync::Arc;
/// # async fn demo(api: Arc<dyn shelf_core::PlaybackSessionApi>) -> shelf_playback::Result<()> {
/// let manager = PlaybackSessionManager::new(
///     api,
///     DeviceIdentity::detached(),
///     SessionManagerOptions::default(),
/// );
///
/// let started = manager
///     .start_session(&"li_1".into(), vec!["audio/mpeg".into()], None, None)
///     .await?;
/// let start = started.start_time();
/// manager.start_sync_interval(Arc::new(move || start));
///
/// manager.close_session(None).await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PlaybackSessionManager {
    shared: Arc<Shared>,
}

impl PlaybackSessionManager {
    pub fn new(
        api: Arc<dyn PlaybackSessionApi>,
        identity: DeviceIdentity,
        options: SessionManagerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                api,
                identity,
                options,
                state: Mutex::new(ManagerState {
                    slot: SessionSlot::NoSession,
                    timer: None,
                }),
                events,
            }),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn options(&self) -> &SessionManagerOptions {
        &self.shared.options
    }

    /// Id of the active session
    pub fn session_id(&self) -> Option<SessionId> {
        match &self.shared.state.lock().slot {
            SessionSlot::Active(active) => Some(active.session.id.clone()),
            SessionSlot::NoSession => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.shared.state.lock().slot, SessionSlot::Active(_))
    }

    /// Copy of the active session's sync state
    pub fn sync_snapshot(&self) -> Option<SyncSnapshot> {
        match &self.shared.state.lock().slot {
            SessionSlot::Active(active) => Some(SyncSnapshot {
                session_id: active.session.id.clone(),
                sync: active.sync,
            }),
            SessionSlot::NoSession => None,
        }
    }

    /// Open a server session for an item (or one podcast episode)
    ///
    /// The start position is `start_time_override` when given, otherwise the
    /// server's last known position. A session that is already active is
    /// replaced without being closed. The sync timer is not started.
    pub async fn start_session(
        &self,
        library_item_id: &LibraryItemId,
        supported_mime_types: Vec<String>,
        episode_id: Option<&EpisodeId>,
        start_time_override: Option<f64>,
    ) -> Result<StartedSession> {
        let shared = &self.shared;
        let options = &shared.options;

        let request = StartSessionRequest::new(
            shared
                .identity
                .device_info(&options.client_name, &options.client_version),
            supported_mime_types,
            options.media_player.clone(),
        );

        info!(
            library_item_id = %library_item_id,
            episode_id = ?episode_id.map(EpisodeId::as_str),
            "Starting playback session"
        );

        let session = match shared
            .api
            .start_session(library_item_id, episode_id, &request)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(library_item_id = %library_item_id, error = %e, "Failed to start playback session");
                shared.emit(SessionEvent::StartFailed {
                    library_item_id: library_item_id.clone(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let start_time = start_time_override
            .filter(|t| t.is_finite() && *t >= 0.0)
            .unwrap_or(session.current_time);
        let is_hls_transcode = !session.play_method.is_direct_play();
        let audio_tracks: Vec<AudioTrack> = session
            .audio_tracks
            .iter()
            .cloned()
            .map(|raw| {
                AudioTrack::with_router_base_path(
                    raw,
                    session.id.clone(),
                    &options.router_base_path,
                )
            })
            .collect();
        let session = session.with_current_time(start_time);

        {
            let mut state = shared.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            if let SessionSlot::Active(previous) = &state.slot {
                warn!(
                    previous_session_id = %previous.session.id,
                    "Replacing a playback session that was not closed"
                );
            }
            state.slot = SessionSlot::Active(ActiveSession {
                session: session.clone(),
                sync: SyncState::default(),
            });
        }

        info!(
            session_id = %session.id,
            play_method = ?session.play_method,
            start_time,
            tracks = audio_tracks.len(),
            "Playback session started"
        );

        shared.emit(SessionEvent::Started {
            session_id: session.id.clone(),
            library_item_id: library_item_id.clone(),
            start_time,
            is_hls_transcode,
        });

        Ok(StartedSession {
            session,
            audio_tracks,
            is_hls_transcode,
        })
    }

    /// Push progress for the active session
    ///
    /// Does nothing without a session, or when `current_time` is within 1 s
    /// of the last synced position. Failures are counted, never returned.
    pub async fn sync_progress(&self, current_time: f64) {
        if let Some((session_id, payload)) = self.shared.prepare_sync(current_time) {
            self.shared.send_sync(session_id, payload).await;
        }
    }

    /// Start the periodic sync timer, replacing any running one
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sync_interval(&self, clock: Arc<dyn PlaybackClock>) {
        let handle = tokio::spawn(run_sync_timer(Arc::downgrade(&self.shared), clock));

        let previous = self.shared.state.lock().timer.replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!("Sync timer started");
    }

    /// Stop the periodic sync timer; safe to call when none is running
    ///
    /// A sync already sent by the timer still completes.
    pub fn stop_sync_interval(&self) {
        if let Some(timer) = self.shared.state.lock().timer.take() {
            timer.abort();
            debug!("Sync timer stopped");
        }
    }

    /// Close the active session
    ///
    /// The timer is stopped first and local state is always cleared. The close
    /// request carries a final progress payload only when more than
    /// [`FIRST_SYNC_DELAY`] of listening is unreported and `clock` is given.
    /// A failed close is logged and otherwise ignored.
    pub async fn close_session(&self, clock: Option<&dyn PlaybackClock>) {
        self.stop_sync_interval();

        let active = {
            let mut state = self.shared.state.lock();
            match std::mem::replace(&mut state.slot, SessionSlot::NoSession) {
                SessionSlot::Active(active) => active,
                SessionSlot::NoSession => {
                    debug!("No playback session to close");
                    return;
                }
            }
        };

        let mut sync = active.sync;
        let payload = match clock {
            Some(clock)
                if sync.listening_time_since_sync > FIRST_SYNC_DELAY.as_secs_f64() =>
            {
                Some(SyncPayload {
                    current_time: clock.current_time(),
                    time_listened: sync.take_listened(),
                })
            }
            _ => None,
        };

        let session_id = active.session.id;
        info!(
            session_id = %session_id,
            with_progress = payload.is_some(),
            "Closing playback session"
        );

        if let Err(e) = self
            .shared
            .api
            .close_session(&session_id, payload.as_ref())
            .await
        {
            warn!(session_id = %session_id, error = %e, "Failed to close playback session");
        }

        self.shared.emit(SessionEvent::Closed {
            session_id,
            with_progress: payload.is_some(),
        });
    }
}

async fn run_sync_timer(shared: Weak<Shared>, clock: Arc<dyn PlaybackClock>) {
    let mut ticker = tokio::time::interval(SYNC_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately
    ticker.tick().await;
    let mut last_tick = Instant::now();

    loop {
        ticker.tick().await;

        let now = Instant::now();
        let elapsed = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;

        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !clock.is_playing() {
            continue;
        }

        if let Some((session_id, payload)) = shared.accumulate(elapsed, clock.current_time()) {
            // Detached so stopping the timer never cancels a request in flight
            tokio::spawn(async move {
                shared.send_sync(session_id, payload).await;
            });
        }
    }
}
