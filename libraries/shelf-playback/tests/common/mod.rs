//! Shared fakes for playback integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use shelf_core::{
    Chapter, EpisodeId, LibraryItemId, PlayMethod, PlaybackSession, PlaybackSessionApi,
    RawAudioTrack, SessionId, ShelfError, StartSessionRequest, SyncPayload,
};
use shelf_playback::PlaybackClock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Recorded start request
#[derive(Debug, Clone)]
pub struct StartCall {
    pub library_item_id: LibraryItemId,
    pub episode_id: Option<EpisodeId>,
    pub request: StartSessionRequest,
}

/// In-memory server that records every call
///
/// Each start returns the template session with a fresh id (`play_1`,
/// `play_2`, ...).
pub struct FakeSessionApi {
    template: Mutex<PlaybackSession>,
    next_id: AtomicU32,
    pub fail_start: AtomicBool,
    pub fail_sync: AtomicBool,
    pub fail_close: AtomicBool,
    sync_delay: Mutex<Option<Duration>>,
    starts: Mutex<Vec<StartCall>>,
    syncs: Mutex<Vec<(SessionId, SyncPayload)>>,
    closes: Mutex<Vec<(SessionId, Option<SyncPayload>)>>,
}

impl FakeSessionApi {
    pub fn new(template: PlaybackSession) -> Self {
        Self {
            template: Mutex::new(template),
            next_id: AtomicU32::new(1),
            fail_start: AtomicBool::new(false),
            fail_sync: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            sync_delay: Mutex::new(None),
            starts: Mutex::new(Vec::new()),
            syncs: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_template(&self, template: PlaybackSession) {
        *self.template.lock() = template;
    }

    pub fn set_fail_sync(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Make sync responses arrive `delay` after the request
    pub fn set_sync_delay(&self, delay: Option<Duration>) {
        *self.sync_delay.lock() = delay;
    }

    pub fn starts(&self) -> Vec<StartCall> {
        self.starts.lock().clone()
    }

    pub fn syncs(&self) -> Vec<(SessionId, SyncPayload)> {
        self.syncs.lock().clone()
    }

    pub fn closes(&self) -> Vec<(SessionId, Option<SyncPayload>)> {
        self.closes.lock().clone()
    }
}

#[async_trait]
impl PlaybackSessionApi for FakeSessionApi {
    async fn start_session(
        &self,
        library_item_id: &LibraryItemId,
        episode_id: Option<&EpisodeId>,
        request: &StartSessionRequest,
    ) -> shelf_core::Result<PlaybackSession> {
        self.starts.lock().push(StartCall {
            library_item_id: library_item_id.clone(),
            episode_id: episode_id.cloned(),
            request: request.clone(),
        });

        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ShelfError::Server {
                status: 500,
                message: "cannot start".into(),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut session = self.template.lock().clone();
        session.id = SessionId::new(format!("play_{}", n));
        session.library_item_id = library_item_id.clone();
        session.episode_id = episode_id.cloned();
        Ok(session)
    }

    async fn sync_session(
        &self,
        session_id: &SessionId,
        payload: &SyncPayload,
    ) -> shelf_core::Result<()> {
        self.syncs.lock().push((session_id.clone(), *payload));

        let delay = *self.sync_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_sync.load(Ordering::SeqCst) {
            Err(ShelfError::network("connection reset"))
        } else {
            Ok(())
        }
    }

    async fn close_session(
        &self,
        session_id: &SessionId,
        payload: Option<&SyncPayload>,
    ) -> shelf_core::Result<()> {
        self.closes.lock().push((session_id.clone(), payload.copied()));

        if self.fail_close.load(Ordering::SeqCst) {
            Err(ShelfError::network("connection reset"))
        } else {
            Ok(())
        }
    }
}

/// Clock that reports elapsed tokio time (plus an offset) while playing
pub struct TestClock {
    origin: Instant,
    offset: f64,
    playing: AtomicBool,
}

impl TestClock {
    pub fn starting_at(offset: f64) -> Self {
        Self {
            origin: Instant::now(),
            offset,
            playing: AtomicBool::new(true),
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }
}

impl PlaybackClock for TestClock {
    fn current_time(&self) -> f64 {
        self.offset + self.origin.elapsed().as_secs_f64()
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

pub fn raw_track(index: u32, start_offset: f64, duration: f64, content_url: &str) -> RawAudioTrack {
    RawAudioTrack {
        index,
        start_offset,
        duration,
        title: format!("Part {}", index),
        content_url: content_url.to_string(),
        mime_type: "audio/mpeg".to_string(),
        codec: Some("mp3".to_string()),
        metadata: None,
    }
}

/// Two-file book, 1000 s long, three chapters, resumed at `current_time`
pub fn book_session(play_method: PlayMethod, current_time: f64) -> PlaybackSession {
    let audio_tracks = if play_method.is_direct_play() {
        vec![
            raw_track(1, 0.0, 600.0, "/api/items/li_1/file/1"),
            raw_track(2, 600.0, 400.0, "/api/items/li_1/file/2"),
        ]
    } else {
        vec![raw_track(1, 0.0, 1000.0, "/hls/play/output.m3u8")]
    };

    PlaybackSession {
        id: SessionId::new("template"),
        library_item_id: LibraryItemId::new("li_1"),
        episode_id: None,
        play_method,
        audio_tracks,
        current_time,
        duration: 1000.0,
        chapters: vec![
            Chapter::new(0, "Opening", 0.0, 300.0),
            Chapter::new(1, "Middle", 300.0, 700.0),
            Chapter::new(2, "Ending", 700.0, 1000.0),
        ],
        display_title: Some("A Book".to_string()),
        display_author: Some("Someone".to_string()),
        media_type: Some("book".to_string()),
    }
}

pub fn assert_near(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {} but got {}",
        expected,
        actual
    );
}

/// Let spawned tasks run without moving the paused clock
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
