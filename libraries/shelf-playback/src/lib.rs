//! Shelf Player - Playback Session Engine
//!
//! Keeps local audio playback in lock-step with a playback session on a
//! self-hosted audiobook/podcast server.
//!
//! This crate provides:
//! - Session lifecycle against the server (start, periodic sync, close)
//! - Fault-tolerant progress sync with debounce and failure reporting
//! - A player state machine driving a platform audio transport
//! - Persisted player preferences and device identity
//! - Chapter lookup from continuous playback time
//!
//! # Architecture
//!
//! `shelf-playback` has no HTTP or audio code of its own:
//! - The server is reached through [`shelf_core::PlaybackSessionApi`]
//! - Audio output is provided through [`TransportFactory`] / [`AudioTransport`]
//! - Client-local values live in a [`shelf_storage::KeyValueStore`]
//!
//! # Example
//!
//! ```rust,no_run
//! use shelf_playback::{
//!     ClockTransportFactory, DeviceIdentity, PlaybackSessionManager, PlayerHandler,
//!     PlayerSettingsStore, SessionManagerOptions,
//! };
//! use shelf_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn demo(api: Arc<dyn shelf_core::PlaybackSessionApi>) -> shelf_playback::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let manager = PlaybackSessionManager::new(
//!     api,
//!     DeviceIdentity::new(store.clone()),
//!     SessionManagerOptions::default(),
//! );
//! let mut player = PlayerHandler::new(
//!     manager,
//!     PlayerSettingsStore::load(store),
//!     Arc::new(ClockTransportFactory::default()),
//! );
//!
//! player.load(&"li_1".into(), None, None).await?;
//! player.play()?;
//! player.jump_forward()?;
//! player.close_player().await;
//! # Ok(())
//! # }
//! ```

mod audio_track;
mod chapters;
mod device;
mod error;
mod events;
mod handler;
mod session;
pub mod settings;
mod transport;
pub mod types;

// Public exports
pub use audio_track::AudioTrack;
pub use chapters::{ChapterIndex, ChapterPosition};
pub use device::{DeviceIdentity, DETACHED_DEVICE_ID};
pub use error::{PlaybackError, Result};
pub use events::SessionEvent;
pub use handler::PlayerHandler;
pub use session::{
    PlaybackClock, PlaybackSessionManager, SessionManagerOptions, StartedSession, SyncSnapshot,
    SyncState, FIRST_SYNC_DELAY, MAX_FAILED_SYNCS, SUBSEQUENT_SYNC_INTERVAL, SYNC_DEBOUNCE_SECS,
    SYNC_TICK,
};
pub use settings::{PlayerSettings, PlayerSettingsStore, PlayerSettingsUpdate, RateStep};
pub use transport::{AudioTransport, ClockTransport, ClockTransportFactory, TransportFactory};
pub use types::{PlayerSnapshot, PlayerState, TransportKind};
