//! Shelf Player Core
//!
//! Platform-agnostic core types, traits, and error handling for Shelf Player.
//!
//! This crate provides the building blocks shared by the server client and the
//! playback engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `PlaybackSession`, `RawAudioTrack`, `Chapter`, `DeviceInfo`
//! - **Core Traits**: `PlaybackSessionApi`, the seam to the remote media server
//! - **Error Handling**: Unified `ShelfError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use shelf_core::types::{PlayMethod, PlaybackSession};
//!
//! let json = r#"{
//!     "id": "play_1",
//!     "libraryItemId": "li_1",
//!     "playMethod": 0,
//!     "audioTracks": [],
//!     "currentTime": 42.0,
//!     "duration": 3600.0,
//!     "chapters": []
//! }"#;
//!
//! let session: PlaybackSession = serde_json::from_str(json).unwrap();
//! assert_eq!(session.play_method, PlayMethod::DirectPlay);
//! assert!(session.play_method.is_direct_play());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, ShelfError};
pub use traits::PlaybackSessionApi;

pub use types::{
    Chapter, DeviceInfo, EpisodeId, LibraryItemId, PlayMethod, PlaybackSession, RawAudioTrack,
    SessionId, StartSessionRequest, SyncPayload,
};
