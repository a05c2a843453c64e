//! Shelf Player Storage
//!
//! Client-local persistence for the small values the player keeps between
//! runs: the device identity and the player settings.
//!
//! # Architecture
//!
//! - **`KeyValueStore`**: JSON values under string keys, synchronous writes
//! - **`JsonFileStore`**: one JSON document on disk, rewritten atomically on every change
//! - **`MemoryStore`**: process-local map for tests and ephemeral sessions
//! - **`settings`**: typed get/set helpers and the well-known keys
//!
//! # Example
//!
//! ```rust,no_run
//! use shelf_storage::{settings, JsonFileStore};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileStore::open("/tmp/shelf/client.json")?;
//!
//! settings::set_setting(&store, settings::SETTING_DEVICE_ID, &"device-123")?;
//! let id: Option<String> = settings::get_setting(&store, settings::SETTING_DEVICE_ID)?;
//! assert_eq!(id.as_deref(), Some("device-123"));
//! # Ok(())
//! # }
//! ```

mod error;
mod file;
mod memory;
pub mod settings;
mod store;

pub use error::{Result, StorageError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use store::KeyValueStore;
