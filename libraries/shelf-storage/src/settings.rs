//! Typed settings access
//!
//! Settings are stored as key-value pairs with JSON-serialized values for flexibility.
//!
//! # Example
//!
//! ```rust
//! use shelf_storage::{settings, MemoryStore};
//!
//! let store = MemoryStore::new();
//! settings::set_setting(&store, settings::SETTING_DEVICE_ID, &"abc").unwrap();
//!
//! let id: Option<String> = settings::get_setting(&store, settings::SETTING_DEVICE_ID).unwrap();
//! assert_eq!(id.as_deref(), Some("abc"));
//! ```

use crate::error::Result;
use crate::store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// Setting key constants
/// Stable per-installation device identifier (UUID string)
pub const SETTING_DEVICE_ID: &str = "device.id";

/// Player preferences (jump amounts, playback rate, rate step)
pub const SETTING_PLAYER_SETTINGS: &str = "player.settings";

/// Setting entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSetting {
    /// Setting key
    pub key: String,
    /// Setting value (JSON)
    pub value: serde_json::Value,
}

/// Get a single setting value
///
/// Returns `Ok(None)` if the key was never written.
///
/// # Errors
///
/// Returns an error if the store fails or the stored value does not match `T`
pub fn get_setting<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Set a setting value (JSON-serialized)
///
/// # Errors
///
/// Returns an error if serialization or the write fails
pub fn set_setting<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value)?;
    store.set(key, value)
}

/// Get all settings
///
/// # Errors
///
/// Returns an error if the store cannot be read
pub fn get_all_settings(store: &dyn KeyValueStore) -> Result<Vec<UserSetting>> {
    Ok(store
        .entries()?
        .into_iter()
        .map(|(key, value)| UserSetting { key, value })
        .collect())
}

/// Delete a setting
///
/// Returns `Ok(true)` if a setting was deleted, `Ok(false)` if no setting was found
///
/// # Errors
///
/// Returns an error if the write fails
pub fn delete_setting(store: &dyn KeyValueStore, key: &str) -> Result<bool> {
    store.remove(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        volume: f64,
        muted: bool,
    }

    #[test]
    fn typed_roundtrip() {
        let store = MemoryStore::new();
        let prefs = Prefs {
            volume: 0.5,
            muted: true,
        };

        set_setting(&store, "ui.prefs", &prefs).unwrap();
        let loaded: Option<Prefs> = get_setting(&store, "ui.prefs").unwrap();
        assert_eq!(loaded, Some(prefs));
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let store = MemoryStore::new();
        set_setting(&store, SETTING_DEVICE_ID, &42).unwrap();

        let result: Result<Option<Prefs>> = get_setting(&store, SETTING_DEVICE_ID);
        assert!(result.is_err());
    }

    #[test]
    fn get_all_and_delete() {
        let store = MemoryStore::new();
        set_setting(&store, SETTING_DEVICE_ID, &"dev").unwrap();
        set_setting(&store, SETTING_PLAYER_SETTINGS, &serde_json::json!({})).unwrap();

        let all = get_all_settings(&store).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, SETTING_DEVICE_ID);

        assert!(delete_setting(&store, SETTING_DEVICE_ID).unwrap());
        assert!(!delete_setting(&store, SETTING_DEVICE_ID).unwrap());
        assert_eq!(get_all_settings(&store).unwrap().len(), 1);
    }
}
