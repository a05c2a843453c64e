//! Stable per-installation device identity

use shelf_core::DeviceInfo;
use shelf_storage::{settings, KeyValueStore};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Device id reported when no local store is available
pub const DETACHED_DEVICE_ID: &str = "server";

/// Source of the device id sent with every session start
///
/// The id is read from the store on first use, generated and persisted if
/// missing, then cached. Clones share the cache.
#[derive(Clone)]
pub struct DeviceIdentity {
    store: Option<Arc<dyn KeyValueStore>>,
    cached: Arc<OnceLock<String>>,
}

impl DeviceIdentity {
    /// Identity persisted in `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: Some(store),
            cached: Arc::new(OnceLock::new()),
        }
    }

    /// Identity for a process without client-local storage
    pub fn detached() -> Self {
        Self {
            store: None,
            cached: Arc::new(OnceLock::new()),
        }
    }

    /// The device id
    ///
    /// Never fails: storage errors are logged and the generated id is still
    /// used for the lifetime of this identity.
    pub fn device_id(&self) -> String {
        let Some(store) = &self.store else {
            return DETACHED_DEVICE_ID.to_string();
        };
        self.cached
            .get_or_init(|| load_or_create(store.as_ref()))
            .clone()
    }

    /// Device description for a session start request
    pub fn device_info(&self, client_name: &str, client_version: &str) -> DeviceInfo {
        DeviceInfo {
            client_name: client_name.to_string(),
            client_version: client_version.to_string(),
            device_id: self.device_id(),
        }
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("persistent", &self.store.is_some())
            .field("device_id", &self.cached.get())
            .finish()
    }
}

fn load_or_create(store: &dyn KeyValueStore) -> String {
    match settings::get_setting::<String>(store, settings::SETTING_DEVICE_ID) {
        Ok(Some(id)) if !id.trim().is_empty() => return id,
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Failed to read device id, generating a new one"),
    }

    let id = Uuid::new_v4().to_string();
    match settings::set_setting(store, settings::SETTING_DEVICE_ID, &id) {
        Ok(()) => info!(device_id = %id, "Generated device id"),
        Err(e) => warn!(error = %e, device_id = %id, "Failed to persist device id"),
    }
    id
}
