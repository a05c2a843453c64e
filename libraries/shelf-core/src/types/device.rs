/// Device description sent when opening a playback session
use serde::{Deserialize, Serialize};

/// Identifies this client to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Display name of the client application
    pub client_name: String,

    /// Client version string
    pub client_version: String,

    /// Stable per-installation device identifier
    pub device_id: String,
}
