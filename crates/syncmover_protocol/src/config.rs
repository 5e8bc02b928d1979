//! The daemon's own configuration document.
//!
//! Only the fields the mover reasons about are typed. Everything else lands
//! in the `extra` overlay of the enclosing value and is written back as-is.

use crate::error::{ProtocolError, ProtocolResult};
use crate::Extra;
use serde::{Deserialize, Serialize};

/// Address keyword telling the daemon to discover a device on its own.
pub const DYNAMIC_ADDRESS: &str = "dynamic";

/// Configuration returned by `GET /rest/config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Devices known to the daemon, including the daemon itself.
    #[serde(default)]
    pub devices: Vec<RemoteDevice>,
    /// Shared folders.
    #[serde(default)]
    pub folders: Vec<RemoteFolder>,
    /// Unmodelled top-level keys (`gui`, `options`, `version`, ...).
    #[serde(flatten)]
    pub extra: Extra,
}

impl RemoteConfig {
    /// Creates a configuration with the given devices and folders.
    pub fn new(devices: Vec<RemoteDevice>, folders: Vec<RemoteFolder>) -> Self {
        Self {
            devices,
            folders,
            extra: Extra::new(),
        }
    }

    /// Returns the device with the given ID, if configured.
    pub fn device(&self, device_id: &str) -> Option<&RemoteDevice> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    /// Returns the folder with the given ID, if configured.
    pub fn folder(&self, folder_id: &str) -> Option<&RemoteFolder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }

    /// Encodes to a JSON body.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::encode("config", e))
    }

    /// Decodes from a JSON body.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::decode("config", e))
    }
}

/// A device entry in the daemon's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDevice {
    /// Device identity.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Connection hints.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Daemon-specific tuning fields (`compression`, `introducer`, ...).
    #[serde(flatten)]
    pub extra: Extra,
}

impl RemoteDevice {
    /// Creates a device entry with no extra fields.
    pub fn new(
        device_id: impl Into<String>,
        name: impl Into<String>,
        addresses: Vec<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            addresses,
            extra: Extra::new(),
        }
    }
}

/// A shared-folder definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteFolder {
    /// Folder identity.
    pub id: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Devices this folder is shared with.
    #[serde(default)]
    pub devices: Vec<FolderDevice>,
    /// Unmodelled folder keys (`path`, `type`, `rescanIntervalS`, ...).
    #[serde(flatten)]
    pub extra: Extra,
}

impl RemoteFolder {
    /// Creates a folder with the given share list.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        devices: Vec<FolderDevice>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            devices,
            extra: Extra::new(),
        }
    }

    /// Returns the IDs of the devices this folder is shared with.
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.device_id.as_str())
    }
}

/// One entry of a folder's share list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderDevice {
    /// Device identity.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Unmodelled share keys (`introducedBy`, `encryptionPassword`).
    #[serde(flatten)]
    pub extra: Extra,
}

impl FolderDevice {
    /// Creates a share entry for a device.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            extra: Extra::new(),
        }
    }
}
