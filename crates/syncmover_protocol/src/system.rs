//! System identity and connection telemetry.

use crate::error::{ProtocolError, ProtocolResult};
use crate::Extra;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response of `GET /rest/system/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// The daemon's own device identity.
    #[serde(rename = "myID")]
    pub my_id: String,
    /// Unmodelled keys (`uptime`, `goroutines`, ...).
    #[serde(flatten)]
    pub extra: Extra,
}

impl SystemStatus {
    /// Creates a status carrying only the identity.
    pub fn new(my_id: impl Into<String>) -> Self {
        Self {
            my_id: my_id.into(),
            extra: Extra::new(),
        }
    }

    /// Decodes from a JSON body.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::decode("system status", e))
    }
}

/// Response of `GET /rest/system/connections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    /// Per-device connection records keyed by device identity.
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionInfo>,
    /// Unmodelled keys (`total`, ...).
    #[serde(flatten)]
    pub extra: Extra,
}

impl Connections {
    /// Creates an empty telemetry snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, builder style.
    pub fn with(mut self, device_id: impl Into<String>, info: ConnectionInfo) -> Self {
        self.connections.insert(device_id.into(), info);
        self
    }

    /// Returns true if the daemon reports a live connection to the device.
    /// A device missing from the telemetry is not connected.
    pub fn is_connected(&self, device_id: &str) -> bool {
        self.connections
            .get(device_id)
            .map(|c| c.connected)
            .unwrap_or(false)
    }

    /// Decodes from a JSON body.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::decode("connections", e))
    }
}

/// Connection record for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Whether a connection is currently established.
    #[serde(default)]
    pub connected: bool,
    /// Observed remote address.
    #[serde(default)]
    pub address: String,
    /// Unmodelled keys (`inBytesTotal`, `paused`, ...).
    #[serde(flatten)]
    pub extra: Extra,
}

impl ConnectionInfo {
    /// A live connection observed at `address`.
    pub fn connected(address: impl Into<String>) -> Self {
        Self {
            connected: true,
            address: address.into(),
            extra: Extra::new(),
        }
    }

    /// A known but disconnected device.
    pub fn disconnected() -> Self {
        Self::default()
    }
}
