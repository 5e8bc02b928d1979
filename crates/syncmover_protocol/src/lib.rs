//! # Syncmover Protocol
//!
//! Wire types for the peer-sync daemon's control API and for the status
//! record the mover reports back to its caller.
//!
//! This crate provides:
//! - `RemoteConfig`, `RemoteDevice`, `RemoteFolder` for the daemon's own configuration
//! - `SystemStatus` and `Connections` for identity and connection telemetry
//! - `Peer` (desired input) and `PeerStatus` / `MoverStatus` (reported output)
//!
//! Every daemon-owned type keeps the JSON keys it does not model in an
//! ordered overlay, so a fetch → merge → push cycle never drops
//! daemon-specific tuning fields.
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod peer;
mod system;

pub use config::{FolderDevice, RemoteConfig, RemoteDevice, RemoteFolder, DYNAMIC_ADDRESS};
pub use error::{ProtocolError, ProtocolResult};
pub use peer::{MoverStatus, Peer, PeerStatus};
pub use system::{ConnectionInfo, Connections, SystemStatus};

/// Unmodelled JSON keys carried alongside a typed view.
pub type Extra = serde_json::Map<String, serde_json::Value>;
