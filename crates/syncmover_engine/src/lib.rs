//! # Syncmover Engine
//!
//! Convergence controller for a peer-sync replication mover.
//!
//! This crate provides:
//! - Peer configuration reconciliation (device and folder lists)
//! - Per-peer connectivity status aggregation
//! - Cluster resource ensuring (claims, secret, job, services)
//! - A daemon control client abstraction with an HTTP implementation
//! - The convergence pass orchestrator
//!
//! ## Architecture
//!
//! A scheduler calls [`Mover::run_pass`] on a fixed interval. One pass:
//! 1. Confirms the caller's data claim exists
//! 2. Ensures the config claim, API key secret, job and both services
//! 3. Fetches the daemon's config and identity
//! 4. Reconciles devices and folders, pushing only when they differ
//! 5. Collects connection telemetry into the status record
//!
//! ## Key Invariants
//!
//! - The daemon's own identity is never added or removed as a device
//! - Pending peers never become devices
//! - Folder share lists are derived from the device list
//! - Unmodelled daemon config fields survive a push unchanged
//! - Passes are idempotent; no state carries over but the cached credential

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod daemon;
mod error;
mod http;
mod mover;
mod reconcile;
pub mod resources;
mod status;

pub use config::{
    MoverConfig, DEFAULT_API_URL, DEFAULT_CONFIG_CAPACITY, DEFAULT_IMAGE, DEFAULT_RETRY_AFTER,
};
pub use context::Context;
pub use daemon::{DaemonClient, DaemonOp, MockDaemon};
pub use error::{MoverError, MoverResult};
#[cfg(feature = "http")]
pub use http::{connect, ReqwestClient};
pub use http::{HttpClient, HttpDaemonClient, HttpRequest, HttpResponse, Method, API_KEY_HEADER};
pub use mover::{Mover, MoverStats, PassOutcome, Progress, MOVER_NAME};
pub use reconcile::{device_name, updated_folders, PeerReconciler};
pub use resources::{MemoryCluster, ResourceDriver};
pub use status::aggregate_status;

pub use syncmover_protocol::{
    ConnectionInfo, Connections, FolderDevice, MoverStatus, Peer, PeerStatus, RemoteConfig,
    RemoteDevice, RemoteFolder, SystemStatus,
};
