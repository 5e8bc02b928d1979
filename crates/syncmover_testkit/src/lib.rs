//! # Syncmover Testkit
//!
//! Test utilities for the syncmover engine.
//!
//! This crate provides:
//! - A pass harness wiring a mover to an in-memory cluster and daemon
//! - Daemon configuration document builders
//! - Property-based test generators using proptest
//! - Test log capture
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncmover_testkit::prelude::*;
//!
//! #[test]
//! fn converges() {
//!     let harness = Harness::new(vec![Peer::new(peer_id(1), "")]);
//!     assert!(harness.pass().is_ok());
//!     assert_eq!(harness.device_ids(), vec![self_id(), peer_id(1)]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use syncmover_engine::{Context, DaemonOp, Peer, Progress};
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
