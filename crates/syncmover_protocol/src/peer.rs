//! Desired peers and the status reported back to the caller.

use serde::{Deserialize, Serialize};

/// A remote endpoint the local instance should synchronize with.
///
/// An empty `id` marks a pending peer: its address is known but the
/// daemon identity has not been resolved yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Daemon identity of the peer.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Connection hint, possibly empty.
    #[serde(default)]
    pub address: String,
}

impl Peer {
    /// Creates a peer.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }

    /// Creates a peer whose identity is not known yet.
    pub fn pending(address: impl Into<String>) -> Self {
        Self::new("", address)
    }

    /// Returns true if the identity has not been resolved.
    pub fn is_pending(&self) -> bool {
        self.id.is_empty()
    }

    /// Returns true if this peer should be managed as a device, i.e. it is
    /// neither pending nor the local daemon itself.
    pub fn is_managed(&self, self_id: &str) -> bool {
        !self.is_pending() && self.id != self_id
    }
}

/// Observed connectivity for one desired peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    /// Daemon identity of the peer.
    #[serde(rename = "ID")]
    pub id: String,
    /// Address taken from the desired peer.
    pub address: String,
    /// Whether the daemon currently holds a live connection to the peer.
    pub connected: bool,
}

/// Status record produced by each convergence pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverStatus {
    /// Identity of the local daemon.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// One entry per managed desired peer, in input order.
    pub peers: Vec<PeerStatus>,
    /// Externally reachable data-plane address, empty until assigned.
    pub address: String,
}
