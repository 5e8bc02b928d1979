//! Per-peer connectivity status.

use syncmover_protocol::{Connections, Peer, PeerStatus};

/// Builds one status entry per managed desired peer, in input order.
///
/// A peer the telemetry does not mention is reported as disconnected.
pub fn aggregate_status(
    desired: &[Peer],
    self_id: &str,
    telemetry: &Connections,
) -> Vec<PeerStatus> {
    desired
        .iter()
        .filter(|peer| peer.is_managed(self_id))
        .map(|peer| PeerStatus {
            id: peer.id.clone(),
            address: peer.address.clone(),
            connected: telemetry.is_connected(&peer.id),
        })
        .collect()
}
