//! Property-based test generators using proptest.
//!
//! Device IDs are drawn from a small pool so that generated desired peer
//! lists, daemon device lists and telemetry overlap often.

use crate::fixtures::{daemon_document, peer_id, self_id};
use proptest::prelude::*;
use serde_json::Value;
use syncmover_engine::{ConnectionInfo, Connections, Peer};

/// Size of the device ID pool; index 0 is the daemon itself.
pub const POOL_SIZE: usize = 8;

/// Strategy for generating well-formed device IDs outside the pool.
pub fn device_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z2-7]{7}(-[A-Z2-7]{7}){7}").expect("Invalid regex")
}

/// Strategy for generating a pool device ID, including the daemon's own.
pub fn pool_id_strategy() -> impl Strategy<Value = String> {
    (0..POOL_SIZE).prop_map(peer_id)
}

/// Strategy for generating peer addresses, empty included.
pub fn address_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (1u8..255).prop_map(|octet| format!("tcp://10.0.0.{octet}:22000")),
    ]
}

/// Strategy for generating a desired peer; one in five is pending.
pub fn peer_strategy() -> impl Strategy<Value = Peer> {
    prop_oneof![
        4 => (pool_id_strategy(), address_strategy()).prop_map(|(id, addr)| Peer::new(id, addr)),
        1 => address_strategy().prop_map(Peer::pending),
    ]
}

/// A generated starting point for a pass.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Device IDs the daemon starts with, in order.
    pub existing: Vec<String>,
    /// Desired peers, possibly with duplicates, self and pending entries.
    pub desired: Vec<Peer>,
    /// Pool devices reported as connected.
    pub connected: Vec<String>,
}

impl Scenario {
    /// The daemon's starting configuration document.
    pub fn document(&self) -> Value {
        daemon_document(&self.existing)
    }

    /// Telemetry reporting [`connected`](Self::connected) as connected.
    pub fn connections(&self) -> Connections {
        self.connected.iter().fold(Connections::new(), |acc, id| {
            acc.with(id.clone(), ConnectionInfo::connected("10.1.1.1:22000"))
        })
    }

    /// Returns true if the daemon starts with its own device configured.
    pub fn self_configured(&self) -> bool {
        self.existing.contains(&self_id())
    }
}

/// Strategy for generating scenarios.
///
/// Existing device lists are free of duplicates, as the daemon keeps
/// them; desired lists are not.
pub fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    (
        prop::sample::subsequence((0..POOL_SIZE).collect::<Vec<_>>(), 0..=POOL_SIZE),
        prop::collection::vec(peer_strategy(), 0..10),
        prop::sample::subsequence((0..POOL_SIZE).collect::<Vec<_>>(), 0..=POOL_SIZE),
    )
        .prop_map(|(existing, desired, connected)| Scenario {
            existing: existing.into_iter().map(peer_id).collect(),
            desired,
            connected: connected.into_iter().map(peer_id).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_device_ids_are_well_formed(id in device_id_strategy()) {
            prop_assert_eq!(id.len(), 63);
            prop_assert_eq!(id.split('-').count(), 8);
        }

        #[test]
        fn scenario_document_lists_existing_devices(scenario in scenario_strategy()) {
            let doc = scenario.document();
            prop_assert_eq!(doc["devices"].as_array().map(Vec::len), Some(scenario.existing.len()));
            prop_assert_eq!(
                scenario.self_configured(),
                scenario.existing.first() == Some(&self_id())
            );
        }
    }
}
