//! Test fixtures and pass helpers.
//!
//! Provides a [`Harness`] that runs passes of a real [`Mover`] against an
//! in-memory cluster and daemon, plus builders for daemon configuration
//! documents carrying fields the mover does not model.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use syncmover_engine::resources::{
    AccessMode, ObjectKey, ObjectMeta, Resource, Secret, VolumeClaim, API_KEY_SECRET_KEY,
    API_KEY_SECRET_NAME,
};
use syncmover_engine::{Context, MemoryCluster, MockDaemon, Mover, MoverConfig, PassOutcome, Peer};

/// Namespace used by fixtures.
pub const NAMESPACE: &str = "replication";
/// Data claim seeded by fixtures.
pub const DATA_CLAIM: &str = "app-data";
/// API key seeded into the secret and required by the daemon.
pub const TEST_API_KEY: &str = "testkit-api-key";
/// Folder present in fixture documents.
pub const FOLDER_ID: &str = "data";

/// Device ID of the daemon under test.
pub fn self_id() -> String {
    peer_id(0)
}

/// A well-formed device ID, distinct for each `n`.
pub fn peer_id(n: usize) -> String {
    format!("{n:07}-AAAAAAA-BBBBBBB-CCCCCCC-DDDDDDD-EEEEEEE-FFFFFFF-GGGGGGG")
}

/// A daemon configuration document listing `device_ids` as devices and
/// as the share list of one folder, with unmodelled fields at every level.
pub fn daemon_document(device_ids: &[String]) -> Value {
    let devices: Vec<Value> = device_ids
        .iter()
        .map(|id| {
            json!({
                "deviceID": id,
                "name": format!("dev-{}", &id[..7]),
                "addresses": ["dynamic"],
                "compression": "metadata",
                "introducer": false,
                "paused": false
            })
        })
        .collect();
    let shares: Vec<Value> = device_ids
        .iter()
        .map(|id| json!({"deviceID": id, "introducedBy": "", "encryptionPassword": ""}))
        .collect();

    json!({
        "version": 37,
        "devices": devices,
        "folders": [{
            "id": FOLDER_ID,
            "label": "Data",
            "path": "/data",
            "type": "sendreceive",
            "rescanIntervalS": 3600,
            "devices": shares
        }],
        "gui": {"enabled": true, "address": "0.0.0.0:8384", "apiKey": TEST_API_KEY},
        "ldap": {},
        "options": {"listenAddresses": ["default"], "globalAnnounceEnabled": false},
        "remoteIgnoredDevices": [],
        "defaults": {"folder": {"path": "~"}, "device": {"compression": "metadata"}}
    })
}

/// Removes `devices` and every folder's `devices` from a document,
/// leaving only the fields the mover must carry through untouched.
pub fn unmodelled_fields(document: &Value) -> Value {
    let mut rest = document.clone();
    if let Some(map) = rest.as_object_mut() {
        map.remove("devices");
    }
    if let Some(folders) = rest.get_mut("folders").and_then(Value::as_array_mut) {
        for folder in folders {
            if let Some(map) = folder.as_object_mut() {
                map.remove("devices");
            }
        }
    }
    rest
}

/// Mover configuration for the fixture namespace and data claim.
pub fn test_config(peers: Vec<Peer>) -> MoverConfig {
    MoverConfig::new(NAMESPACE, DATA_CLAIM).with_peers(peers)
}

/// A cluster holding the data claim and an API key secret.
pub fn seeded_cluster() -> MemoryCluster {
    let cluster = MemoryCluster::new();
    cluster.insert(Resource::VolumeClaim(VolumeClaim {
        meta: ObjectMeta::new(NAMESPACE, DATA_CLAIM),
        access_modes: vec![AccessMode::ReadWriteOnce],
        storage_request: "10Gi".to_string(),
    }));
    cluster.insert(Resource::Secret(Secret {
        meta: ObjectMeta::new(NAMESPACE, API_KEY_SECRET_NAME),
        secret_type: "Opaque".to_string(),
        data: BTreeMap::from([(
            API_KEY_SECRET_KEY.to_string(),
            TEST_API_KEY.as_bytes().to_vec(),
        )]),
    }));
    cluster
}

/// Key of a fixture object.
pub fn object_key(name: &str) -> ObjectKey {
    ObjectKey::new(NAMESPACE, name)
}

/// A mover wired to an in-memory cluster and daemon.
///
/// The cluster and daemon are shared, so a harness can be
/// [`reconfigured`](Self::reconfigured) with new peers and keep their state.
pub struct Harness {
    /// The mover under test.
    pub mover: Mover<MemoryCluster, MockDaemon>,
    cluster: Arc<MemoryCluster>,
    daemon: Arc<MockDaemon>,
}

impl Harness {
    /// Creates a harness whose daemon knows only itself.
    pub fn new(peers: Vec<Peer>) -> Self {
        Self::with_devices(peers, &[self_id()])
    }

    /// Creates a harness whose daemon starts with `device_ids` configured.
    pub fn with_devices(peers: Vec<Peer>, device_ids: &[String]) -> Self {
        let daemon = MockDaemon::new(self_id(), daemon_document(device_ids));
        daemon.require_api_key(TEST_API_KEY);
        Self::from_parts(test_config(peers), Arc::new(seeded_cluster()), Arc::new(daemon))
    }

    /// Creates a harness from existing parts.
    pub fn from_parts(
        config: MoverConfig,
        cluster: Arc<MemoryCluster>,
        daemon: Arc<MockDaemon>,
    ) -> Self {
        let mover = Mover::with_shared(config, Arc::clone(&cluster), Arc::clone(&daemon));
        Self { mover, cluster, daemon }
    }

    /// A fresh mover for `peers` over the same cluster and daemon.
    pub fn reconfigured(&self, peers: Vec<Peer>) -> Self {
        Self::from_parts(test_config(peers), Arc::clone(&self.cluster), Arc::clone(&self.daemon))
    }

    /// The in-memory cluster.
    pub fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }

    /// The in-memory daemon.
    pub fn daemon(&self) -> &MockDaemon {
        &self.daemon
    }

    /// Runs one pass without a deadline.
    pub fn pass(&self) -> PassOutcome {
        self.mover.run_pass(&Context::new())
    }

    /// Device IDs configured on the daemon, in order.
    pub fn device_ids(&self) -> Vec<String> {
        self.daemon
            .config()
            .devices
            .into_iter()
            .map(|d| d.device_id)
            .collect()
    }

    /// Share list of the fixture folder, in order.
    pub fn share_ids(&self) -> Vec<String> {
        self.daemon
            .config()
            .folder(FOLDER_ID)
            .map(|f| f.device_ids().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl std::ops::Deref for Harness {
    type Target = Mover<MemoryCluster, MockDaemon>;

    fn deref(&self) -> &Self::Target {
        &self.mover
    }
}

/// Runs `f` with a harness for `peers`.
///
/// # Example
///
/// ```rust,ignore
/// use syncmover_testkit::with_harness;
///
/// #[test]
/// fn my_test() {
///     with_harness(vec![], |harness| {
///         assert!(harness.pass().is_ok());
///     });
/// }
/// ```
pub fn with_harness<F, R>(peers: Vec<Peer>, f: F) -> R
where
    F: FnOnce(&Harness) -> R,
{
    crate::logging::init_test_logging();
    let harness = Harness::new(peers);
    f(&harness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_ids_are_distinct() {
        assert_ne!(peer_id(1), peer_id(2));
        assert_eq!(self_id(), peer_id(0));
        assert_eq!(peer_id(3).len(), 63);
    }

    #[test]
    fn document_decodes() {
        let doc = daemon_document(&[self_id(), peer_id(1)]);
        let config: syncmover_engine::RemoteConfig = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.folders[0].devices.len(), 2);

        let rest = unmodelled_fields(&doc);
        assert!(rest.get("devices").is_none());
        assert!(rest["folders"][0].get("devices").is_none());
        assert_eq!(rest["folders"][0]["path"], "/data");
    }

    #[test]
    fn harness_runs_a_pass() {
        with_harness(vec![Peer::new(peer_id(1), "")], |harness| {
            assert!(harness.pass().is_ok());
            assert_eq!(harness.device_ids(), vec![self_id(), peer_id(1)]);
            assert_eq!(harness.share_ids(), vec![self_id(), peer_id(1)]);
        });
    }
}
