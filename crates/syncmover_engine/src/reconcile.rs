//! Peer configuration reconciliation.
//!
//! Decides whether the daemon's device list matches the desired peer set
//! and computes the next device and folder lists when it does not.
//!
//! ## Rules
//!
//! - The daemon's own identity is never added or removed.
//! - Pending peers (empty identity) never become devices.
//! - Retained devices are left untouched, including their addresses.
//! - Folder share lists are derived from the device list, never merged.

use std::collections::{BTreeSet, HashSet};
use syncmover_protocol::{
    FolderDevice, Peer, RemoteConfig, RemoteDevice, RemoteFolder, DYNAMIC_ADDRESS,
};

/// Number of identity characters used in generated device names.
const NAME_ID_CHARS: usize = 7;

/// Reconciles the daemon's device list against a desired peer set.
#[derive(Debug, Clone, Copy)]
pub struct PeerReconciler<'a> {
    desired: &'a [Peer],
    self_id: &'a str,
}

impl<'a> PeerReconciler<'a> {
    /// Creates a reconciler for one pass.
    pub fn new(desired: &'a [Peer], self_id: &'a str) -> Self {
        Self { desired, self_id }
    }

    /// Identities that should be configured as devices.
    pub fn desired_ids(&self) -> BTreeSet<&'a str> {
        self.desired
            .iter()
            .filter(|p| p.is_managed(self.self_id))
            .map(|p| p.id.as_str())
            .collect()
    }

    /// Identities currently configured, excluding the daemon itself.
    pub fn configured_ids<'d>(&self, devices: &'d [RemoteDevice]) -> BTreeSet<&'d str> {
        devices
            .iter()
            .filter(|d| d.device_id != self.self_id)
            .map(|d| d.device_id.as_str())
            .collect()
    }

    /// Returns true if the configured identities differ from the desired ones.
    pub fn needs_reconfigure(&self, devices: &[RemoteDevice]) -> bool {
        self.configured_ids(devices) != self.desired_ids()
    }

    /// Computes the next device list from the current one.
    ///
    /// Existing entries keep their position and every field. New entries
    /// are appended in desired order.
    pub fn updated_devices(&self, devices: &[RemoteDevice]) -> Vec<RemoteDevice> {
        let desired = self.desired_ids();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut updated = Vec::with_capacity(desired.len() + 1);

        for device in devices {
            let id = device.device_id.as_str();
            let keep = id == self.self_id || desired.contains(id);
            if keep && seen.insert(id) {
                updated.push(device.clone());
            }
        }

        for peer in self.desired {
            if peer.is_managed(self.self_id) && seen.insert(peer.id.as_str()) {
                updated.push(new_device(peer));
            }
        }

        updated
    }

    /// Applies the device and folder update to `config` in place if it
    /// needs reconfiguring. Returns true if anything was changed.
    ///
    /// Only `devices` and `folders` are touched; unmodelled keys stay as
    /// they were fetched.
    pub fn reconcile(&self, config: &mut RemoteConfig) -> bool {
        if !self.needs_reconfigure(&config.devices) {
            return false;
        }
        config.devices = self.updated_devices(&config.devices);
        config.folders = updated_folders(&config.folders, &config.devices);
        true
    }
}

/// Rewrites every folder's share list to exactly the configured devices.
///
/// Share entries for devices that stay keep their extra fields; the rest
/// of each folder is untouched.
pub fn updated_folders(folders: &[RemoteFolder], devices: &[RemoteDevice]) -> Vec<RemoteFolder> {
    folders
        .iter()
        .map(|folder| {
            let mut seen: HashSet<&str> = HashSet::new();
            let shares = devices
                .iter()
                .filter(|d| seen.insert(d.device_id.as_str()))
                .map(|d| {
                    folder
                        .devices
                        .iter()
                        .find(|share| share.device_id == d.device_id)
                        .cloned()
                        .unwrap_or_else(|| FolderDevice::new(d.device_id.clone()))
                })
                .collect();
            RemoteFolder {
                devices: shares,
                ..folder.clone()
            }
        })
        .collect()
}

/// Display name given to a device the mover adds.
pub fn device_name(device_id: &str) -> String {
    let short: String = device_id.chars().take(NAME_ID_CHARS).collect();
    format!("peer-{short}")
}

fn new_device(peer: &Peer) -> RemoteDevice {
    let address = if peer.address.is_empty() {
        DYNAMIC_ADDRESS.to_string()
    } else {
        peer.address.clone()
    };
    RemoteDevice::new(peer.id.clone(), device_name(&peer.id), vec![address])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(id: &str) -> RemoteDevice {
        RemoteDevice::new(id, id.to_lowercase(), vec![DYNAMIC_ADDRESS.to_string()])
    }

    fn ids(devices: &[RemoteDevice]) -> Vec<&str> {
        devices.iter().map(|d| d.device_id.as_str()).collect()
    }

    fn share_ids(folder: &RemoteFolder) -> BTreeSet<&str> {
        folder.device_ids().collect()
    }

    #[test]
    fn converged_set_needs_nothing() {
        let desired = vec![Peer::new("B", ""), Peer::new("A", "tcp://a")];
        let current = vec![device("S"), device("A"), device("B")];
        let reconciler = PeerReconciler::new(&desired, "S");
        assert!(!reconciler.needs_reconfigure(&current));
    }

    #[test]
    fn self_and_pending_are_ignored_for_comparison() {
        let desired = vec![
            Peer::new("S", "tcp://me"),
            Peer::new("A", ""),
            Peer::pending("tcp://x"),
        ];
        let current = vec![device("A"), device("S")];
        assert!(!PeerReconciler::new(&desired, "S").needs_reconfigure(&current));

        // self missing from the device list does not matter either
        let current = vec![device("A")];
        assert!(!PeerReconciler::new(&desired, "S").needs_reconfigure(&current));
    }

    #[test]
    fn unrelated_fields_do_not_trigger() {
        let desired = vec![Peer::new("A", "tcp://new-address")];
        let mut a = device("A");
        a.extra.insert("compression".into(), json!("always"));
        assert!(!PeerReconciler::new(&desired, "S").needs_reconfigure(&[device("S"), a]));
    }

    #[test]
    fn worked_example() {
        let desired = vec![
            Peer::new("A", ""),
            Peer::new("B", "tcp://b:22000"),
            Peer::pending("tcp://p"),
        ];
        let current = vec![device("S"), device("A"), device("C")];
        let reconciler = PeerReconciler::new(&desired, "S");

        assert!(reconciler.needs_reconfigure(&current));
        let updated = reconciler.updated_devices(&current);
        assert_eq!(ids(&updated), vec!["S", "A", "B"]);
        assert_eq!(updated[2].addresses, vec!["tcp://b:22000".to_string()]);
        assert_eq!(updated[2].name, "peer-B");

        let folders = vec![RemoteFolder::new(
            "data",
            "Data",
            vec![FolderDevice::new("S"), FolderDevice::new("C")],
        )];
        let folders = updated_folders(&folders, &updated);
        assert_eq!(share_ids(&folders[0]), BTreeSet::from(["S", "A", "B"]));
    }

    #[test]
    fn empty_desired_leaves_only_self() {
        let current = vec![device("A"), device("S"), device("B")];
        let reconciler = PeerReconciler::new(&[], "S");
        assert!(reconciler.needs_reconfigure(&current));

        let updated = reconciler.updated_devices(&current);
        assert_eq!(ids(&updated), vec!["S"]);

        let folders = vec![
            RemoteFolder::new("one", "", vec![FolderDevice::new("A")]),
            RemoteFolder::new("two", "", vec![]),
        ];
        for folder in updated_folders(&folders, &updated) {
            assert_eq!(share_ids(&folder), BTreeSet::from(["S"]));
        }
    }

    #[test]
    fn duplicate_desired_peers_collapse() {
        let desired = vec![Peer::new("A", "tcp://1"), Peer::new("A", "tcp://2")];
        let updated = PeerReconciler::new(&desired, "S").updated_devices(&[device("S")]);
        assert_eq!(ids(&updated), vec!["S", "A"]);
        assert_eq!(updated[1].addresses, vec!["tcp://1".to_string()]);
    }

    #[test]
    fn retained_devices_are_untouched() {
        let mut a = device("A");
        a.addresses = vec!["tcp://old:22000".into()];
        a.extra.insert("introducer".into(), json!(true));
        let desired = vec![Peer::new("A", "tcp://new:22000"), Peer::new("B", "")];

        let updated = PeerReconciler::new(&desired, "S").updated_devices(&[device("S"), a.clone()]);
        assert_eq!(updated[1], a);
        assert_eq!(updated[2].addresses, vec![DYNAMIC_ADDRESS.to_string()]);
    }

    #[test]
    fn self_in_desired_is_never_added() {
        let desired = vec![Peer::new("S", "tcp://me"), Peer::new("A", "")];
        let updated = PeerReconciler::new(&desired, "S").updated_devices(&[device("A")]);
        assert_eq!(ids(&updated), vec!["A"]);
    }

    #[test]
    fn folder_shares_keep_extras_and_folder_fields() {
        let mut share = FolderDevice::new("A");
        share.extra.insert("encryptionPassword".into(), json!("secret"));
        let mut folder =
            RemoteFolder::new("data", "Data", vec![share.clone(), FolderDevice::new("Z")]);
        folder.extra.insert("path".into(), json!("/data"));

        let devices = vec![device("S"), device("A")];
        let out = updated_folders(&[folder], &devices);

        assert_eq!(out[0].id, "data");
        assert_eq!(out[0].label, "Data");
        assert_eq!(out[0].extra["path"], json!("/data"));
        assert_eq!(out[0].devices, vec![FolderDevice::new("S"), share]);
    }

    #[test]
    fn reconcile_preserves_unmodelled_config() {
        let mut config = RemoteConfig::new(
            vec![device("S"), device("C")],
            vec![RemoteFolder::new(
                "data",
                "",
                vec![FolderDevice::new("S"), FolderDevice::new("C")],
            )],
        );
        config.extra.insert("gui".into(), json!({"enabled": true}));
        let desired = vec![Peer::new("A", "")];
        let reconciler = PeerReconciler::new(&desired, "S");

        assert!(reconciler.reconcile(&mut config));
        assert_eq!(ids(&config.devices), vec!["S", "A"]);
        assert_eq!(share_ids(&config.folders[0]), BTreeSet::from(["S", "A"]));
        assert_eq!(config.extra["gui"], json!({"enabled": true}));

        // second run is a no-op
        let before = config.clone();
        assert!(!reconciler.reconcile(&mut config));
        assert_eq!(config, before);
    }

    #[test]
    fn device_names() {
        assert_eq!(device_name("MFZWI3D-BONSGYC-YLTMRWG"), "peer-MFZWI3D");
        assert_eq!(device_name("AB"), "peer-AB");
    }
}
