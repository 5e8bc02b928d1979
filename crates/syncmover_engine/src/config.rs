//! Configuration for the mover.

use crate::error::{MoverError, MoverResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use syncmover_protocol::Peer;

/// Default base URL of the daemon's control API.
pub const DEFAULT_API_URL: &str = "https://127.0.0.1:8384";

/// Default mover container image.
pub const DEFAULT_IMAGE: &str = "quay.io/backube/volsync-mover-syncthing:latest";

/// Default size requested for the daemon's configuration volume.
pub const DEFAULT_CONFIG_CAPACITY: &str = "1Gi";

/// Default delay before the scheduler runs the next pass.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(20);

/// Configuration for one managed mover instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverConfig {
    /// Namespace holding every resource of this instance.
    pub namespace: String,
    /// Name of the caller-provisioned volume claim to replicate.
    pub data_volume_claim: String,
    /// Desired peer set.
    #[serde(default)]
    pub peers: Vec<Peer>,
    /// Base URL of the daemon's control API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Accept the daemon's self-signed certificate.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
    /// Container image running the daemon.
    #[serde(default = "default_image")]
    pub image: String,
    /// Storage request for the configuration volume.
    #[serde(default = "default_config_capacity")]
    pub config_capacity: String,
    /// Delay suggested to the scheduler after a successful pass.
    #[serde(default = "default_retry_after")]
    pub retry_after: Duration,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_config_capacity() -> String {
    DEFAULT_CONFIG_CAPACITY.to_string()
}

fn default_retry_after() -> Duration {
    DEFAULT_RETRY_AFTER
}

impl MoverConfig {
    /// Creates a configuration with defaults for everything but the
    /// namespace and the data claim.
    pub fn new(namespace: impl Into<String>, data_volume_claim: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            data_volume_claim: data_volume_claim.into(),
            peers: Vec::new(),
            api_url: default_api_url(),
            accept_invalid_certs: true,
            image: default_image(),
            config_capacity: default_config_capacity(),
            retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    /// Sets the desired peers.
    pub fn with_peers(mut self, peers: Vec<Peer>) -> Self {
        self.peers = peers;
        self
    }

    /// Sets the control API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets whether invalid certificates are accepted.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Sets the container image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the configuration volume size.
    pub fn with_config_capacity(mut self, capacity: impl Into<String>) -> Self {
        self.config_capacity = capacity.into();
        self
    }

    /// Sets the delay between successful passes.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = delay;
        self
    }

    /// Checks that the configuration can drive a pass.
    pub fn validate(&self) -> MoverResult<()> {
        if self.namespace.is_empty() {
            return Err(MoverError::InvalidConfig("namespace is empty".into()));
        }
        if self.data_volume_claim.is_empty() {
            return Err(MoverError::InvalidConfig(
                "data volume claim name is empty".into(),
            ));
        }
        if self.api_url.is_empty() {
            return Err(MoverError::InvalidConfig("api url is empty".into()));
        }
        Ok(())
    }
}
