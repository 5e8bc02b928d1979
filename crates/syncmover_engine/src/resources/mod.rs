//! Cluster resources backing a mover instance.
//!
//! The mover needs, in one namespace:
//! - the caller's data volume claim (looked up, never created)
//! - a claim for the daemon's configuration
//! - a secret holding the control API key
//! - a job running the daemon
//! - a service for the control API and a load-balanced one for the data plane
//!
//! Access to the cluster goes through [`ResourceDriver`]. The driver only
//! gets and creates; the mover builds "ensure exists" on top of it.

mod memory;
mod objects;
mod specs;

pub use memory::MemoryCluster;
pub use objects::{
    AccessMode, Container, EnvSource, EnvVar, Job, LoadBalancerIngress, ObjectKey, ObjectMeta,
    PodSpec, PullPolicy, Resource, ResourceKind, RestartPolicy, Secret, Service, ServicePort,
    ServiceType, Volume, VolumeClaim, VolumeMount,
};
pub use specs::{
    api_key_secret, api_service, config_claim, data_address, data_service, generate_api_key,
    mover_job, API_KEY_SECRET_KEY, API_KEY_SECRET_NAME, API_PORT, API_SERVICE_NAME, APP_LABEL,
    APP_NAME, CONFIG_CLAIM_NAME, CONTAINER_NAME, DATA_PORT, DATA_SERVICE_NAME, JOB_NAME,
};

use crate::context::Context;
use crate::error::MoverResult;

/// Access to the cluster's object store.
pub trait ResourceDriver: Send + Sync {
    /// Looks up an object. `Ok(None)` means it does not exist; any other
    /// lookup failure is an error.
    fn get(
        &self,
        ctx: &Context,
        kind: ResourceKind,
        key: &ObjectKey,
    ) -> MoverResult<Option<Resource>>;

    /// Creates an object and returns it as stored.
    fn create(&self, ctx: &Context, resource: Resource) -> MoverResult<Resource>;
}
