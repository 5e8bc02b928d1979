//! Minimal model of the cluster objects the mover manages.
//!
//! Only the fields the mover sets or reads are modelled.

use std::collections::BTreeMap;

/// Kind of a managed cluster object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// Persistent volume claim.
    VolumeClaim,
    /// Secret.
    Secret,
    /// Batch job.
    Job,
    /// Network service.
    Service,
}

impl ResourceKind {
    /// Returns the cluster kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::VolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Secret => "Secret",
            ResourceKind::Job => "Job",
            ResourceKind::Service => "Service",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaced name of an object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    /// Namespace.
    pub namespace: String,
    /// Name.
    pub name: String,
}

impl ObjectKey {
    /// Creates a key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Labels.
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Creates metadata without labels.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label, builder style.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns the key of the object.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// Volume access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Mounted read-write by a single node.
    ReadWriteOnce,
    /// Mounted read-only by many nodes.
    ReadOnlyMany,
    /// Mounted read-write by many nodes.
    ReadWriteMany,
}

/// Persistent volume claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeClaim {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Access modes.
    pub access_modes: Vec<AccessMode>,
    /// Storage request (e.g. "1Gi").
    pub storage_request: String,
}

/// Secret holding opaque data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Secret type (e.g. "Opaque").
    pub secret_type: String,
    /// Data entries.
    pub data: BTreeMap<String, Vec<u8>>,
}

/// Restart policy of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart.
    Never,
    /// Restart on failure.
    OnFailure,
}

/// Image pull policy of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Always pull.
    Always,
    /// Pull when not present.
    IfNotPresent,
}

/// Source of an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSource {
    /// Literal value.
    Value(String),
    /// Key of a secret.
    SecretKey {
        /// Secret name.
        secret: String,
        /// Key within the secret.
        key: String,
    },
}

/// Container environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Where the value comes from.
    pub source: EnvSource,
}

/// Volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Volume name.
    pub name: String,
    /// Mount path.
    pub mount_path: String,
}

/// Container in a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Name.
    pub name: String,
    /// Image.
    pub image: String,
    /// Entrypoint.
    pub command: Vec<String>,
    /// Arguments.
    pub args: Vec<String>,
    /// Environment.
    pub env: Vec<EnvVar>,
    /// Pull policy.
    pub image_pull_policy: PullPolicy,
    /// Exposed container ports.
    pub ports: Vec<u16>,
    /// Mounts.
    pub volume_mounts: Vec<VolumeMount>,
    /// Resource limits by resource name.
    pub limits: BTreeMap<String, String>,
}

/// Pod volume backed by a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Volume name.
    pub name: String,
    /// Claim providing the volume.
    pub claim_name: String,
}

/// Pod specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSpec {
    /// Restart policy.
    pub restart_policy: RestartPolicy,
    /// Containers.
    pub containers: Vec<Container>,
    /// Volumes.
    pub volumes: Vec<Volume>,
}

/// Batch job running the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Seconds to keep the job after it finished.
    pub ttl_seconds_after_finished: Option<i32>,
    /// Pod template.
    pub template: PodSpec,
}

/// How a service is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// Cluster-internal virtual IP.
    ClusterIp,
    /// Externally load-balanced.
    LoadBalancer,
}

/// Service port mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    /// Service port.
    pub port: u16,
    /// Target container port.
    pub target_port: u16,
    /// Protocol name.
    pub protocol: String,
}

/// Load balancer ingress point assigned by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerIngress {
    /// Ingress IP.
    pub ip: Option<String>,
    /// Ingress hostname.
    pub hostname: Option<String>,
}

/// Network service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Pod selector.
    pub selector: BTreeMap<String, String>,
    /// Ports.
    pub ports: Vec<ServicePort>,
    /// Exposure type.
    pub service_type: ServiceType,
    /// Observed load balancer ingress, filled in by the platform.
    pub ingress: Vec<LoadBalancerIngress>,
}

/// Any managed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Volume claim.
    VolumeClaim(VolumeClaim),
    /// Secret.
    Secret(Secret),
    /// Job.
    Job(Job),
    /// Service.
    Service(Service),
}

impl Resource {
    /// Returns the kind.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::VolumeClaim(_) => ResourceKind::VolumeClaim,
            Resource::Secret(_) => ResourceKind::Secret,
            Resource::Job(_) => ResourceKind::Job,
            Resource::Service(_) => ResourceKind::Service,
        }
    }

    /// Returns the metadata.
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Resource::VolumeClaim(o) => &o.meta,
            Resource::Secret(o) => &o.meta,
            Resource::Job(o) => &o.meta,
            Resource::Service(o) => &o.meta,
        }
    }

    /// Returns the key.
    pub fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    /// Returns the secret, if this is one.
    pub fn as_secret(&self) -> Option<&Secret> {
        match self {
            Resource::Secret(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the service, if this is one.
    pub fn as_service(&self) -> Option<&Service> {
        match self {
            Resource::Service(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a mutable service, if this is one.
    pub fn as_service_mut(&mut self) -> Option<&mut Service> {
        match self {
            Resource::Service(s) => Some(s),
            _ => None,
        }
    }
}
