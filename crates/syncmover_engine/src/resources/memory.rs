//! In-memory cluster for testing and embedding.

use super::objects::{LoadBalancerIngress, ObjectKey, Resource, ResourceKind};
use super::ResourceDriver;
use crate::context::Context;
use crate::error::{MoverError, MoverResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};

/// An in-memory object store implementing [`ResourceDriver`].
#[derive(Debug, Default)]
pub struct MemoryCluster {
    objects: RwLock<BTreeMap<(ResourceKind, ObjectKey), Resource>>,
    failing: RwLock<HashSet<ResourceKind>>,
    created: RwLock<Vec<(ResourceKind, ObjectKey)>>,
    ingress: RwLock<BTreeMap<ObjectKey, LoadBalancerIngress>>,
}

impl MemoryCluster {
    /// Creates an empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object directly, bypassing creation bookkeeping.
    pub fn insert(&self, resource: Resource) {
        let key = (resource.kind(), resource.key());
        self.objects.write().insert(key, resource);
    }

    /// Returns a stored object.
    pub fn object(&self, kind: ResourceKind, key: &ObjectKey) -> Option<Resource> {
        self.objects.read().get(&(kind, key.clone())).cloned()
    }

    /// Removes a stored object.
    pub fn remove(&self, kind: ResourceKind, key: &ObjectKey) -> Option<Resource> {
        self.objects.write().remove(&(kind, key.clone()))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Objects created through the driver, in order.
    pub fn created(&self) -> Vec<(ResourceKind, ObjectKey)> {
        self.created.read().clone()
    }

    /// Makes every call for `kind` fail until [`recover`](Self::recover).
    pub fn fail(&self, kind: ResourceKind) {
        self.failing.write().insert(kind);
    }

    /// Stops failing calls for `kind`.
    pub fn recover(&self, kind: ResourceKind) {
        self.failing.write().remove(&kind);
    }

    /// Assigns a load balancer ingress to the service `key`, now if it
    /// exists and on creation otherwise.
    pub fn assign_ingress(&self, key: ObjectKey, ingress: LoadBalancerIngress) {
        if let Some(resource) = self
            .objects
            .write()
            .get_mut(&(ResourceKind::Service, key.clone()))
        {
            if let Some(service) = resource.as_service_mut() {
                service.ingress = vec![ingress.clone()];
            }
        }
        self.ingress.write().insert(key, ingress);
    }

    /// Withdraws any load balancer ingress of the service `key`.
    pub fn clear_ingress(&self, key: &ObjectKey) {
        if let Some(service) = self
            .objects
            .write()
            .get_mut(&(ResourceKind::Service, key.clone()))
            .and_then(Resource::as_service_mut)
        {
            service.ingress.clear();
        }
        self.ingress.write().remove(key);
    }

    fn check(&self, ctx: &Context, kind: ResourceKind, key: &ObjectKey) -> MoverResult<()> {
        ctx.check()?;
        if self.failing.read().contains(&kind) {
            return Err(MoverError::cluster(
                kind.as_str(),
                key.name.clone(),
                "api server unavailable",
            ));
        }
        Ok(())
    }
}

impl ResourceDriver for MemoryCluster {
    fn get(
        &self,
        ctx: &Context,
        kind: ResourceKind,
        key: &ObjectKey,
    ) -> MoverResult<Option<Resource>> {
        self.check(ctx, kind, key)?;
        Ok(self.object(kind, key))
    }

    fn create(&self, ctx: &Context, mut resource: Resource) -> MoverResult<Resource> {
        let kind = resource.kind();
        let key = resource.key();
        self.check(ctx, kind, &key)?;

        let mut objects = self.objects.write();
        if objects.contains_key(&(kind, key.clone())) {
            return Err(MoverError::cluster(kind.as_str(), key.name, "already exists"));
        }
        if let Some(ingress) = self.ingress.read().get(&key) {
            if let Some(service) = resource.as_service_mut() {
                service.ingress = vec![ingress.clone()];
            }
        }
        objects.insert((kind, key.clone()), resource.clone());
        self.created.write().push((kind, key));
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MoverConfig;
    use crate::resources::specs::{data_service, mover_job};

    #[test]
    fn create_then_get() {
        let cluster = MemoryCluster::new();
        let ctx = Context::new();
        let job = Resource::Job(mover_job(&MoverConfig::new("ns", "data")));
        let key = job.key();

        assert!(cluster.get(&ctx, ResourceKind::Job, &key).unwrap().is_none());
        cluster.create(&ctx, job.clone()).unwrap();
        assert_eq!(cluster.get(&ctx, ResourceKind::Job, &key).unwrap(), Some(job.clone()));
        assert_eq!(cluster.created(), vec![(ResourceKind::Job, key)]);

        assert!(cluster.create(&ctx, job).is_err());
    }

    #[test]
    fn failure_injection() {
        let cluster = MemoryCluster::new();
        let ctx = Context::new();
        let key = ObjectKey::new("ns", "x");
        cluster.fail(ResourceKind::Secret);

        let err = cluster.get(&ctx, ResourceKind::Secret, &key).unwrap_err();
        assert!(matches!(err, MoverError::Cluster { kind: "Secret", .. }));
        assert!(cluster.get(&ctx, ResourceKind::Job, &key).is_ok());

        cluster.recover(ResourceKind::Secret);
        assert!(cluster.get(&ctx, ResourceKind::Secret, &key).is_ok());
    }

    #[test]
    fn ingress_assigned_before_and_after_creation() {
        let cluster = MemoryCluster::new();
        let ctx = Context::new();
        let service = Resource::Service(data_service(&MoverConfig::new("ns", "data")));
        let key = service.key();
        let ingress = LoadBalancerIngress {
            ip: Some("198.51.100.1".into()),
            hostname: None,
        };

        cluster.assign_ingress(key.clone(), ingress.clone());
        let created = cluster.create(&ctx, service).unwrap();
        assert_eq!(created.as_service().unwrap().ingress, vec![ingress]);

        let later = LoadBalancerIngress {
            ip: Some("198.51.100.2".into()),
            hostname: None,
        };
        cluster.assign_ingress(key.clone(), later.clone());
        let stored = cluster.object(ResourceKind::Service, &key).unwrap();
        assert_eq!(stored.as_service().unwrap().ingress, vec![later]);
    }
}
