//! Convergence pass orchestration.

use crate::config::MoverConfig;
use crate::context::Context;
use crate::daemon::DaemonClient;
use crate::error::{MoverError, MoverResult};
use crate::reconcile::PeerReconciler;
use crate::resources::{
    api_key_secret, api_service, config_claim, data_address, data_service, generate_api_key,
    mover_job, ObjectKey, Resource, ResourceDriver, ResourceKind, API_KEY_SECRET_KEY,
    API_KEY_SECRET_NAME, API_SERVICE_NAME, CONFIG_CLAIM_NAME, DATA_SERVICE_NAME, JOB_NAME,
};
use crate::status::aggregate_status;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use syncmover_protocol::MoverStatus;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

/// Name of this mover.
pub const MOVER_NAME: &str = "syncthing";

/// Progress signal handed back to the scheduler.
///
/// `Complete` is not terminal: the scheduler keeps re-running passes to
/// correct drift and refresh connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The pass did not finish; run it again later.
    InProgress,
    /// The pass converged.
    Complete {
        /// Suggested delay before the next pass.
        retry_after: Option<Duration>,
    },
}

impl Progress {
    /// Returns true if the pass converged.
    pub fn is_complete(&self) -> bool {
        matches!(self, Progress::Complete { .. })
    }

    /// Suggested delay before the next pass, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Progress::Complete { retry_after } => *retry_after,
            Progress::InProgress => None,
        }
    }
}

/// Result of one pass: a progress signal plus the error that stopped it.
#[derive(Debug)]
pub struct PassOutcome {
    /// Progress signal.
    pub progress: Progress,
    /// Error that aborted the pass. Always `InProgress` when set.
    pub error: Option<MoverError>,
}

impl PassOutcome {
    /// An aborted pass.
    pub fn in_progress(error: MoverError) -> Self {
        Self {
            progress: Progress::InProgress,
            error: Some(error),
        }
    }

    /// A converged pass.
    pub fn complete(retry_after: Option<Duration>) -> Self {
        Self {
            progress: Progress::Complete { retry_after },
            error: None,
        }
    }

    /// Returns true if the pass converged.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts into a `Result`, dropping the progress signal of a failure.
    pub fn into_result(self) -> MoverResult<Progress> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.progress),
        }
    }
}

/// Counters about passes run by one mover.
///
/// Observability only; a pass never reads these.
#[derive(Debug, Clone, Default)]
pub struct MoverStats {
    /// Passes started.
    pub passes_started: u64,
    /// Passes that converged.
    pub passes_completed: u64,
    /// Passes aborted by an error.
    pub passes_failed: u64,
    /// Configuration pushes to the daemon.
    pub reconfigurations: u64,
    /// Objects created in the cluster.
    pub resources_created: u64,
    /// Duration of the last pass.
    pub last_pass_duration: Option<Duration>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Drives one mover instance towards its desired state.
///
/// Each [`run_pass`](Self::run_pass) re-derives everything from the
/// cluster and the daemon, so a pass can be re-run after any failure.
/// Passes for the same instance must not overlap; the scheduler owns that.
pub struct Mover<D: ResourceDriver, C: DaemonClient> {
    config: MoverConfig,
    driver: Arc<D>,
    daemon: Arc<C>,
    status: RwLock<MoverStatus>,
    stats: RwLock<MoverStats>,
    api_key: RwLock<Option<Zeroizing<String>>>,
}

impl<D: ResourceDriver, C: DaemonClient> Mover<D, C> {
    /// Creates a mover.
    pub fn new(config: MoverConfig, driver: D, daemon: C) -> Self {
        Self::with_shared(config, Arc::new(driver), Arc::new(daemon))
    }

    /// Creates a mover over shared collaborators.
    pub fn with_shared(config: MoverConfig, driver: Arc<D>, daemon: Arc<C>) -> Self {
        Self {
            config,
            driver,
            daemon,
            status: RwLock::new(MoverStatus::default()),
            stats: RwLock::new(MoverStats::default()),
            api_key: RwLock::new(None),
        }
    }

    /// Returns the mover name.
    pub fn name(&self) -> &'static str {
        MOVER_NAME
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MoverConfig {
        &self.config
    }

    /// Returns the resource driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the daemon client.
    pub fn daemon(&self) -> &C {
        &self.daemon
    }

    /// Returns a snapshot of the status record.
    pub fn status(&self) -> MoverStatus {
        self.status.read().clone()
    }

    /// Returns the pass counters.
    pub fn stats(&self) -> MoverStats {
        self.stats.read().clone()
    }

    /// Runs one convergence pass.
    ///
    /// Steps run in order and the first error aborts the pass with an
    /// `InProgress` signal. Nothing is pushed to the daemon after an error.
    pub fn run_pass(&self, ctx: &Context) -> PassOutcome {
        let start = Instant::now();
        self.stats.write().passes_started += 1;

        let result = self.try_pass(ctx);

        let mut stats = self.stats.write();
        stats.last_pass_duration = Some(start.elapsed());
        match result {
            Ok(()) => {
                stats.passes_completed += 1;
                stats.last_error = None;
                debug!(
                    namespace = %self.config.namespace,
                    elapsed = ?start.elapsed(),
                    "pass converged"
                );
                PassOutcome::complete(Some(self.config.retry_after))
            }
            Err(e) => {
                stats.passes_failed += 1;
                stats.last_error = Some(e.to_string());
                drop(stats);
                self.handle_error(&e);
                PassOutcome::in_progress(e)
            }
        }
    }

    /// Releases per-iteration state.
    ///
    /// The mover creates no per-iteration objects, so nothing is deleted;
    /// the cached credential is dropped.
    pub fn cleanup(&self, ctx: &Context) -> PassOutcome {
        if let Err(e) = ctx.check() {
            return PassOutcome::in_progress(e);
        }
        *self.api_key.write() = None;
        PassOutcome::complete(None)
    }

    fn try_pass(&self, ctx: &Context) -> MoverResult<()> {
        self.config.validate()?;

        self.ensure_data_claim(ctx)?;
        self.ensure_exists(ctx, ResourceKind::VolumeClaim, CONFIG_CLAIM_NAME, || {
            Resource::VolumeClaim(config_claim(&self.config))
        })?;
        self.ensure_exists(ctx, ResourceKind::Secret, API_KEY_SECRET_NAME, || {
            Resource::Secret(api_key_secret(&self.config, &generate_api_key()))
        })?;
        self.ensure_exists(ctx, ResourceKind::Job, JOB_NAME, || {
            Resource::Job(mover_job(&self.config))
        })?;
        self.ensure_exists(ctx, ResourceKind::Service, API_SERVICE_NAME, || {
            Resource::Service(api_service(&self.config))
        })?;
        let data = self.ensure_exists(ctx, ResourceKind::Service, DATA_SERVICE_NAME, || {
            Resource::Service(data_service(&self.config))
        })?;
        self.record_address(&data);

        self.ensure_configured(ctx)?;
        self.update_status(ctx)
    }

    fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(self.config.namespace.clone(), name)
    }

    /// The data claim is provided by the caller; its absence is an error.
    fn ensure_data_claim(&self, ctx: &Context) -> MoverResult<()> {
        ctx.check()?;
        let key = self.key(&self.config.data_volume_claim);
        match self.driver.get(ctx, ResourceKind::VolumeClaim, &key)? {
            Some(_) => Ok(()),
            None => Err(MoverError::MissingVolume {
                namespace: key.namespace,
                name: key.name,
            }),
        }
    }

    fn ensure_exists(
        &self,
        ctx: &Context,
        kind: ResourceKind,
        name: &str,
        build: impl FnOnce() -> Resource,
    ) -> MoverResult<Resource> {
        ctx.check()?;
        let key = self.key(name);
        if let Some(existing) = self.driver.get(ctx, kind, &key)? {
            debug!(resource = %kind, name = %key, "already exists");
            return Ok(existing);
        }

        let created = self.driver.create(ctx, build())?;
        self.stats.write().resources_created += 1;
        info!(resource = %kind, name = %key, "created");
        Ok(created)
    }

    /// Mirrors the data service's ingress into the status; empty while the
    /// platform has not assigned one or has withdrawn it.
    fn record_address(&self, data: &Resource) {
        let address = data.as_service().and_then(data_address).unwrap_or_default();
        let mut status = self.status.write();
        if status.address == address {
            return;
        }
        if address.is_empty() {
            warn!(
                namespace = %self.config.namespace,
                previous = %status.address,
                "data endpoint withdrawn"
            );
        } else {
            info!(namespace = %self.config.namespace, address = %address, "data endpoint assigned");
        }
        status.address = address;
    }

    /// Returns the control API key, reading the secret on first use.
    fn api_key(&self, ctx: &Context) -> MoverResult<Zeroizing<String>> {
        if let Some(key) = self.api_key.read().as_ref() {
            return Ok(key.clone());
        }

        let secret_key = self.key(API_KEY_SECRET_NAME);
        let secret = self
            .driver
            .get(ctx, ResourceKind::Secret, &secret_key)?
            .ok_or_else(|| MoverError::InvalidCredential(secret_key.to_string()))?;
        let key = secret
            .as_secret()
            .and_then(|s| s.data.get(API_KEY_SECRET_KEY))
            .and_then(|bytes| String::from_utf8(bytes.clone()).ok())
            .filter(|k| !k.is_empty())
            .map(Zeroizing::new)
            .ok_or_else(|| MoverError::InvalidCredential(secret_key.to_string()))?;

        *self.api_key.write() = Some(key.clone());
        Ok(key)
    }

    /// Brings the daemon's device and folder lists in line with the
    /// desired peers. Returns true if a new configuration was pushed.
    fn ensure_configured(&self, ctx: &Context) -> MoverResult<bool> {
        let key = self.api_key(ctx)?;
        let mut remote = self.daemon.get_config(ctx, &key)?;
        debug!(
            devices = remote.devices.len(),
            folders = remote.folders.len(),
            "fetched daemon config"
        );
        let identity = self.daemon.system_status(ctx, &key)?;

        let reconciler = PeerReconciler::new(&self.config.peers, &identity.my_id);
        if !reconciler.reconcile(&mut remote) {
            debug!(device_id = %identity.my_id, "daemon config already converged");
            return Ok(false);
        }

        info!(
            device_id = %identity.my_id,
            devices = remote.devices.len(),
            peers = reconciler.desired_ids().len(),
            "pushing reconfigured daemon config"
        );
        self.daemon.put_config(ctx, &key, &remote)?;
        self.stats.write().reconfigurations += 1;

        match self.daemon.get_config(ctx, &key) {
            Ok(confirmed) if reconciler.needs_reconfigure(&confirmed.devices) => {
                warn!(device_id = %identity.my_id, "daemon config still differs after push");
            }
            Ok(_) => debug!("daemon config confirmed"),
            Err(e) => warn!(error = %e, "could not confirm daemon config"),
        }
        Ok(true)
    }

    fn update_status(&self, ctx: &Context) -> MoverResult<()> {
        let key = self.api_key(ctx)?;
        let identity = self.daemon.system_status(ctx, &key)?;
        let telemetry = self.daemon.connections(ctx, &key)?;
        let peers = aggregate_status(&self.config.peers, &identity.my_id, &telemetry);

        let mut status = self.status.write();
        status.device_id = identity.my_id;
        status.peers = peers;
        Ok(())
    }

    fn handle_error(&self, e: &MoverError) {
        if matches!(e, MoverError::AuthenticationFailed(_)) {
            // the secret may have been replaced since it was cached
            *self.api_key.write() = None;
        }
        if e.requires_operator() {
            error!(
                namespace = %self.config.namespace,
                error = %e,
                "pass blocked until an operator intervenes"
            );
        } else {
            warn!(namespace = %self.config.namespace, error = %e, "pass aborted, will retry");
        }
    }
}

#[cfg(feature = "http")]
impl<D: ResourceDriver> Mover<D, crate::http::HttpDaemonClient<crate::http::ReqwestClient>> {
    /// Creates a mover talking to the daemon over HTTP.
    pub fn connect(config: MoverConfig, driver: D) -> MoverResult<Self> {
        let daemon = crate::http::connect(&config)?;
        Ok(Self::new(config, driver, daemon))
    }
}
