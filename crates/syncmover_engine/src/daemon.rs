//! Daemon control client abstraction.

use crate::context::Context;
use crate::error::{MoverError, MoverResult};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashSet;
use syncmover_protocol::{Connections, RemoteConfig, SystemStatus};

/// Request/response access to the peer-sync daemon's control API.
///
/// Every call carries the pre-shared API key. Implementations must check
/// `ctx` before doing any work and bound in-flight work by its deadline.
pub trait DaemonClient: Send + Sync {
    /// Fetches the daemon's configuration.
    fn get_config(&self, ctx: &Context, api_key: &str) -> MoverResult<RemoteConfig>;

    /// Replaces the daemon's configuration.
    fn put_config(&self, ctx: &Context, api_key: &str, config: &RemoteConfig) -> MoverResult<()>;

    /// Fetches the daemon's identity.
    fn system_status(&self, ctx: &Context, api_key: &str) -> MoverResult<SystemStatus>;

    /// Fetches connection telemetry.
    fn connections(&self, ctx: &Context, api_key: &str) -> MoverResult<Connections>;
}

/// Control API operations, used by [`MockDaemon`] for failure injection
/// and call recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonOp {
    /// `GET /rest/config`
    GetConfig,
    /// `PUT /rest/config`
    PutConfig,
    /// `GET /rest/system/status`
    SystemStatus,
    /// `GET /rest/system/connections`
    Connections,
}

#[derive(Debug)]
struct MockState {
    document: serde_json::Value,
    my_id: String,
    connections: Connections,
    api_key: Option<String>,
    failing: HashSet<DaemonOp>,
    calls: Vec<DaemonOp>,
}

/// An in-memory daemon for testing.
///
/// The configuration is held as a raw JSON document, so tests can check
/// that keys the mover does not model survive a round trip.
#[derive(Debug)]
pub struct MockDaemon {
    state: Mutex<MockState>,
}

impl MockDaemon {
    /// Creates a daemon with the given identity and configuration document.
    pub fn new(my_id: impl Into<String>, document: serde_json::Value) -> Self {
        Self {
            state: Mutex::new(MockState {
                document,
                my_id: my_id.into(),
                connections: Connections::new(),
                api_key: None,
                failing: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Requires `key` on every call.
    pub fn require_api_key(&self, key: impl Into<String>) {
        self.state.lock().api_key = Some(key.into());
    }

    /// Sets the telemetry returned by `connections`.
    pub fn set_connections(&self, connections: Connections) {
        self.state.lock().connections = connections;
    }

    /// Replaces the stored configuration document.
    pub fn set_document(&self, document: serde_json::Value) {
        self.state.lock().document = document;
    }

    /// Makes `op` fail with a retryable transport error until [`recover`](Self::recover).
    pub fn fail(&self, op: DaemonOp) {
        self.state.lock().failing.insert(op);
    }

    /// Stops failing `op`.
    pub fn recover(&self, op: DaemonOp) {
        self.state.lock().failing.remove(&op);
    }

    /// Returns the stored configuration document.
    pub fn document(&self) -> serde_json::Value {
        self.state.lock().document.clone()
    }

    /// Returns the stored configuration, decoded.
    pub fn config(&self) -> RemoteConfig {
        serde_json::from_value(self.document()).unwrap_or_default()
    }

    /// Returns every call received so far, in order.
    pub fn calls(&self) -> Vec<DaemonOp> {
        self.state.lock().calls.clone()
    }

    /// Returns how many times `op` was called.
    pub fn count(&self, op: DaemonOp) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    fn enter(
        &self,
        ctx: &Context,
        api_key: &str,
        op: DaemonOp,
    ) -> MoverResult<MutexGuard<'_, MockState>> {
        ctx.check()?;
        let mut state = self.state.lock();
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(MoverError::transport_retryable(format!("{op:?}: connection refused")));
        }
        if let Some(expected) = &state.api_key {
            if expected != api_key {
                return Err(MoverError::AuthenticationFailed("api key mismatch".into()));
            }
        }
        Ok(state)
    }
}

impl DaemonClient for MockDaemon {
    fn get_config(&self, ctx: &Context, api_key: &str) -> MoverResult<RemoteConfig> {
        let state = self.enter(ctx, api_key, DaemonOp::GetConfig)?;
        let bytes = serde_json::to_vec(&state.document)
            .map_err(|e| MoverError::transport_fatal(e.to_string()))?;
        Ok(RemoteConfig::decode(&bytes)?)
    }

    fn put_config(&self, ctx: &Context, api_key: &str, config: &RemoteConfig) -> MoverResult<()> {
        let mut state = self.enter(ctx, api_key, DaemonOp::PutConfig)?;
        let bytes = config.encode()?;
        state.document = serde_json::from_slice(&bytes)
            .map_err(|e| MoverError::transport_fatal(e.to_string()))?;
        Ok(())
    }

    fn system_status(&self, ctx: &Context, api_key: &str) -> MoverResult<SystemStatus> {
        let state = self.enter(ctx, api_key, DaemonOp::SystemStatus)?;
        Ok(SystemStatus::new(state.my_id.clone()))
    }

    fn connections(&self, ctx: &Context, api_key: &str) -> MoverResult<Connections> {
        let state = self.enter(ctx, api_key, DaemonOp::Connections)?;
        Ok(state.connections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn daemon() -> MockDaemon {
        MockDaemon::new(
            "S",
            json!({
                "devices": [{"deviceID": "S", "name": "me", "addresses": []}],
                "folders": [],
                "gui": {"theme": "dark"}
            }),
        )
    }

    #[test]
    fn mock_round_trip_keeps_document_keys() {
        let daemon = daemon();
        let ctx = Context::new();

        let config = daemon.get_config(&ctx, "k").unwrap();
        daemon.put_config(&ctx, "k", &config).unwrap();

        assert_eq!(daemon.document()["gui"], json!({"theme": "dark"}));
        assert_eq!(
            daemon.calls(),
            vec![DaemonOp::GetConfig, DaemonOp::PutConfig]
        );
    }

    #[test]
    fn mock_failure_injection() {
        let daemon = daemon();
        let ctx = Context::new();
        daemon.fail(DaemonOp::SystemStatus);

        let err = daemon.system_status(&ctx, "k").unwrap_err();
        assert!(err.is_retryable());

        daemon.recover(DaemonOp::SystemStatus);
        assert_eq!(daemon.system_status(&ctx, "k").unwrap().my_id, "S");
        assert_eq!(daemon.count(DaemonOp::SystemStatus), 2);
    }

    #[test]
    fn mock_checks_api_key() {
        let daemon = daemon();
        daemon.require_api_key("right");
        let ctx = Context::new();

        assert!(matches!(
            daemon.connections(&ctx, "wrong"),
            Err(MoverError::AuthenticationFailed(_))
        ));
        assert!(daemon.connections(&ctx, "right").is_ok());
    }

    #[test]
    fn mock_honours_cancellation() {
        let daemon = daemon();
        let ctx = Context::new();
        ctx.cancel();

        assert!(matches!(
            daemon.get_config(&ctx, "k"),
            Err(MoverError::Cancelled)
        ));
        assert!(daemon.calls().is_empty());
    }
}
