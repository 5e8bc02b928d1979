//! Cancellation and deadlines against a daemon that never answers.

#![cfg(feature = "http")]

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};
use syncmover_engine::resources::{
    AccessMode, ObjectMeta, Resource, Secret, VolumeClaim, API_KEY_SECRET_KEY, API_KEY_SECRET_NAME,
};
use syncmover_engine::{
    connect, Context, DaemonClient, MemoryCluster, Mover, MoverConfig, MoverError,
};

/// Accepts connections and holds them open without ever replying.
fn silent_daemon() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    addr
}

fn config(addr: SocketAddr) -> MoverConfig {
    MoverConfig::new("replication", "app-data").with_api_url(format!("http://{addr}"))
}

fn cancel_after(ctx: &Context, delay: Duration) -> thread::JoinHandle<()> {
    let ctx = ctx.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        ctx.cancel();
    })
}

#[test]
fn cancel_aborts_stalled_request() {
    let daemon = connect(&config(silent_daemon())).unwrap();
    let ctx = Context::new();
    let canceller = cancel_after(&ctx, Duration::from_millis(200));

    let start = Instant::now();
    let result = daemon.system_status(&ctx, "k");
    canceller.join().unwrap();

    assert!(matches!(result, Err(MoverError::Cancelled)), "{result:?}");
    assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
}

#[test]
fn deadline_aborts_stalled_request() {
    let daemon = connect(&config(silent_daemon())).unwrap();
    let ctx = Context::new().with_timeout(Duration::from_millis(300));

    let start = Instant::now();
    let result = daemon.get_config(&ctx, "k");

    assert!(matches!(result, Err(MoverError::DeadlineExceeded)), "{result:?}");
    assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
}

#[test]
fn cancelled_pass_returns_promptly() {
    let cluster = MemoryCluster::new();
    cluster.insert(Resource::VolumeClaim(VolumeClaim {
        meta: ObjectMeta::new("replication", "app-data"),
        access_modes: vec![AccessMode::ReadWriteOnce],
        storage_request: "1Gi".into(),
    }));
    cluster.insert(Resource::Secret(Secret {
        meta: ObjectMeta::new("replication", API_KEY_SECRET_NAME),
        secret_type: "Opaque".into(),
        data: BTreeMap::from([(API_KEY_SECRET_KEY.to_string(), b"k".to_vec())]),
    }));
    let mover = Mover::connect(config(silent_daemon()), cluster).unwrap();
    let ctx = Context::new();
    let canceller = cancel_after(&ctx, Duration::from_millis(200));

    let start = Instant::now();
    let outcome = mover.run_pass(&ctx);
    canceller.join().unwrap();

    assert!(matches!(outcome.error, Some(MoverError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(mover.stats().passes_failed, 1);
}
