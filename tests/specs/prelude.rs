// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the spec suite.

use im2_core::{FakeClock, Job, SequentialIdGen, Stage};
use im2_daemon::http::{router, AppState};
use im2_registry::{Actor, BroadcastBus, CreateJob, EventSink, Registry};
use im2_storage::JobStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type SpecRegistry = Registry<FakeClock, SequentialIdGen>;

/// A disk-backed registry with a deterministic clock and id generator.
pub struct Harness {
    pub registry: SpecRegistry,
    pub store: Arc<JobStore>,
    pub bus: Arc<BroadcastBus>,
    pub clock: FakeClock,
    pub dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = JobStore::open(dir.path()).unwrap();
    let store = Arc::new(store);
    let bus = Arc::new(BroadcastBus::default());
    let clock = FakeClock::new();
    let registry = Registry::with_parts(
        Arc::clone(&store),
        Arc::clone(&bus) as Arc<dyn EventSink>,
        clock.clone(),
        SequentialIdGen::new("job"),
        false,
    );
    Harness {
        registry,
        store,
        bus,
        clock,
        dir,
    }
}

pub fn create(registry: &SpecRegistry, id: &str, owner: &str) -> Job {
    registry
        .create_job(CreateJob {
            id: Some(id.to_string()),
            owner: owner.to_string(),
            source_ref: format!("/incoming/{id}.flac"),
            display_name: format!("{id}.flac"),
            ..Default::default()
        })
        .unwrap()
}

/// Walk a job forward one legal step at a time until it reaches `target`.
pub fn advance_to(registry: &SpecRegistry, id: &str, target: Stage) -> Job {
    let mut job = registry.get(id).unwrap();
    while job.stage != target {
        let next = job.stage.successor().unwrap();
        job = registry
            .transition(id, next, None, None, Actor::External)
            .unwrap();
    }
    job
}

/// A registry served over HTTP on an ephemeral port.
pub struct TestServer {
    pub base: String,
    // Keeps the data directory alive for the server's lifetime
    #[allow(dead_code)]
    dir: tempfile::TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = JobStore::open(dir.path()).unwrap();
    let bus = Arc::new(BroadcastBus::default());
    let registry = Arc::new(Registry::new(
        Arc::new(store),
        bus as Arc<dyn EventSink>,
        false,
    ));

    let state = Arc::new(AppState {
        registry,
        started_at: Instant::now(),
        request_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_secs(5),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        base: format!("http://{addr}"),
        dir,
        handle,
    }
}
