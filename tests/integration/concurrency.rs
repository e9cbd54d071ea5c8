//! Concurrency tests: worker pool bounds, single-flight cycles, concurrent edits

use std::sync::Arc;
use std::time::{Duration, Instant};

use arccat::{
    orchestrator::{CycleError, MAX_WORKERS, Orchestrator},
    storage::{HostCatalog, NewHost, json::JsonHostStore, memory::MemoryHostStore},
};
use assert_matches::assert_matches;
use futures::future::join_all;
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn slow_fleet(count: usize, delay: Duration) -> (Arc<MemoryHostStore>, Arc<ScriptedFetcher>) {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let hosts = (0..count)
        .map(|i| {
            let host = create_test_host(&format!("h{i}"));
            fetcher.set(&host.id, Step::Slow(delay, HEALTHY_OUTPUT.to_string()));
            host
        })
        .collect();

    (Arc::new(MemoryHostStore::with_hosts(hosts)), fetcher)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_never_exceeds_cap() {
    let (store, fetcher) = slow_fleet(40, Duration::from_millis(50));
    let orchestrator = Orchestrator::new(store, fetcher.clone());

    let report = orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.hosts.len(), 40);
    assert_eq!(fetcher.calls(), 40);
    assert!(fetcher.peak_concurrency() <= MAX_WORKERS);
    assert!(fetcher.peak_concurrency() > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_configured_cap_is_honoured() {
    let (store, fetcher) = slow_fleet(12, Duration::from_millis(30));
    let orchestrator = Orchestrator::new(store, fetcher.clone()).with_max_workers(3);

    orchestrator.run_cycle().await.unwrap();

    assert!(fetcher.peak_concurrency() <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_small_fleet_polls_in_parallel() {
    let (store, fetcher) = slow_fleet(5, Duration::from_millis(200));
    let orchestrator = Orchestrator::new(store, fetcher.clone());

    let started = Instant::now();
    orchestrator.run_cycle().await.unwrap();

    // 5 hosts, 6 workers: one round of delays, not five
    assert!(started.elapsed() < Duration::from_millis(800));
    assert_eq!(fetcher.peak_concurrency(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cycle_requests_run_one_cycle() {
    let (store, fetcher) = slow_fleet(3, Duration::from_millis(150));
    let orchestrator = Arc::new(Orchestrator::new(store, fetcher.clone()));

    let results = join_all((0..5).map(|_| {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_cycle().await })
    }))
    .await;

    let results: Vec<_> = results.into_iter().map(|joined| joined.unwrap()).collect();
    let completed = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(completed, 1);
    for result in results.iter().filter(|result| result.is_err()) {
        assert_matches!(result, Err(CycleError::AlreadyRunning));
    }
    assert_eq!(fetcher.calls(), 3);

    // the guard is released once the cycle is done
    let next = orchestrator.run_cycle().await.unwrap();
    assert_eq!(next.cycle, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(HostCatalog::new(JsonHostStore::new(
        dir.path().join("servers.json"),
    )));

    let created = join_all((0..10).map(|i| {
        let catalog = catalog.clone();
        tokio::spawn(async move {
            catalog
                .create(NewHost {
                    name: format!("node-{i}"),
                    address: format!("10.0.0.{i}"),
                    port: None,
                    user: "pi".to_string(),
                    key_path: None,
                })
                .await
        })
    }))
    .await;

    assert!(created.iter().all(|joined| matches!(joined, Ok(Ok(_)))));

    let hosts = catalog.list().await.unwrap();
    assert_eq!(hosts.len(), 10);

    let mut ids: Vec<_> = hosts.iter().map(|host| host.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}
