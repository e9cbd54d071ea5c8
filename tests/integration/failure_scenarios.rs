//! Failure tests: unreachable hosts, broken stores, garbage output, hung hosts

use std::sync::Arc;
use std::time::{Duration, Instant};

use arccat::{
    HostSnapshot, HostStatus,
    alerts::AlertKind,
    fetcher::{ConnectionFailure, FailureReason, FetchTimeouts, SshFetcher},
    orchestrator::{Orchestrator, process_fetch},
    parser::ParsedMetrics,
    state::StateStore,
    storage::{HostStore, json::JsonHostStore, memory::MemoryHostStore},
};
use assert_matches::assert_matches;
use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn offline() -> Result<String, ConnectionFailure> {
    Err(ConnectionFailure::new(FailureReason::Timeout, "timed out"))
}

#[test]
fn test_offline_duration_grows_across_failed_cycles() {
    let state = StateStore::new();
    let host = create_test_host_with_offline_grace("pi", 30);
    let seen = Utc::now();

    process_fetch(&state, &host, Ok(HEALTHY_OUTPUT.to_string()), seen);

    let mut durations = Vec::new();
    let mut alert_counts = Vec::new();
    for elapsed in [10, 20, 30, 40, 50] {
        let (snapshot, alerts) =
            process_fetch(&state, &host, offline(), seen + TimeDelta::seconds(elapsed));

        let HostStatus::Offline {
            last_seen,
            offline_secs,
        } = snapshot.status()
        else {
            panic!("host should be offline");
        };
        assert_eq!(last_seen, Some(seen));
        durations.push(offline_secs.unwrap());
        alert_counts.push(alerts.len());
    }

    assert_eq!(durations, vec![10, 20, 30, 40, 50]);
    // strictly greater than the 30 s grace period
    assert_eq!(alert_counts, vec![0, 0, 0, 1, 1]);
}

#[test]
fn test_offline_alert_fires_on_the_cycle_that_crosses_grace() {
    let state = StateStore::new();
    let host = create_test_host("pi");
    let seen = Utc::now();
    process_fetch(&state, &host, Ok(HEALTHY_OUTPUT.to_string()), seen);

    let (_, alerts) = process_fetch(
        &state,
        &host,
        offline(),
        seen + TimeDelta::milliseconds(30_900),
    );

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "OFFLINE for 0m 30s (limit 30s)");
}

#[test]
fn test_offline_alert_and_detail_text() {
    let state = StateStore::new();
    let host = create_test_host("pi");
    let seen = Utc::now();
    process_fetch(&state, &host, Ok(String::new()), seen);

    let (snapshot, alerts) =
        process_fetch(&state, &host, offline(), seen + TimeDelta::seconds(3600));

    assert_matches!(&snapshot, HostSnapshot::Offline(record) if record.detail.ends_with(", 1h 0m ago)"));
    assert_eq!(
        alerts[0].kind,
        AlertKind::Offline {
            seconds: 3600,
            limit: 30
        }
    );
    assert_eq!(alerts[0].message, "OFFLINE for 1h 0m (limit 30s)");
}

#[test]
fn test_recovery_resets_offline_state() {
    let state = StateStore::new();
    let host = create_test_host("pi");
    let seen = Utc::now();
    process_fetch(&state, &host, Ok(String::new()), seen);
    process_fetch(&state, &host, offline(), seen + TimeDelta::seconds(120));

    let back = seen + TimeDelta::seconds(130);
    let (snapshot, _) = process_fetch(&state, &host, Ok(String::new()), back);
    assert_eq!(snapshot.status(), HostStatus::Online);

    let (snapshot, alerts) =
        process_fetch(&state, &host, offline(), back + TimeDelta::seconds(5));
    assert_eq!(
        snapshot.status(),
        HostStatus::Offline {
            last_seen: Some(back),
            offline_secs: Some(5)
        }
    );
    assert!(alerts.is_empty());
}

#[test]
fn test_never_seen_host_never_alerts() {
    let state = StateStore::new();
    let host = create_test_host("ghost");
    let now = Utc::now();

    for minutes in [0, 5, 60] {
        let (snapshot, alerts) =
            process_fetch(&state, &host, offline(), now + TimeDelta::minutes(minutes));
        assert!(alerts.is_empty());
        assert_matches!(snapshot, HostSnapshot::Offline(record) if record.detail == "Offline");
    }
}

#[test]
fn test_garbage_output_degrades_to_defaults() {
    let state = StateStore::new();
    let host = create_test_host("pi");

    let (snapshot, alerts) = process_fetch(
        &state,
        &host,
        Ok("bash: top: command not found\nCPU:\nTMP:N/A\nMEM:lots\nOS:".to_string()),
        Utc::now(),
    );

    let snapshot = snapshot.as_online().unwrap();
    let defaults = ParsedMetrics::default();
    assert_eq!(snapshot.cpu, defaults.cpu);
    assert_eq!(snapshot.temperature, 0.0);
    assert_eq!(snapshot.memory.percent, 0.0);
    assert_eq!(snapshot.os, "Linux");
    assert_eq!(snapshot.uptime, "N/A");
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn test_corrupt_host_file_yields_empty_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, "[{ not json").unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    let orchestrator = Orchestrator::new(Arc::new(JsonHostStore::new(&path)), fetcher.clone());

    let report = orchestrator.run_cycle().await.unwrap();

    assert!(report.hosts.is_empty());
    assert_eq!(fetcher.calls(), 0);
    // left for the user to fix
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{ not json");
}

#[tokio::test]
async fn test_unreadable_host_file_keeps_cross_cycle_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    let store = Arc::new(JsonHostStore::new(&path));
    store.save(&[create_test_host("a")]).await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.respond("a", HEALTHY_OUTPUT);
    let orchestrator = Orchestrator::new(store.clone(), fetcher.clone());
    orchestrator.run_cycle().await.unwrap();
    let seen = orchestrator.state().last_seen("a").unwrap();

    std::fs::write(&path, "[{ half written").unwrap();
    let report = orchestrator.run_cycle().await.unwrap();
    assert!(report.hosts.is_empty());

    assert_eq!(orchestrator.state().last_seen("a"), Some(seen));
    assert!(orchestrator.state().net_counters("a").is_some());

    // once the file is readable again the host is still known, not never-seen
    store.save(&[create_test_host("a")]).await.unwrap();
    fetcher.fail("a");
    let report = orchestrator.run_cycle().await.unwrap();
    assert_matches!(
        report.hosts["a"].status(),
        HostStatus::Offline { last_seen: Some(last_seen), .. } if last_seen == seen
    );
}

#[tokio::test]
async fn test_missing_host_file_is_created_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");

    let orchestrator = Orchestrator::new(
        Arc::new(JsonHostStore::new(&path)),
        Arc::new(ScriptedFetcher::new()),
    );
    let report = orchestrator.run_cycle().await.unwrap();

    assert!(report.hosts.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
}

#[tokio::test]
async fn test_failed_hosts_do_not_affect_others() {
    let store = Arc::new(MemoryHostStore::with_hosts(
        (0..5).map(|i| create_test_host(&format!("h{i}"))).collect(),
    ));
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.respond("h0", HEALTHY_OUTPUT);
    fetcher.set("h1", Step::Fail(FailureReason::AuthRejected));
    fetcher.set("h2", Step::Fail(FailureReason::NoCredential));
    fetcher.respond("h3", HEALTHY_OUTPUT);
    fetcher.set("h4", Step::Fail(FailureReason::Exec));

    let report = Orchestrator::new(store, fetcher).run_cycle().await.unwrap();

    let mut online: Vec<_> = report
        .hosts
        .values()
        .filter(|snapshot| snapshot.status().is_online())
        .map(|snapshot| snapshot.host_id().to_string())
        .collect();
    online.sort();
    assert_eq!(online, vec!["h0", "h3"]);
    assert_eq!(report.hosts.len(), 5);
}

#[tokio::test]
async fn test_hung_host_is_bounded_by_its_timeouts() {
    let dir = tempfile::tempdir().unwrap();
    let key = dir.path().join("id_ed25519");
    std::fs::write(&key, "not a real key").unwrap();

    // accepts TCP connections but never speaks SSH
    let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let silent_port = silent.local_addr().unwrap().port();
    // nothing listens here
    let closed_port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let mut hung = create_test_host("hung");
    hung.address = "127.0.0.1".to_string();
    hung.port = silent_port;
    let mut refused = create_test_host("refused");
    refused.address = "127.0.0.1".to_string();
    refused.port = closed_port;

    let timeouts = FetchTimeouts {
        connect: Duration::from_millis(500),
        handshake: Duration::from_millis(500),
        command: Duration::from_millis(500),
    };
    let fetcher = SshFetcher::new(timeouts).with_default_keys(vec![key]);
    let store = Arc::new(MemoryHostStore::with_hosts(vec![hung, refused]));
    let orchestrator = Orchestrator::new(store, Arc::new(fetcher));

    let started = Instant::now();
    let report = orchestrator.run_cycle().await.unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed < timeouts.total() + Duration::from_secs(1),
        "cycle took {elapsed:?}"
    );
    assert_eq!(report.hosts.len(), 2);
    assert_eq!(report.online_count(), 0);
    drop(silent);
}
