//! Host file round trips and catalog mutations on the JSON store

use std::path::PathBuf;

use arccat::{
    config::{AlertThresholds, HostConfig, HubConfig, NotifierConfig},
    storage::{HostCatalog, HostStore, NewHost, StorageError, json::JsonHostStore},
};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

const LEGACY_FILE: &str = r#"[
  {"id": 1700000000, "name": "pi", "ip": "192.168.1.20", "user": "pi", "ssh_key": ""},
  {"id": "1700000001", "name": "nas", "ip": "192.168.1.30", "port": 2222, "user": "admin",
   "ssh_key": "/home/me/.ssh/nas", "alerts": {"cpu": 70, "offline_sec": 120}},
  {"id": "1700000002", "name": "old", "ip": "192.168.1.40", "user": "root", "alerts": null}
]"#;

fn new_host(name: &str) -> NewHost {
    NewHost {
        name: name.to_string(),
        address: "192.168.1.50".to_string(),
        port: None,
        user: "pi".to_string(),
        key_path: None,
    }
}

#[tokio::test]
async fn test_legacy_records_load_with_defaulted_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, LEGACY_FILE).unwrap();

    let hosts = JsonHostStore::new(&path).load().await.unwrap();

    assert_eq!(hosts.len(), 3);
    assert_eq!(hosts[0].id, "1700000000");
    assert_eq!(hosts[0].port, 22);
    assert_eq!(hosts[0].key_path, None);
    assert_eq!(hosts[0].thresholds, AlertThresholds::default());

    assert_eq!(hosts[1].port, 2222);
    assert_eq!(hosts[1].key_path, Some(PathBuf::from("/home/me/.ssh/nas")));
    assert_eq!(
        hosts[1].thresholds,
        AlertThresholds {
            cpu: 70.0,
            offline_seconds: 120,
            ..AlertThresholds::default()
        }
    );

    assert_eq!(hosts[2].thresholds, AlertThresholds::default());
}

#[tokio::test]
async fn test_fractional_offline_grace_keeps_whole_file_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(
        &path,
        r#"[
  {"id": "1", "name": "pi", "ip": "192.168.1.20", "user": "pi", "alerts": {"offline_sec": 45.5}},
  {"id": "2", "name": "nas", "ip": "192.168.1.30", "user": "admin"}
]"#,
    )
    .unwrap();

    let hosts = JsonHostStore::new(&path).load().await.unwrap();

    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0].thresholds.offline_seconds, 46);
    assert_eq!(hosts[1].thresholds, AlertThresholds::default());
}

#[tokio::test]
async fn test_save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, LEGACY_FILE).unwrap();
    let store = JsonHostStore::new(&path);

    let hosts = store.load().await.unwrap();
    store.save(&hosts).await.unwrap();
    let reloaded = store.load().await.unwrap();

    assert_eq!(reloaded, hosts);

    // thresholds are written out in full, under their stored names
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["alerts"]["offline_sec"], 30);
    assert_eq!(raw[0]["ip"], "192.168.1.20");
    assert!(!dir.path().join("servers.json.tmp").exists());
}

#[tokio::test]
async fn test_catalog_persists_every_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    let catalog = HostCatalog::new(JsonHostStore::new(&path));

    let created = catalog.create(new_host("web")).await.unwrap();
    let limits = AlertThresholds {
        temp: 60.0,
        ..AlertThresholds::default()
    };
    catalog.update_thresholds(&created.id, limits).await.unwrap();

    // a fresh store sees the change
    let on_disk: Vec<HostConfig> = JsonHostStore::new(&path).load().await.unwrap();
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].thresholds.temp, 60.0);

    catalog.delete(&created.id).await.unwrap();
    assert!(JsonHostStore::new(&path).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_refuses_mutation_and_stays_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, "{ broken").unwrap();
    let catalog = HostCatalog::new(JsonHostStore::new(&path));

    assert_matches!(
        catalog.create(new_host("web")).await,
        Err(StorageError::SerializationError(_))
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
}

#[tokio::test]
async fn test_failed_write_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("servers.json");
    let store = JsonHostStore::new(&path);

    let result = store.save(&[]).await;

    assert_matches!(result, Err(StorageError::IoError(_)));
    assert!(!path.exists());
}

#[test]
fn test_hub_config_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hub.toml");
    std::fs::write(
        &path,
        r#"
hosts_file = "/etc/arccat/servers.json"
interval_secs = 30
notifiers = ["log", { webhook = { url = "http://localhost:9000/alerts" } }]
"#,
    )
    .unwrap();

    let config = HubConfig::load(Some(&path)).unwrap();

    assert_eq!(config.hosts_file, PathBuf::from("/etc/arccat/servers.json"));
    assert_eq!(config.interval_secs, 30);
    assert_eq!(config.max_workers, 15);
    assert_eq!(config.command_timeout_secs, 15);
    assert_eq!(config.notifiers.len(), 2);
    assert_matches!(&config.notifiers[1], NotifierConfig::Webhook(hook) if hook.url.ends_with("/alerts"));
}
