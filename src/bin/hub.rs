use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arccat::{
    HostSnapshot,
    actors::{messages::CycleEvent, notifier::NotifierHandle, poller::PollerHandle},
    config::HubConfig,
    fetcher::{FetchTimeouts, SshFetcher},
    notify::build_sinks,
    orchestrator::Orchestrator,
    storage::json::JsonHostStore,
    util::{get_default_key, get_hosts_file, init_tracing},
};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Parser)]
#[command(name = "arccat-hub")]
#[command(about = "Polls a fleet of hosts over SSH and raises threshold alerts", long_about = None)]
struct Args {
    /// Hub settings (TOML), defaults to ~/.config/arccat/hub.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host records (JSON), overrides the settings and ARCCAT_HOSTS_FILE
    #[arg(short = 'f', long, value_name = "FILE")]
    hosts_file: Option<PathBuf>,

    /// Print every cycle report as one JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing("arccat_hub", args.verbose);
    trace!("started with args: {args:?}");

    let mut config = HubConfig::load(args.config.as_deref())?;
    if let Some(path) = args.hosts_file.clone().or_else(get_hosts_file) {
        config.hosts_file = path;
    }
    if let Some(key) = get_default_key() {
        config.default_key = Some(key);
    }
    debug!("using hosts file {}", config.hosts_file.display());

    let mut fetcher = SshFetcher::new(FetchTimeouts::from(&config));
    if let Some(key) = &config.default_key {
        fetcher = fetcher.with_default_keys(vec![key.clone()]);
    }

    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(JsonHostStore::new(&config.hosts_file)),
            Arc::new(fetcher),
        )
        .with_max_workers(config.max_workers),
    );

    let (report_tx, report_rx) = broadcast::channel::<CycleEvent>(64);
    let notifier = NotifierHandle::spawn(build_sinks(&config.notifiers), report_rx);

    if args.once {
        let report = orchestrator
            .run_cycle()
            .await
            .context("failed to run poll cycle")?;
        let report = Arc::new(report);
        present(&report, args.json)?;
        let _ = report_tx.send(report);

        let stats = notifier.shutdown().await?;
        debug!(
            "delivered {} alert notification(s), {} failed",
            stats.dispatched - stats.failed,
            stats.failed
        );
        return Ok(());
    }

    let presenter = tokio::spawn(presentation(report_tx.subscribe(), args.json));
    let poller = PollerHandle::spawn(
        orchestrator,
        Duration::from_secs(config.interval_secs.max(1)),
        report_tx,
    );

    info!(
        "polling every {}s with up to {} workers",
        config.interval_secs, config.max_workers
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    poller.shutdown().await?;
    notifier.shutdown().await?;
    presenter.abort();

    Ok(())
}

async fn presentation(mut reports: broadcast::Receiver<CycleEvent>, json: bool) {
    loop {
        match reports.recv().await {
            Ok(report) => {
                if let Err(e) = present(&report, json) {
                    warn!("failed to present cycle {}: {e:#}", report.cycle);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("output lagged, skipped {skipped} cycle report(s)");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn present(report: &CycleEvent, json: bool) -> anyhow::Result<()> {
    if json {
        let line = serde_json::to_string(report.as_ref()).context("failed to encode report")?;
        println!("{line}");
        return Ok(());
    }

    let mut hosts: Vec<_> = report.hosts.values().collect();
    hosts.sort_by(|a, b| a.host_id().cmp(b.host_id()));

    for host in hosts {
        match host {
            HostSnapshot::Online(snapshot) => info!(
                "{} [{}] cpu {}% | ram {} | disk {} | {} | up {}",
                snapshot.host_name,
                snapshot.status,
                snapshot.cpu,
                snapshot.memory_text,
                snapshot.disk_text,
                snapshot.net_instant,
                snapshot.uptime
            ),
            HostSnapshot::Offline(record) => info!("{} [{}]", record.host_name, record.detail),
        }
    }

    Ok(())
}
