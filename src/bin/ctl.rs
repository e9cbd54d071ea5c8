use std::path::PathBuf;

use anyhow::Context;
use arccat::{
    config::{AlertThresholds, HostConfig, HubConfig},
    storage::{HostCatalog, NewHost, json::JsonHostStore},
    util::{get_hosts_file, init_tracing},
};
use clap::{Parser, Subcommand};
use tracing::trace;

#[derive(Debug, Parser)]
#[command(name = "arccat-ctl")]
#[command(about = "Manage the hosts polled by arccat-hub", long_about = None)]
struct Args {
    /// Hub settings (TOML), used to find the hosts file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host records (JSON), overrides the settings and ARCCAT_HOSTS_FILE
    #[arg(short = 'f', long, value_name = "FILE")]
    hosts_file: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::Args)]
struct HostArgs {
    /// Display name
    #[arg(long)]
    name: String,

    /// IP address or host name
    #[arg(long)]
    address: String,

    #[arg(long, default_value = "root")]
    user: String,

    #[arg(long)]
    port: Option<u16>,

    /// Private key file; the default keys are tried when omitted
    #[arg(long, value_name = "FILE")]
    key: Option<PathBuf>,
}

impl From<HostArgs> for NewHost {
    fn from(args: HostArgs) -> Self {
        NewHost {
            name: args.name,
            address: args.address,
            port: args.port,
            user: args.user,
            key_path: args.key,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all hosts
    List,

    /// Add a host with default thresholds
    Add(HostArgs),

    /// Replace the connection settings of a host
    Update {
        id: String,
        #[command(flatten)]
        host: HostArgs,
    },

    /// Remove a host
    Remove { id: String },

    /// Change alert thresholds; omitted values stay as they are
    Thresholds {
        id: String,
        #[arg(long)]
        cpu: Option<f64>,
        #[arg(long)]
        temp: Option<f64>,
        #[arg(long)]
        ram: Option<f64>,
        #[arg(long)]
        disk: Option<f64>,
        /// Grace period before an unreachable host raises an alert
        #[arg(long, value_name = "SECONDS")]
        offline: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing("arccat_ctl", args.verbose);
    trace!("started with args: {args:?}");

    let hosts_file = match args.hosts_file.clone().or_else(get_hosts_file) {
        Some(path) => path,
        None => HubConfig::load(args.config.as_deref())?.hosts_file,
    };
    let catalog = HostCatalog::new(JsonHostStore::new(&hosts_file));

    match args.command {
        Command::List => {
            let hosts = catalog
                .list()
                .await
                .with_context(|| format!("failed to read {}", hosts_file.display()))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hosts)?);
            } else {
                hosts.iter().for_each(print_host);
            }
        }
        Command::Add(host) => {
            let created = catalog.create(host.into()).await?;
            show(&created, args.json)?;
        }
        Command::Update { id, host } => {
            let updated = catalog.update(&id, host.into()).await?;
            show(&updated, args.json)?;
        }
        Command::Remove { id } => {
            let removed = catalog.delete(&id).await?;
            println!("removed {} ({})", removed.id, removed.display_name());
        }
        Command::Thresholds {
            id,
            cpu,
            temp,
            ram,
            disk,
            offline,
        } => {
            let current = catalog.get(&id).await?.thresholds;
            let thresholds = AlertThresholds {
                cpu: cpu.unwrap_or(current.cpu),
                temp: temp.unwrap_or(current.temp),
                ram: ram.unwrap_or(current.ram),
                disk: disk.unwrap_or(current.disk),
                offline_seconds: offline.unwrap_or(current.offline_seconds),
            };
            let updated = catalog.update_thresholds(&id, thresholds).await?;
            show(&updated, args.json)?;
        }
    }

    Ok(())
}

fn show(host: &HostConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(host)?);
    } else {
        print_host(host);
    }
    Ok(())
}

fn print_host(host: &HostConfig) {
    let limits = &host.thresholds;
    println!(
        "{:<12} {:<20} {}@{}:{}  cpu>{} temp>{} ram>{} disk>{} offline>{}s",
        host.id,
        host.name,
        host.user,
        host.address,
        host.port,
        limits.cpu,
        limits.temp,
        limits.ram,
        limits.disk,
        limits.offline_seconds
    );
}
