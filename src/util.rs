use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

const HOSTS_FILE: &str = "ARCCAT_HOSTS_FILE";

pub fn get_hosts_file() -> Option<PathBuf> {
    std::env::var(HOSTS_FILE)
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

const DEFAULT_KEY: &str = "ARCCAT_DEFAULT_KEY";

pub fn get_default_key() -> Option<PathBuf> {
    std::env::var(DEFAULT_KEY)
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Install the stderr subscriber used by the binaries.
pub fn init_tracing(binary: &'static str, verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let filter = filter::Targets::new().with_targets(vec![("arccat", level), (binary, level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}
