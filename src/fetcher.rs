//! Remote metrics fetcher.
//!
//! Opens one SSH session per host, runs the probe bundle and returns its
//! standard output. Every way of failing collapses into a
//! [`ConnectionFailure`]; the reason is kept for logging only.

use std::fmt;
use std::io::Read;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use ssh2::Session;
use tracing::{debug, instrument, trace};

use crate::config::{HostConfig, HubConfig};
use crate::probe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Address did not resolve or refused the connection
    Unreachable,
    Timeout,
    Handshake,
    /// No key file could be found for the host
    NoCredential,
    AuthRejected,
    /// The session was up but running the probes failed
    Exec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl ConnectionFailure {
    pub fn new(reason: FailureReason, detail: impl ToString) -> Self {
        Self {
            reason,
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection failed ({:?}): {}", self.reason, self.detail)
    }
}

impl std::error::Error for ConnectionFailure {}

/// Source of raw probe output for one host.
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    async fn fetch(&self, host: &HostConfig) -> Result<String, ConnectionFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    pub connect: Duration,
    pub handshake: Duration,
    pub command: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            handshake: Duration::from_secs(10),
            command: Duration::from_secs(15),
        }
    }
}

impl From<&HubConfig> for FetchTimeouts {
    fn from(config: &HubConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_timeout_secs),
            handshake: Duration::from_secs(config.handshake_timeout_secs),
            command: Duration::from_secs(config.command_timeout_secs),
        }
    }
}

impl FetchTimeouts {
    /// Upper bound for a whole fetch, used as a hard deadline around the
    /// blocking session.
    pub fn total(&self) -> Duration {
        self.connect + self.handshake + self.command
    }
}

/// Fetches probe output over SSH with public key authentication.
#[derive(Debug, Clone)]
pub struct SshFetcher {
    timeouts: FetchTimeouts,
    default_keys: Vec<PathBuf>,
}

impl SshFetcher {
    pub fn new(timeouts: FetchTimeouts) -> Self {
        Self {
            timeouts,
            default_keys: default_key_candidates(),
        }
    }

    /// Replace the keys tried for hosts without (or with a missing) configured key.
    pub fn with_default_keys(mut self, keys: Vec<PathBuf>) -> Self {
        self.default_keys = keys;
        self
    }

    /// Existing key files for `host`, in the order they are tried: the
    /// configured key, then the defaults.
    pub fn key_candidates(&self, host: &HostConfig) -> Vec<PathBuf> {
        host.key_path
            .iter()
            .chain(self.default_keys.iter())
            .filter(|path| path.is_file())
            .cloned()
            .collect()
    }
}

/// `~/.ssh/id_ed25519` first, `~/.ssh/id_rsa` as the fallback type.
fn default_key_candidates() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| {
            ["id_ed25519", "id_rsa"]
                .into_iter()
                .map(|name| home.join(".ssh").join(name))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl MetricsFetcher for SshFetcher {
    #[instrument(skip_all, fields(host = %host.id))]
    async fn fetch(&self, host: &HostConfig) -> Result<String, ConnectionFailure> {
        let keys = self.key_candidates(host);
        if keys.is_empty() {
            return Err(ConnectionFailure::new(
                FailureReason::NoCredential,
                "no usable key file",
            ));
        }

        let timeouts = self.timeouts;
        let session_host = host.clone();
        let task = tokio::task::spawn_blocking(move || run_probes(&session_host, &keys, timeouts));

        match tokio::time::timeout(timeouts.total(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ConnectionFailure::new(FailureReason::Exec, e)),
            Err(_) => Err(ConnectionFailure::new(
                FailureReason::Timeout,
                format!("no result within {:?}", timeouts.total()),
            )),
        }
    }
}

/// Disconnects the session however the probe run ends.
struct SessionGuard(Session);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.0.disconnect(None, "probe finished", None);
    }
}

fn run_probes(
    host: &HostConfig,
    keys: &[PathBuf],
    timeouts: FetchTimeouts,
) -> Result<String, ConnectionFailure> {
    let tcp = connect(&host.address, host.port, timeouts.connect)?;

    let session = Session::new()
        .map_err(|e| ConnectionFailure::new(FailureReason::Handshake, e))?;
    let mut session = SessionGuard(session);
    session.0.set_tcp_stream(tcp);
    session.0.set_timeout(millis(timeouts.handshake));
    session
        .0
        .handshake()
        .map_err(|e| ConnectionFailure::new(FailureReason::Handshake, e))?;

    authenticate(&session.0, &host.user, keys)?;

    session.0.set_timeout(millis(timeouts.command));
    execute(&session.0, &probe::bundle())
}

fn millis(duration: Duration) -> u32 {
    duration.as_millis().try_into().unwrap_or(u32::MAX)
}

fn connect(address: &str, port: u16, timeout: Duration) -> Result<TcpStream, ConnectionFailure> {
    let addrs: Vec<SocketAddr> = (address, port)
        .to_socket_addrs()
        .map_err(|e| ConnectionFailure::new(FailureReason::Unreachable, e))?
        .collect();

    let mut last_failure = ConnectionFailure::new(
        FailureReason::Unreachable,
        format!("{address}:{port} did not resolve"),
    );

    for addr in addrs {
        trace!("connecting to {addr}");
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                last_failure = ConnectionFailure::new(FailureReason::Timeout, e);
            }
            Err(e) => {
                last_failure = ConnectionFailure::new(FailureReason::Unreachable, e);
            }
        }
    }

    Err(last_failure)
}

fn authenticate(session: &Session, user: &str, keys: &[PathBuf]) -> Result<(), ConnectionFailure> {
    for key in keys {
        match session.userauth_pubkey_file(user, None, key, None) {
            Ok(()) if session.authenticated() => {
                trace!("authenticated with {}", key.display());
                return Ok(());
            }
            Ok(()) => {}
            Err(e) => debug!("key {} rejected: {e}", key.display()),
        }
    }

    Err(ConnectionFailure::new(
        FailureReason::AuthRejected,
        format!("none of {} key(s) accepted for {user}", keys.len()),
    ))
}

fn execute(session: &Session, command: &str) -> Result<String, ConnectionFailure> {
    let exec_failure = |e: &dyn fmt::Display| ConnectionFailure::new(FailureReason::Exec, e);

    let mut channel = session.channel_session().map_err(|e| exec_failure(&e))?;
    channel.exec(command).map_err(|e| exec_failure(&e))?;

    let mut output = Vec::new();
    channel
        .read_to_end(&mut output)
        .map_err(|e| exec_failure(&e))?;
    let _ = channel.wait_close();

    Ok(String::from_utf8_lossy(&output).into_owned())
}
