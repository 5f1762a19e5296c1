//! VPN client lifecycle
//!
//! The manager owns at most one client subprocess. `rotate` and `release`
//! both take the manager's lock for their whole duration, so they are
//! mutually exclusive even when called from several tasks.

use crate::config::VpnConfig;
use crate::identity::{ConnectionState, IdentityError, PublicIpResolver};
use rand::Rng;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Line the VPN client prints once the tunnel is up
pub const READINESS_MARKER: &str = "Initialization Sequence Completed";

/// Number of stderr lines kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for exit once the client closed its stdout
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// Settings for launching and stopping the VPN client
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// Path to the VPN client binary
    pub binary: PathBuf,

    /// Directory holding per-server config files
    pub config_dir: PathBuf,

    /// Config file name pattern; `{n}` is replaced by the server number
    pub config_pattern: String,

    /// Credentials file handed to the client
    pub auth_file: PathBuf,

    /// Servers are numbered `1..=pool_size`
    pub pool_size: u32,

    /// Wall-clock limit for the readiness marker to appear
    pub connect_timeout: Duration,

    /// How long a terminated client may take to exit before it is killed
    pub shutdown_timeout: Duration,
}

impl IdentitySettings {
    pub fn from_config(config: &VpnConfig) -> Self {
        Self {
            binary: PathBuf::from(&config.path),
            config_dir: PathBuf::from(&config.config_dir),
            config_pattern: config.config_pattern.clone(),
            auth_file: PathBuf::from(&config.auth_file),
            pool_size: config.pool_size,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }

    /// Path of the config file for a server number
    pub fn server_config_path(&self, server: u32) -> PathBuf {
        self.config_dir
            .join(self.config_pattern.replace("{n}", &server.to_string()))
    }
}

/// A running, verified VPN client
struct Connection {
    child: Child,
    server: u32,
}

struct Inner {
    state: ConnectionState,
    connection: Option<Connection>,
}

/// Owns the VPN client subprocess and rotates the crawler's public IP
pub struct NetworkIdentityManager {
    settings: IdentitySettings,
    resolver: PublicIpResolver,
    inner: Mutex<Inner>,
}

impl NetworkIdentityManager {
    pub fn new(settings: IdentitySettings, resolver: PublicIpResolver) -> Self {
        Self {
            settings,
            resolver,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                connection: None,
            }),
        }
    }

    /// Builds a manager from the `[vpn]` configuration section
    pub fn from_config(config: &VpnConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            IdentitySettings::from_config(config),
            PublicIpResolver::from_config(config)?,
        ))
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Public IP as currently seen from outside
    pub async fn public_ip(&self) -> Result<String, IdentityError> {
        self.resolver.current_ip().await
    }

    /// Connects to a random server from the pool and returns the new public IP
    ///
    /// Any active connection is released first. The rotation fails with
    /// `IdentityUnchanged` if the public IP after connecting equals
    /// `previous_ip`; the client is killed in that case.
    pub async fn rotate(&self, previous_ip: &str) -> Result<String, IdentityError> {
        let mut inner = self.inner.lock().await;
        self.release_locked(&mut inner).await?;

        let server = self.pick_server();
        inner.state = ConnectionState::Connecting;

        match self.connect(server, previous_ip).await {
            Ok((connection, public_ip)) => {
                tracing::info!(
                    "VPN server {} connection established, public IP is now {}",
                    server,
                    public_ip
                );
                inner.connection = Some(connection);
                inner.state = ConnectionState::Connected;
                Ok(public_ip)
            }
            Err(e) => {
                inner.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Terminates the active connection, if any
    ///
    /// Returns `ForceKill` when the client did not exit within the shutdown
    /// timeout; the client has been killed by then, but the caller must know
    /// that it did not shut down cleanly.
    pub async fn release(&self) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().await;
        self.release_locked(&mut inner).await
    }

    async fn release_locked(&self, inner: &mut Inner) -> Result<(), IdentityError> {
        let Some(mut connection) = inner.connection.take() else {
            inner.state = ConnectionState::Disconnected;
            return Ok(());
        };

        inner.state = ConnectionState::Terminating;
        let result = self.terminate(&mut connection.child).await;
        inner.state = ConnectionState::Disconnected;

        if result.is_ok() {
            tracing::info!("VPN connection to server {} terminated", connection.server);
        }
        result
    }

    fn pick_server(&self) -> u32 {
        rand::thread_rng().gen_range(1..=self.settings.pool_size.max(1))
    }

    async fn connect(
        &self,
        server: u32,
        previous_ip: &str,
    ) -> Result<(Connection, String), IdentityError> {
        let config_path = self.settings.server_config_path(server);
        tracing::info!("Establishing VPN connection to server {} ...", server);
        tracing::debug!("VPN client config: {}", config_path.display());

        let mut child = self.spawn_client(&config_path)?;
        let stdout = child.stdout.take().ok_or_else(|| self.missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| self.missing_pipe("stderr"))?;
        let stderr_tail = drain_stderr(stderr);

        let mut lines = OutputLines::new(stdout);
        let waited =
            tokio::time::timeout(self.settings.connect_timeout, wait_for_marker(&mut lines)).await;

        match waited {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) | Ok(Err(_)) => {
                let status = exit_status(&mut child).await;
                let stderr = stderr_tail.await.unwrap_or_default().join("\n");
                return Err(IdentityError::ConnectionFailed {
                    server,
                    status,
                    stderr,
                });
            }
            Err(_) => {
                kill_quietly(&mut child).await;
                return Err(IdentityError::ConnectionTimeout {
                    server,
                    timeout: self.settings.connect_timeout,
                });
            }
        }

        // The client keeps logging after readiness; keep its pipe drained.
        tokio::spawn(forward_stdout(lines));

        let public_ip = match self.resolver.current_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                kill_quietly(&mut child).await;
                return Err(e);
            }
        };

        if public_ip == previous_ip {
            tracing::warn!("IP address did not change after VPN connection");
            kill_quietly(&mut child).await;
            return Err(IdentityError::IdentityUnchanged { ip: public_ip });
        }

        Ok((Connection { child, server }, public_ip))
    }

    fn spawn_client(&self, config_path: &Path) -> Result<Child, IdentityError> {
        Command::new(&self.settings.binary)
            .arg("--config")
            .arg(config_path)
            .arg("--auth-user-pass")
            .arg(&self.settings.auth_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| IdentityError::Spawn {
                binary: self.settings.binary.display().to_string(),
                source,
            })
    }

    fn missing_pipe(&self, name: &str) -> IdentityError {
        IdentityError::Spawn {
            binary: self.settings.binary.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("{} of the VPN client was not captured", name),
            ),
        }
    }

    async fn terminate(&self, child: &mut Child) -> Result<(), IdentityError> {
        // Already reaped
        let Some(pid) = child.id() else {
            return Ok(());
        };

        if let Err(e) = send_terminate(child, pid).await {
            tracing::warn!("Failed to signal VPN client {}: {}", pid, e);
        }

        match tokio::time::timeout(self.settings.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("VPN client {} exited with {}", pid, status);
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to wait for VPN client {}: {}", pid, e);
                kill_quietly(child).await;
                Ok(())
            }
            Err(_) => {
                tracing::error!("Fail to terminate VPN connection, killing client {}", pid);
                kill_quietly(child).await;
                Err(IdentityError::ForceKill {
                    pid,
                    waited: self.settings.shutdown_timeout,
                })
            }
        }
    }
}

/// Line reader over client output that tolerates bytes that are not UTF-8
struct OutputLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputLines<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Next line without its terminator, or `None` at end of stream
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Reads client output until the readiness marker or end of stream
async fn wait_for_marker(lines: &mut OutputLines<ChildStdout>) -> std::io::Result<bool> {
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        tracing::debug!(target: "vpn", "{}", line);
        if line.contains(READINESS_MARKER) {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn forward_stdout(mut lines: OutputLines<ChildStdout>) {
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::trace!(target: "vpn", "{}", line);
    }
}

/// Drains stderr in the background, returning its last lines at EOF
fn drain_stderr(stderr: ChildStderr) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut lines = OutputLines::new(stderr);
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "vpn", "stderr: {}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail.into_iter().collect()
    })
}

async fn exit_status(child: &mut Child) -> String {
    match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
        Ok(Ok(status)) => status.to_string(),
        Ok(Err(e)) => format!("wait failed: {}", e),
        Err(_) => {
            kill_quietly(child).await;
            "closed its output without exiting".to_string()
        }
    }
}

async fn kill_quietly(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::debug!("Kill of VPN client failed: {}", e);
    }
}

#[cfg(unix)]
async fn send_terminate(_child: &mut Child, pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
async fn send_terminate(child: &mut Child, _pid: u32) -> std::io::Result<()> {
    child.start_kill()
}
