//! SSH sessions backed by the system `ssh` client.
//!
//! Logging in starts an OpenSSH control master; every command afterwards is
//! multiplexed over that master, so a session costs one TCP handshake and one
//! authentication no matter how many commands it runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Semaphore, mpsc, oneshot};

use crate::application::ports::{CommandRunner, RemoteCommand, RemoteSession, SessionOpener};
use crate::domain::{CommandError, Identity};
use crate::infra::command_runner::drain;

const SSH: &str = "ssh";

/// Upper bound on a login attempt, including the TCP connect.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(20);

/// Exit status `ssh` reserves for its own failures (connection refused or dropped).
///
/// A remote command may exit 255 itself; the control master is checked before
/// the session is declared lost.
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Control sockets live under `/tmp` so their paths stay short.
const CONTROL_ROOT: &str = "/tmp";

/// Client options shared by every invocation for one control directory.
#[must_use]
pub fn ssh_options(control_dir: &Path) -> Vec<String> {
    [
        "BatchMode=yes".to_string(),
        "ConnectTimeout=10".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "ServerAliveInterval=15".to_string(),
        "ServerAliveCountMax=4".to_string(),
        "ControlMaster=auto".to_string(),
        format!("ControlPath={}", control_dir.join("%C").display()),
        "ControlPersist=120".to_string(),
    ]
    .into_iter()
    .flat_map(|opt| ["-o".to_string(), opt])
    .collect()
}

/// The program run as the ssh client, with any arguments placed before ssh's own.
#[derive(Debug, Clone)]
struct Client {
    program: String,
    leading: Vec<String>,
}

impl Client {
    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.leading);
        cmd
    }

    /// Control-master operation (`check`, `exit`) for `destination`.
    fn control(&self, control_path: &Path, op: &str, destination: &str) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.leading)
            .arg("-o")
            .arg(format!("ControlPath={}", control_path.display()))
            .args(["-O", op])
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    async fn master_alive(&self, control_path: &Path, destination: &str) -> bool {
        let mut check = tokio::process::Command::from(self.control(control_path, "check", destination));
        check
            .status()
            .await
            .is_ok_and(|status| status.success())
    }
}

/// Opens [`SshSession`]s; owns the directory holding their control sockets.
pub struct SshSessionOpener<R> {
    runner: R,
    client: Client,
    control_dir: TempDir,
}

impl<R: CommandRunner> SshSessionOpener<R> {
    /// # Errors
    ///
    /// Returns an error if the control socket directory cannot be created.
    pub fn new(runner: R) -> Result<Self> {
        Self::with_client(runner, SSH, &[])
    }

    /// Use `program` as the ssh client, passing `leading` before every
    /// argument list.
    ///
    /// # Errors
    ///
    /// Returns an error if the control socket directory cannot be created.
    pub fn with_client(runner: R, program: &str, leading: &[&str]) -> Result<Self> {
        let control_dir = tempfile::Builder::new()
            .prefix("berth-")
            .tempdir_in(CONTROL_ROOT)
            .context("creating ssh control directory")?;
        Ok(Self {
            runner,
            client: Client {
                program: program.to_string(),
                leading: leading.iter().map(|a| (*a).to_string()).collect(),
            },
            control_dir,
        })
    }

    #[must_use]
    pub fn control_dir(&self) -> &Path {
        self.control_dir.path()
    }
}

impl<R: CommandRunner> SessionOpener for SshSessionOpener<R> {
    type Session = SshSession;

    async fn open(&self, host: &str, identity: Identity) -> Result<SshSession> {
        let options = ssh_options(self.control_dir.path());
        let destination = format!("{}@{host}", identity.user());

        let mut args: Vec<&str> = self.client.leading.iter().map(String::as_str).collect();
        args.extend(options.iter().map(String::as_str));
        args.extend([destination.as_str(), "true"]);
        let output = self
            .runner
            .run_with_timeout(&self.client.program, &args, LOGIN_TIMEOUT)
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                anyhow::bail!("ssh exited with {}", output.status);
            }
            anyhow::bail!("{stderr}");
        }

        Ok(SshSession {
            client: self.client.clone(),
            destination,
            identity,
            control_path: self.control_dir.path().join("%C"),
            options,
            permit: Arc::new(Semaphore::new(1)),
        })
    }
}

/// A logged-in session; runs one command at a time over the control master.
pub struct SshSession {
    client: Client,
    destination: String,
    identity: Identity,
    control_path: PathBuf,
    options: Vec<String>,
    permit: Arc<Semaphore>,
}

impl RemoteSession for SshSession {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn start(&self, command: &str) -> Result<RemoteCommand, CommandError> {
        let permit = Arc::clone(&self.permit)
            .try_acquire_owned()
            .map_err(|_| CommandError::Busy {
                command: command.to_string(),
            })?;

        let mut child = self
            .client
            .command()
            .args(&self.options)
            .arg(&self.destination)
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::Spawn {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let (done_tx, done_rx) = oneshot::channel();
        let (diag_tx, diag_rx) = mpsc::unbounded_channel();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let owned = command.to_string();
        let client = self.client.clone();
        let control_path = self.control_path.clone();
        let destination = self.destination.clone();

        tokio::spawn(async move {
            let forward = async {
                if let Some(stderr) = stderr {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        let _ = diag_tx.send(line);
                    }
                }
            };
            let (status, stdout, ()) = tokio::join!(child.wait(), drain(stdout), forward);

            let result = match status {
                Ok(status) => {
                    let lost = status.code() == Some(SSH_TRANSPORT_FAILURE)
                        && !client.master_alive(&control_path, &destination).await;
                    if lost {
                        Err(CommandError::SessionLost { command: owned })
                    } else {
                        if !status.success() {
                            let _ = diag_tx.send(format!("`{owned}` exited with {status}"));
                        }
                        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
                    }
                }
                Err(e) => Err(CommandError::Spawn {
                    command: owned,
                    reason: e.to_string(),
                }),
            };
            // Free the session before the caller learns the command is done.
            drop(permit);
            let _ = done_tx.send(result);
        });

        Ok(RemoteCommand::new(command, done_rx, diag_rx))
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        let spawned = self
            .client
            .control(&self.control_path, "exit", &self.destination)
            .spawn();
        if let Err(e) = spawned {
            tracing::debug!(destination = %self.destination, "cannot stop control master: {e}");
        }
    }
}
