//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` runs local programs (`ssh`, `brew`, `age-keygen`)
//! and kills them if they outlive their timeout.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::application::ports::CommandRunner;

/// Default timeout for short local commands (version checks, key generation).
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for package installs, which download and build.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Production `CommandRunner`.
///
/// Races the child against a sleep with `tokio::select!` and kills it
/// explicitly when the sleep wins, so a hung process is never left behind.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

pub(crate) async fn drain(handle: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(program, ?args, "spawning");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) =
                    tokio::join!(child.wait(), drain(stdout_handle), drain(stderr_handle));
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}
