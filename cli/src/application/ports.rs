//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{CommandError, Identity, Registry, Server};

// ── Remote command handles ────────────────────────────────────────────────────

/// A command started on a remote session.
///
/// Holds the two handles the runner hands back immediately: the completion
/// handle (trimmed stdout, or why the command could not complete) and the
/// diagnostics side channel (stderr lines and non-zero exit notices).
#[derive(Debug)]
pub struct RemoteCommand {
    completion: oneshot::Receiver<Result<String, CommandError>>,
    diagnostics: mpsc::UnboundedReceiver<String>,
    command: String,
}

/// Everything a finished command reported.
#[derive(Debug)]
pub struct CommandReport {
    pub output: Result<String, CommandError>,
    pub diagnostics: Vec<String>,
}

impl RemoteCommand {
    #[must_use]
    pub fn new(
        command: &str,
        completion: oneshot::Receiver<Result<String, CommandError>>,
        diagnostics: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            completion,
            diagnostics,
            command: command.to_string(),
        }
    }

    /// A handle whose command has already finished.
    #[must_use]
    pub fn finished(
        command: &str,
        output: Result<String, CommandError>,
        diagnostics: &[&str],
    ) -> Self {
        let (done_tx, done_rx) = oneshot::channel();
        let (diag_tx, diag_rx) = mpsc::unbounded_channel();
        for line in diagnostics {
            let _ = diag_tx.send((*line).to_string());
        }
        let _ = done_tx.send(output);
        Self::new(command, done_rx, diag_rx)
    }

    /// Wait for completion, then collect every diagnostic sent before it.
    pub async fn wait(self) -> CommandReport {
        let Self {
            completion,
            mut diagnostics,
            command,
        } = self;
        let output = completion
            .await
            .unwrap_or(Err(CommandError::Dropped { command }));
        let mut lines = Vec::new();
        while let Ok(line) = diagnostics.try_recv() {
            lines.push(line);
        }
        CommandReport {
            output,
            diagnostics: lines,
        }
    }
}

// ── Remote session ports ─────────────────────────────────────────────────────

/// An authenticated shell session on the remote host.
///
/// Sessions run one command at a time; `start` refuses with
/// [`CommandError::Busy`] while a previous command is still in flight.
pub trait RemoteSession {
    /// The identity this session is logged in as.
    fn identity(&self) -> Identity;

    /// Start `command` and return its handles without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote process could not be started.
    fn start(&self, command: &str) -> Result<RemoteCommand, CommandError>;
}

/// Opens authenticated sessions.
#[allow(async_fn_in_trait)]
pub trait SessionOpener {
    type Session: RemoteSession;

    /// Open a session on `host` as `identity`.
    ///
    /// Implementations must bound the attempt in time.
    async fn open(&self, host: &str, identity: Identity) -> Result<Self::Session>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output, using the runner's default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Local toolchain port ─────────────────────────────────────────────────────

/// Tools on the operator's machine: secret-management helpers and key generation.
#[allow(async_fn_in_trait)]
pub trait LocalToolchain {
    /// Whether `tool` can be invoked.
    async fn is_installed(&self, tool: &str) -> bool;
    /// Install `tool` with the local package manager.
    async fn install(&self, tool: &str) -> Result<()>;
    /// Generate a fresh age keypair and return the generator's raw stdout.
    async fn generate_keypair(&self) -> Result<String>;
}

// ── Registry store port ──────────────────────────────────────────────────────

/// Persistence of the server registry.
pub trait RegistryStore {
    /// Read the registry, or `None` when the file does not exist.
    fn load(&self) -> Result<Option<Registry>>;
    /// Read the file as a legacy single-server document.
    fn load_legacy(&self) -> Result<Server>;
    /// Write the full registry.
    fn save(&self, registry: &Registry) -> Result<()>;
    /// Location of the registry file.
    fn path(&self) -> &Path;
}
