//! Shared mock infrastructure for unit tests.
//!
//! `FakeHost` scripts how a remote host answers: which identities it accepts
//! and what each command prints. Openers, sessions and the toolchain record
//! every call so tests can assert on ordering.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use berth_cli::application::ports::{
    LocalToolchain, RegistryStore, RemoteCommand, RemoteSession, SessionOpener,
};
use berth_cli::domain::{CommandError, Identity, Registry, Server};

pub const KEYGEN_OUTPUT: &str = "# created: 2024-05-01T10:00:00Z\n# public key: age1fresh\nAGE-SECRET-KEY-1FRESH\n";

// ── Remote host ──────────────────────────────────────────────────────────────

/// How the host answers a command whose text contains `pattern`.
#[derive(Clone, Debug)]
pub struct Reply {
    pattern: String,
    output: Result<String, CommandError>,
    diagnostics: Vec<String>,
}

/// A scripted remote host shared by every session opened on it.
#[derive(Debug)]
pub struct FakeHost {
    accepts: Vec<Identity>,
    replies: Mutex<Vec<Reply>>,
    /// Every identity a login was attempted with, in order.
    pub attempts: Mutex<Vec<Identity>>,
    /// Every command started, with the identity that ran it.
    pub ran: Mutex<Vec<(Identity, String)>>,
}

impl FakeHost {
    /// A host accepting the given identities; commands print nothing by default.
    pub fn accepting(accepts: &[Identity]) -> Arc<Self> {
        Arc::new(Self {
            accepts: accepts.to_vec(),
            replies: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            ran: Mutex::new(Vec::new()),
        })
    }

    /// A fresh Ubuntu x86 host reachable as root and as the service user.
    pub fn fresh() -> Arc<Self> {
        let host = Self::accepting(&Identity::LOGIN_ORDER);
        host.reply("/etc/os-release", "ubuntu");
        host.reply("uname -m", "x86_64");
        host
    }

    /// Answer commands containing `pattern` with `stdout`. Later replies win.
    pub fn reply(&self, pattern: &str, stdout: &str) {
        self.push(pattern, Ok(stdout.to_string()), Vec::new());
    }

    /// Answer with stdout plus stderr lines (as a non-zero exit would).
    pub fn reply_with_stderr(&self, pattern: &str, stdout: &str, stderr: &[&str]) {
        let diagnostics = stderr.iter().map(|l| (*l).to_string()).collect();
        self.push(pattern, Ok(stdout.to_string()), diagnostics);
    }

    /// Make commands containing `pattern` fail to complete.
    pub fn fail(&self, pattern: &str, error: CommandError) {
        self.push(pattern, Err(error), Vec::new());
    }

    fn push(&self, pattern: &str, output: Result<String, CommandError>, diagnostics: Vec<String>) {
        self.replies.lock().expect("lock").push(Reply {
            pattern: pattern.to_string(),
            output,
            diagnostics,
        });
    }

    fn answer(&self, command: &str) -> Reply {
        self.replies
            .lock()
            .expect("lock")
            .iter()
            .rev()
            .find(|r| command.contains(&r.pattern))
            .cloned()
            .unwrap_or(Reply {
                pattern: String::new(),
                output: Ok(String::new()),
                diagnostics: Vec::new(),
            })
    }

    /// Commands run so far, without identities.
    pub fn commands(&self) -> Vec<String> {
        self.ran
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// `true` if any command run so far contains `needle`.
    pub fn ran_containing(&self, needle: &str) -> bool {
        self.commands().iter().any(|c| c.contains(needle))
    }
}

pub struct FakeOpener {
    pub host: Arc<FakeHost>,
}

impl FakeOpener {
    pub fn new(host: &Arc<FakeHost>) -> Self {
        Self {
            host: Arc::clone(host),
        }
    }
}

impl SessionOpener for FakeOpener {
    type Session = FakeSession;

    async fn open(&self, _host: &str, identity: Identity) -> Result<FakeSession> {
        self.host.attempts.lock().expect("lock").push(identity);
        if !self.host.accepts.contains(&identity) {
            anyhow::bail!("Permission denied (publickey)");
        }
        Ok(FakeSession {
            host: Arc::clone(&self.host),
            identity,
        })
    }
}

#[derive(Debug)]
pub struct FakeSession {
    host: Arc<FakeHost>,
    identity: Identity,
}

impl RemoteSession for FakeSession {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn start(&self, command: &str) -> Result<RemoteCommand, CommandError> {
        self.host
            .ran
            .lock()
            .expect("lock")
            .push((self.identity, command.to_string()));
        let reply = self.host.answer(command);
        let diagnostics: Vec<&str> = reply.diagnostics.iter().map(String::as_str).collect();
        Ok(RemoteCommand::finished(command, reply.output, &diagnostics))
    }
}

// ── Local toolchain ──────────────────────────────────────────────────────────

pub struct FakeToolchain {
    installed: Mutex<Vec<String>>,
    pub install_fails: bool,
    pub keygen_output: String,
    pub installs: Mutex<Vec<String>>,
    pub keygens: Mutex<usize>,
}

impl FakeToolchain {
    pub fn with_installed(tools: &[&str]) -> Self {
        Self {
            installed: Mutex::new(tools.iter().map(|t| (*t).to_string()).collect()),
            install_fails: false,
            keygen_output: KEYGEN_OUTPUT.to_string(),
            installs: Mutex::new(Vec::new()),
            keygens: Mutex::new(0),
        }
    }

    pub fn ready() -> Self {
        Self::with_installed(&["sops", "age"])
    }
}

impl LocalToolchain for FakeToolchain {
    async fn is_installed(&self, tool: &str) -> bool {
        self.installed.lock().expect("lock").iter().any(|t| t == tool)
    }

    async fn install(&self, tool: &str) -> Result<()> {
        self.installs.lock().expect("lock").push(tool.to_string());
        if self.install_fails {
            anyhow::bail!("brew: command not found");
        }
        self.installed.lock().expect("lock").push(tool.to_string());
        Ok(())
    }

    async fn generate_keypair(&self) -> Result<String> {
        *self.keygens.lock().expect("lock") += 1;
        Ok(self.keygen_output.clone())
    }
}

// ── Registry store ───────────────────────────────────────────────────────────

pub struct MemoryRegistryStore {
    pub registry: Mutex<Option<Registry>>,
    pub legacy: Option<Server>,
    pub save_fails: bool,
    pub saves: Mutex<usize>,
    path: PathBuf,
}

impl MemoryRegistryStore {
    pub fn new(initial: Option<Registry>) -> Self {
        Self {
            registry: Mutex::new(initial),
            legacy: None,
            save_fails: false,
            saves: Mutex::new(0),
            path: PathBuf::from("/memory/berth/default.yaml"),
        }
    }

    pub fn saved(&self) -> Option<Registry> {
        self.registry.lock().expect("lock").clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("lock")
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn load(&self) -> Result<Option<Registry>> {
        Ok(self.registry.lock().expect("lock").clone())
    }

    fn load_legacy(&self) -> Result<Server> {
        self.legacy
            .clone()
            .ok_or_else(|| anyhow::anyhow!("not a legacy document"))
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        *self.saves.lock().expect("lock") += 1;
        if self.save_fails {
            anyhow::bail!("disk full");
        }
        *self.registry.lock().expect("lock") = Some(registry.clone());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
