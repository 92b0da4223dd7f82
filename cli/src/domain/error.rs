//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::stages::Phase;

// ── Connection errors ─────────────────────────────────────────────────────────

/// Every login identity was rejected, or the host could not be reached at all.
#[derive(Debug, Error)]
#[error("unable to establish SSH connection to {host} ({})", .attempts.join("; "))]
pub struct ConnectionError {
    /// Address that was dialled.
    pub host: String,
    /// One entry per identity tried, in the order tried: `"<user>: <reason>"`.
    pub attempts: Vec<String>,
}

// ── Command errors ────────────────────────────────────────────────────────────

/// A remote command could not be started or did not run to completion.
///
/// A remote process that ran and exited non-zero is not a `CommandError`;
/// that surfaces as a diagnostic on the command's stderr channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("could not start `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("connection lost while running `{command}`")]
    SessionLost { command: String },

    #[error("session is busy, refusing to start `{command}`")]
    Busy { command: String },

    #[error("`{command}` ended without reporting its output")]
    Dropped { command: String },
}

// ── Stage errors ──────────────────────────────────────────────────────────────

/// A stage's probe or one of its commands failed.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageError {
    pub stage: String,
    #[source]
    pub source: CommandError,
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Terminal failure of the provisioning workflow.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{phase} failed: {cause}")]
    Phase { phase: Phase, cause: String },

    #[error("Failed to write config: {cause}")]
    Persist { cause: String },
}

impl ProvisionError {
    /// Attribute `err` (with its full context chain) to `phase`.
    pub fn in_phase(phase: Phase, err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self::Phase {
            phase,
            cause: format!("{err:#}"),
        }
    }

    /// The phase that failed, if the failure happened inside one.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            Self::Persist { .. } => None,
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors reading, writing or resolving names in the server registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("berth config not found at {} - run 'berth init'", .path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("cannot write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error(
        "An older version of the config file found (version '{found}'). Please run 'berth config migrate'."
    )]
    Outdated { found: String },

    #[error("context '{0}' not found")]
    ContextNotFound(String),

    #[error("server '{0}' not found")]
    ServerNotFound(String),

    #[error("cannot determine the user configuration directory; set BERTH_CONFIG or pass --config")]
    NoConfigDir,
}

// ── Validation errors ─────────────────────────────────────────────────────────

/// Malformed or missing user input, detected before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You entered an incorrect IPv4 address - {0}")]
    InvalidAddress(String),

    #[error("An email is needed before you proceed")]
    MissingEmail,

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("invalid server name '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidName(String),

    #[error("{0} is required when running non-interactively (pass it as a flag)")]
    MissingInput(&'static str),
}
