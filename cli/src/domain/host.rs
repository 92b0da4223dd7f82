//! Facts about a remote host: login identities, platform ids and keypairs.

use anyhow::Result;

use crate::domain::stages::{PRIVILEGED_USER, SERVICE_USER};

/// A login identity on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Privileged,
    Service,
}

impl Identity {
    /// Order in which identities are tried when logging in.
    pub const LOGIN_ORDER: [Identity; 2] = [Identity::Privileged, Identity::Service];

    #[must_use]
    pub fn user(self) -> &'static str {
        match self {
            Self::Privileged => PRIVILEGED_USER,
            Self::Service => SERVICE_USER,
        }
    }
}

/// Map `uname -m` output to a container platform id.
#[must_use]
pub fn platform_id_for_arch(arch: &str) -> Option<&'static str> {
    match arch.trim() {
        "x86_64" | "amd64" => Some("linux/amd64"),
        "aarch64" | "arm64" => Some("linux/arm64"),
        _ => None,
    }
}

/// An age keypair as printed by `age-keygen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeKeypair {
    pub public_key: String,
    pub secret_key: String,
}

/// Parse `age-keygen` output:
///
/// ```text
/// # created: 2024-05-01T10:00:00Z
/// # public key: age1...
/// AGE-SECRET-KEY-1...
/// ```
///
/// # Errors
///
/// Returns an error if either the public key comment or the secret key line
/// is missing.
pub fn parse_age_keygen(output: &str) -> Result<AgeKeypair> {
    let public_key = output
        .lines()
        .find_map(|l| l.trim().strip_prefix("# public key:"))
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| anyhow::anyhow!("age-keygen output has no public key line"))?;
    let secret_key = output
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("AGE-SECRET-KEY-"))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("age-keygen output has no secret key line"))?;
    Ok(AgeKeypair {
        public_key,
        secret_key,
    })
}
