//! Local helper tools: presence checks, installs and age key generation.

use anyhow::Result;

use crate::application::ports::{CommandRunner, LocalToolchain};
use crate::infra::command_runner::INSTALL_TIMEOUT;

const PACKAGE_MANAGER: &str = "brew";
const KEYGEN: &str = "age-keygen";

/// [`LocalToolchain`] backed by programs on the operator's `PATH`.
pub struct HostToolchain<R> {
    runner: R,
}

impl<R: CommandRunner> HostToolchain<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> LocalToolchain for HostToolchain<R> {
    async fn is_installed(&self, tool: &str) -> bool {
        match self.runner.run(tool, &["--version"]).await {
            Ok(out) => out.status.success(),
            Err(e) => {
                tracing::debug!(tool, "not available: {e:#}");
                false
            }
        }
    }

    async fn install(&self, tool: &str) -> Result<()> {
        let out = self
            .runner
            .run_with_timeout(PACKAGE_MANAGER, &["install", tool], INSTALL_TIMEOUT)
            .await?;
        if !out.status.success() {
            anyhow::bail!(
                "{PACKAGE_MANAGER} install {tool} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(())
    }

    async fn generate_keypair(&self) -> Result<String> {
        let out = self.runner.run(KEYGEN, &[]).await?;
        if !out.status.success() {
            anyhow::bail!(
                "{KEYGEN} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}
