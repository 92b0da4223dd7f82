//! Application context: unified state passed to every command handler.
//!
//! Configuration is resolved exactly once, here, and never looked up again.

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::AppConfig;
use crate::domain::config::CONFIG_ENV;
use crate::infra::registry_store::YamlRegistryStore;
use crate::output::OutputContext;

/// Environment variable that, like `CI`, turns off every prompt.
pub const YES_ENV: &str = "BERTH_YES";

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `BERTH_YES` env vars).
    pub yes: bool,
    /// Registry path from `--config`.
    pub config: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Resolved, immutable configuration.
    pub config: AppConfig,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `BERTH_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if no registry path can be resolved.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var(YES_ENV).is_ok();
        let env_config = std::env::var(CONFIG_ENV).ok();
        let config = AppConfig::resolve(
            env_config.as_deref(),
            flags.behaviour.config.as_deref(),
            dirs::config_dir().as_deref(),
        )?;
        tracing::debug!(path = %config.registry_path.display(), "registry path resolved");

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            config,
            non_interactive: flags.behaviour.yes || ci_env,
        })
    }

    /// The registry file at the resolved path.
    #[must_use]
    pub fn registry_store(&self) -> YamlRegistryStore {
        YamlRegistryStore::new(self.config.registry_path.clone())
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `BERTH_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Ask the user for a line of text, offering `default` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn prompt(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?.trim().to_string())
    }
}
