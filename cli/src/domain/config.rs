//! Resolution of the process-wide configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access. The caller
//! reads the environment once and hands the raw values in.

use std::path::{Path, PathBuf};

use crate::domain::error::ConfigError;

/// Environment variable that overrides the registry path.
pub const CONFIG_ENV: &str = "BERTH_CONFIG";

/// Registry location relative to the user configuration directory.
pub const DEFAULT_CONFIG_FILE: [&str; 2] = ["berth", "default.yaml"];

/// Immutable configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where the server registry is read from and written to.
    pub registry_path: PathBuf,
}

impl AppConfig {
    /// Layer the registry path: environment override, then the `--config`
    /// flag, then `<config_dir>/berth/default.yaml`.
    ///
    /// An empty environment value counts as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when no layer yields a path.
    pub fn resolve(
        env_override: Option<&str>,
        flag: Option<&Path>,
        config_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let registry_path = if let Some(env) = env_override.filter(|v| !v.trim().is_empty()) {
            PathBuf::from(env)
        } else if let Some(flag) = flag {
            flag.to_path_buf()
        } else {
            let mut path = config_dir.ok_or(ConfigError::NoConfigDir)?.to_path_buf();
            path.extend(DEFAULT_CONFIG_FILE);
            path
        };
        Ok(Self { registry_path })
    }
}
