//! Infrastructure implementation of the `RegistryStore` port.
//!
//! `YamlRegistryStore` reads and writes the registry as YAML. Saves go through
//! a temp file and a rename, so a crash never leaves a half-written registry.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::de::DeserializeOwned;

use crate::application::ports::RegistryStore;
use crate::domain::{ConfigError, Registry, Server};

/// Registry file on local disk.
pub struct YamlRegistryStore {
    path: PathBuf,
}

impl YamlRegistryStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Read {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write_error(&self, reason: impl ToString) -> ConfigError {
        ConfigError::Write {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl RegistryStore for YamlRegistryStore {
    fn load(&self) -> Result<Option<Registry>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read()?))
    }

    fn load_legacy(&self) -> Result<Server> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound {
                path: self.path.clone(),
            }
            .into());
        }
        Ok(self.read()?)
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        let content = serde_yaml::to_string(registry).map_err(|e| self.write_error(e))?;

        let temp_path = self.path.with_extension("yaml.tmp");
        std::fs::write(&temp_path, content).map_err(|e| self.write_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.write_error(e))?;
        }

        std::fs::rename(&temp_path, &self.path).map_err(|e| self.write_error(e))?;
        tracing::debug!(path = %self.path.display(), "registry saved");
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
