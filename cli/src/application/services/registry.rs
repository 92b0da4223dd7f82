//! Application service: load the server registry under each command's rules.

use anyhow::Result;

use crate::application::ports::RegistryStore;
use crate::domain::registry::migrate_legacy;
use crate::domain::{ConfigError, Registry};

/// How a command is allowed to find the registry on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAccess {
    /// The file must exist and be the current version.
    Required,
    /// A missing file starts an empty registry; an existing one must be current.
    Optional,
    /// A missing file starts an empty registry; any version is accepted.
    Migration,
}

/// Load the registry from `store` according to `access`.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when a required file is missing,
/// [`ConfigError::Outdated`] for an old document outside of migration, or
/// any read/parse error from the store.
pub fn open_registry(store: &impl RegistryStore, access: RegistryAccess) -> Result<Registry> {
    let Some(registry) = store.load()? else {
        if access == RegistryAccess::Required {
            return Err(ConfigError::NotFound {
                path: store.path().to_path_buf(),
            }
            .into());
        }
        tracing::debug!(path = %store.path().display(), "no registry yet, starting empty");
        return Ok(Registry::default());
    };

    if !registry.is_current_version() && access != RegistryAccess::Migration {
        return Err(ConfigError::Outdated {
            found: registry.version,
        }
        .into());
    }
    Ok(registry)
}

/// Convert the configured file from the legacy single-server layout.
///
/// Nothing is written; the caller decides what to do with the result. A
/// file that is already current (or absent) comes back unchanged.
///
/// # Errors
///
/// Returns an error if the file cannot be read as a legacy document.
pub fn migrate_registry(store: &impl RegistryStore) -> Result<Registry> {
    let registry = open_registry(store, RegistryAccess::Migration)?;
    if registry.is_current_version() {
        tracing::info!(path = %store.path().display(), "registry already current");
        return Ok(registry);
    }
    Ok(migrate_legacy(store.load_legacy()?))
}
