//! `berth config`: inspect and switch contexts, migrate old config files.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::RegistryStore;
use crate::application::services::registry::{RegistryAccess, migrate_registry, open_registry};

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the current context
    Current,
    /// Switch the current context
    Use {
        /// Name of the context to make current
        name: String,
    },
    /// Print an old single-server config converted to the current format
    Migrate,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the registry cannot be read or written, or the
/// requested context does not exist.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    let store = app.registry_store();
    match cmd {
        ConfigCommand::Current => current(&store),
        ConfigCommand::Use { name } => use_context(app, &store, &name),
        ConfigCommand::Migrate => migrate(&store),
    }
}

fn current(store: &impl RegistryStore) -> Result<ExitCode> {
    let registry = open_registry(store, RegistryAccess::Required)?;
    println!("{}", registry.current_context);
    Ok(ExitCode::SUCCESS)
}

fn use_context(app: &AppContext, store: &impl RegistryStore, name: &str) -> Result<ExitCode> {
    let mut registry = open_registry(store, RegistryAccess::Required)?;
    registry.use_context(name)?;
    store.save(&registry)?;
    app.output.success(&format!("Switched to context '{name}'"));
    Ok(ExitCode::SUCCESS)
}

fn migrate(store: &impl RegistryStore) -> Result<ExitCode> {
    let registry = migrate_registry(store)?;
    let yaml = serde_yaml::to_string(&registry).context("serializing migrated config")?;
    print!("{yaml}");
    Ok(ExitCode::SUCCESS)
}
