//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Provision a VPS to host your apps
#[derive(Parser)]
#[command(
    name = "berth",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Path to the config file (overridden by BERTH_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also set by a non-empty NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Configure your VPS to host your apps
    Init(commands::init::InitArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be resolved or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            quiet,
            no_color,
            command,
        } = self;
        let yes = matches!(&command, Command::Init(args) if args.yes);
        let app = AppContext::new(&AppFlags {
            output: OutputFlags { no_color, quiet },
            behaviour: BehaviourFlags { yes, config },
        })?;

        match command {
            Command::Init(args) => commands::init::run(&app, &args).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
        }
    }
}
