//! `berth init`: collect server details, then provision the VPS.

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::progress;
use crate::application::services::provision::provision_server;
use crate::application::services::registry::{RegistryAccess, open_registry};
use crate::domain::validate::{suggest_name, validate_address, validate_email, validate_server_name};
use crate::domain::{Registry, Server, ValidationError};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::SshSessionOpener;
use crate::infra::toolchain::HostToolchain;
use crate::output::progress::{RenderOutcome, render};

/// Arguments for the `berth init` command.
#[derive(Args)]
pub struct InitArgs {
    /// IPv4 address of your server
    #[arg(short, long)]
    pub server: Option<String>,

    /// Email address used for TLS certificates
    #[arg(short, long)]
    pub email: Option<String>,

    /// Name of your server
    #[arg(short, long)]
    pub name: Option<String>,

    /// Skip all confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

/// Entry point for `berth init`.
///
/// # Errors
///
/// Returns an error if the registry cannot be opened, an input is invalid,
/// or the provisioning task dies without reporting.
pub async fn run(app: &AppContext, args: &InitArgs) -> Result<ExitCode> {
    let store = app.registry_store();
    let registry = open_registry(&store, RegistryAccess::Optional)?;

    let Some(server) = collect_server(app, args, &registry)? else {
        app.output
            .info("You can use a different server name to complete the setup");
        return Ok(ExitCode::SUCCESS);
    };

    let opener = SshSessionOpener::new(TokioCommandRunner::default())?;
    let toolchain = HostToolchain::new(TokioCommandRunner::default());
    let (reporter, events) = progress::channel();

    app.output.header("berth booting up! 🚀");
    let worker = tokio::spawn(async move {
        let mut registry = registry;
        let result =
            provision_server(&opener, &toolchain, &store, &mut registry, server, reporter).await;
        (registry, result)
    });

    let outcome = render(&app.output, events).await;
    let (_, result) = worker.await.context("provisioning task panicked")?;

    match outcome {
        RenderOutcome::Completed(message) => {
            for line in message.lines() {
                app.output.success(line);
            }
            Ok(ExitCode::SUCCESS)
        }
        RenderOutcome::Failed(message) => {
            app.output.error(&message);
            Ok(ExitCode::FAILURE)
        }
        RenderOutcome::Disconnected => {
            result?;
            anyhow::bail!("provisioning ended without reporting a result")
        }
    }
}

/// Gather name, address and email from flags or prompts, and merge them
/// into the existing server entry of the same name.
///
/// Returns `None` when the user declines to overwrite an existing server.
fn collect_server(app: &AppContext, args: &InitArgs, registry: &Registry) -> Result<Option<Server>> {
    let name = match &args.name {
        Some(name) => name.trim().to_string(),
        None => {
            let suggestion = suggest_name(name_seed());
            if app.non_interactive {
                suggestion
            } else {
                let name = app.prompt("Please enter a name for your VPS", Some(&suggestion))?;
                if name.is_empty() { suggestion } else { name }
            }
        }
    };
    validate_server_name(&name)?;

    let address = required_input(
        app,
        args.server.as_deref(),
        "--server",
        "Please enter the IPv4 address of your VPS",
    )?;
    let address = validate_address(&address)?.to_string();

    let email = required_input(
        app,
        args.email.as_deref(),
        "--email",
        "Please enter an email for use with TLS certs",
    )?;
    validate_email(&email)?;

    let mut server = registry
        .find_server(&name)
        .cloned()
        .unwrap_or_else(|_| Server::new(&name, &address, &email));

    if server.has_keypair() && server.address != address {
        let prompt = format!(
            "The server '{name}' was previously set up with a different address. Would you like to overwrite the settings?"
        );
        let overwrite = app.non_interactive || app.confirm(&prompt, false)?;
        if !overwrite {
            return Ok(None);
        }
    }

    server.address = address;
    server.cert_email = email.trim().to_string();
    Ok(Some(server))
}

fn required_input(
    app: &AppContext,
    flag_value: Option<&str>,
    flag: &'static str,
    prompt: &str,
) -> Result<String> {
    if let Some(value) = flag_value {
        return Ok(value.trim().to_string());
    }
    if app.non_interactive {
        return Err(ValidationError::MissingInput(flag).into());
    }
    app.prompt(prompt, None)
}

fn name_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
        .unwrap_or_default()
}
