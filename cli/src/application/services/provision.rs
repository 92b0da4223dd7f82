//! Application service: provision a fresh VPS end to end.
//!
//! Runs the six phases in [`Phase::ALL`] order, reporting each one on the
//! progress stream. The first failure ends the run; nothing is persisted
//! unless every phase succeeded.

use std::time::Instant;

use anyhow::{Context, Result};

use crate::application::ports::{LocalToolchain, RegistryStore, RemoteSession, SessionOpener};
use crate::application::progress::{ProgressReporter, format_elapsed};
use crate::application::services::login::login;
use crate::application::services::stage_engine::{execute_stage, run_command, run_stage};
use crate::domain::host::{parse_age_keygen, platform_id_for_arch};
use crate::domain::stages::{DETECT_ARCH, DETECT_DISTRO, LOCAL_TOOLS};
use crate::domain::{Identity, Phase, ProvisionError, Registry, Server};

/// Provision `server`, record it in `registry` and save the registry.
///
/// Emits one advance event per phase followed by exactly one terminal event.
/// Returns the server as recorded, with distro, platform id and keypair filled in.
///
/// # Errors
///
/// Returns [`ProvisionError::Phase`] naming the phase that failed, or
/// [`ProvisionError::Persist`] if the registry could not be written.
pub async fn provision_server<O: SessionOpener>(
    opener: &O,
    toolchain: &impl LocalToolchain,
    store: &impl RegistryStore,
    registry: &mut Registry,
    server: Server,
    reporter: ProgressReporter,
) -> Result<Server, ProvisionError> {
    let started = Instant::now();
    let result = match provision_host(opener, toolchain, server, &reporter).await {
        Ok(server) => persist(store, registry, server),
        Err(e) => Err(e),
    };

    match &result {
        Ok(server) => {
            tracing::info!(server = %server.name, address = %server.address, "provisioned");
            reporter.finish(format!(
                "VPS setup done in {},\nYour VPS is ready! You can now deploy apps to it",
                format_elapsed(started.elapsed())
            ));
        }
        Err(e) => {
            tracing::debug!(phase = ?e.phase(), "{e}");
            reporter.fail(e.to_string());
        }
    }
    result
}

async fn provision_host<O: SessionOpener>(
    opener: &O,
    toolchain: &impl LocalToolchain,
    mut server: Server,
    reporter: &ProgressReporter,
) -> Result<Server, ProvisionError> {
    ensure_local_tools(toolchain)
        .await
        .map_err(|e| ProvisionError::in_phase(Phase::LocalPrereqs, e))?;
    reporter.advance(Phase::LocalPrereqs);

    let (session, identity) = login(opener, &server.address, &Identity::LOGIN_ORDER)
        .await
        .map_err(|e| ProvisionError::in_phase(Phase::Login, e))?;
    reporter.advance(Phase::Login);

    if identity == Identity::Privileged {
        run_phase(&session, Phase::UserBootstrap, &server.cert_email, reporter).await?;
    } else {
        tracing::info!("logged in as {}, skipping user setup", identity.user());
        reporter.advance(Phase::UserBootstrap);
    }
    // Everything from here on runs as the service user.
    drop(session);

    let session = opener
        .open(&server.address, Identity::Service)
        .await
        .with_context(|| format!("cannot log in as {}", Identity::Service.user()))
        .map_err(|e| ProvisionError::in_phase(Phase::HostSetup, e))?;
    setup_host(&session, toolchain, &mut server)
        .await
        .map_err(|e| ProvisionError::in_phase(Phase::HostSetup, e))?;
    reporter.advance(Phase::HostSetup);

    for phase in [Phase::ContainerRuntime, Phase::ReverseProxy] {
        run_phase(&session, phase, &server.cert_email, reporter).await?;
    }
    Ok(server)
}

/// Run the remote batch `phase` describes and report the phase complete.
async fn run_phase(
    session: &impl RemoteSession,
    phase: Phase,
    cert_email: &str,
    reporter: &ProgressReporter,
) -> Result<(), ProvisionError> {
    match phase.stage(cert_email) {
        Some(stage) => {
            run_stage(session, &stage, reporter)
                .await
                .map_err(|e| ProvisionError::in_phase(phase, e))?;
        }
        None => reporter.advance(phase),
    }
    Ok(())
}

/// Install every local helper tool that is not already available.
///
/// # Errors
///
/// Returns an error naming the first tool that could not be installed.
pub async fn ensure_local_tools(toolchain: &impl LocalToolchain) -> Result<()> {
    for &tool in LOCAL_TOOLS {
        if toolchain.is_installed(tool).await {
            tracing::debug!(tool, "already installed");
            continue;
        }
        tracing::info!(tool, "installing");
        toolchain
            .install(tool)
            .await
            .with_context(|| format!("failed to install {tool}"))?;
    }
    Ok(())
}

async fn setup_host(
    session: &impl RemoteSession,
    toolchain: &impl LocalToolchain,
    server: &mut Server,
) -> Result<()> {
    server.distro = run_command(session, DETECT_DISTRO)
        .await
        .context("detecting distribution")?;

    let arch = run_command(session, DETECT_ARCH)
        .await
        .context("detecting architecture")?;
    match platform_id_for_arch(&arch) {
        Some(id) => server.platform_id = id.to_string(),
        None => tracing::info!(arch = %arch, "unrecognised architecture, platform id left unchanged"),
    }

    if let Some(stage) = Phase::HostSetup.stage(&server.cert_email) {
        execute_stage(session, &stage).await?;
    }
    ensure_keypair(toolchain, server).await
}

/// Give `server` an age keypair unless it already has one.
///
/// # Errors
///
/// Returns an error if key generation fails or its output cannot be parsed.
pub async fn ensure_keypair(toolchain: &impl LocalToolchain, server: &mut Server) -> Result<()> {
    if server.has_keypair() {
        tracing::debug!(server = %server.name, "keeping existing keypair");
        return Ok(());
    }
    let output = toolchain
        .generate_keypair()
        .await
        .context("generating age keypair")?;
    let keypair = parse_age_keygen(&output)?;
    server.public_key = keypair.public_key;
    server.secret_key = keypair.secret_key;
    Ok(())
}

fn persist(
    store: &impl RegistryStore,
    registry: &mut Registry,
    server: Server,
) -> Result<Server, ProvisionError> {
    registry.register_provisioned(server.clone());
    store.save(registry).map_err(|e| ProvisionError::Persist {
        cause: format!("{e:#}"),
    })?;
    Ok(server)
}
