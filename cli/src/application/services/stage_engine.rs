//! Application service: run stages over a remote session.
//!
//! Commands run strictly one after another; each waits for the previous one
//! to finish because later commands rely on what earlier ones installed.

use crate::application::ports::RemoteSession;
use crate::application::progress::ProgressReporter;
use crate::domain::stages::Probe;
use crate::domain::{CommandError, Stage, StageError};

/// What the engine did with a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The probe found the effect already present; nothing ran.
    Skipped,
    /// Every command ran.
    Completed,
}

/// Run one command to completion, logging its diagnostics.
///
/// A non-zero remote exit is only a diagnostic; the output is still returned.
///
/// # Errors
///
/// Returns [`CommandError`] if the command could not be started or completed.
pub async fn run_command(session: &impl RemoteSession, command: &str) -> Result<String, CommandError> {
    let report = session.start(command)?.wait().await;
    for line in &report.diagnostics {
        tracing::debug!(user = session.identity().user(), command, "{line}");
    }
    report.output
}

/// Execute `stage` unless its probe reports it as already done.
///
/// # Errors
///
/// Returns [`StageError`] on the first probe or command that fails to run.
pub async fn execute_stage(
    session: &impl RemoteSession,
    stage: &Stage,
) -> Result<StageOutcome, StageError> {
    let fail = |source: CommandError| StageError {
        stage: stage.name.to_string(),
        source,
    };

    if let Some(probe) = &stage.probe {
        let output = run_command(session, &probe.command).await.map_err(fail)?;
        if Probe::is_present(&output) {
            tracing::info!(stage = stage.name, "already in place, skipping");
            return Ok(StageOutcome::Skipped);
        }
    }

    for command in &stage.commands {
        tracing::debug!(stage = stage.name, command, "running");
        run_command(session, command).await.map_err(fail)?;
    }
    tracing::info!(stage = stage.name, "completed");
    Ok(StageOutcome::Completed)
}

/// Execute `stage`, then report its phase as complete.
///
/// No advance event is emitted when the stage fails.
///
/// # Errors
///
/// Returns [`StageError`] as [`execute_stage`] does.
pub async fn run_stage(
    session: &impl RemoteSession,
    stage: &Stage,
    reporter: &ProgressReporter,
) -> Result<StageOutcome, StageError> {
    let outcome = execute_stage(session, stage).await?;
    reporter.advance(stage.phase);
    Ok(outcome)
}
