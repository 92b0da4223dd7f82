//! Progress indicators using indicatif, and the provisioning progress view.

#![allow(clippy::expect_used)] // Templates are compile-time constants

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::application::ProgressEvent;
use crate::domain::Phase;
use crate::output::OutputContext;

/// Create a spinner for indeterminate progress.
///
/// # Panics
///
/// Panics if the spinner template string is invalid (it is a compile-time constant and will not panic).
#[must_use]
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"])
            .template("  {spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish a spinner with a checkmark on the left.
pub fn finish_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {prefix:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_prefix("✓");
    pb.finish_with_message(msg.to_string());
}

/// Finish a spinner with a cross on the left.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {prefix:.red} {msg}")
            .expect("valid template"),
    );
    pb.set_prefix("✗");
    pb.finish_with_message(msg.to_string());
}

/// How a progress stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed(String),
    Failed(String),
    /// The producer went away without a terminal event.
    Disconnected,
}

/// One line of the progress view: a spinner on a terminal, nothing otherwise.
struct PhaseLine {
    phase: Phase,
    spinner: Option<ProgressBar>,
}

impl PhaseLine {
    fn start(ctx: &OutputContext, phase: Phase) -> Self {
        let spinner = ctx
            .show_progress()
            .then(|| spinner(&format!("{}...", phase.title())));
        Self { phase, spinner }
    }

    fn complete(self, ctx: &OutputContext) {
        match self.spinner {
            Some(pb) => finish_ok(&pb, self.phase.done_message()),
            None => ctx.success(self.phase.done_message()),
        }
    }

    fn fail(self) {
        if let Some(pb) = self.spinner {
            finish_error(&pb, &format!("{} failed", self.phase));
        }
    }
}

/// Consume the progress stream, drawing one line per phase.
///
/// Returns as soon as a terminal event arrives. The caller prints the
/// terminal message; this only draws the phase lines.
pub async fn render(
    ctx: &OutputContext,
    mut events: UnboundedReceiver<ProgressEvent>,
) -> RenderOutcome {
    let mut current = Phase::from_index(0).map(|p| PhaseLine::start(ctx, p));

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::Advance { stage } => {
                let Some(done) = Phase::from_index(stage) else {
                    tracing::debug!(stage, "advance for unknown stage ignored");
                    continue;
                };
                match current.take() {
                    Some(line) if line.phase == done => line.complete(ctx),
                    other => {
                        tracing::debug!(stage, "advance out of order");
                        if let Some(line) = other {
                            line.fail();
                        }
                        ctx.success(done.done_message());
                    }
                }
                current = Phase::from_index(stage + 1).map(|p| PhaseLine::start(ctx, p));
            }
            ProgressEvent::Error { message } => {
                if let Some(line) = current.take() {
                    line.fail();
                }
                return RenderOutcome::Failed(message);
            }
            ProgressEvent::Done { message } => {
                if let Some(line) = current.take() {
                    line.complete(ctx);
                }
                return RenderOutcome::Completed(message);
            }
        }
    }

    if let Some(PhaseLine {
        spinner: Some(pb), ..
    }) = current
    {
        pb.abandon();
    }
    RenderOutcome::Disconnected
}
