//! Ordered progress events from the provisioning worker to the renderer.
//!
//! The producer never waits for the consumer. `fail` and `finish` consume
//! the reporter, so nothing can be emitted after a terminal event.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::Phase;

/// One step of the progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The phase at `stage` (its index in [`Phase::ALL`]) has completed.
    Advance { stage: usize },
    /// The run failed; terminal.
    Error { message: String },
    /// Every phase completed; terminal.
    Done { message: String },
}

impl ProgressEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Advance { .. })
    }
}

/// Producer half of the progress stream.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

/// Create a connected reporter and receiver.
#[must_use]
pub fn channel() -> (ProgressReporter, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressReporter { tx }, rx)
}

impl ProgressReporter {
    /// Mark `phase` complete.
    pub fn advance(&self, phase: Phase) {
        self.emit(ProgressEvent::Advance {
            stage: phase.index(),
        });
    }

    pub fn fail(self, message: impl Into<String>) {
        self.emit(ProgressEvent::Error {
            message: message.into(),
        });
    }

    pub fn finish(self, message: impl Into<String>) {
        self.emit(ProgressEvent::Done {
            message: message.into(),
        });
    }

    fn emit(&self, event: ProgressEvent) {
        // A vanished consumer (process exiting) is not the worker's problem.
        if self.tx.send(event).is_err() {
            tracing::debug!("progress consumer gone, dropping event");
        }
    }
}

/// Render a duration rounded to whole seconds: `45s`, `1m5s`, `2h0m3s`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut secs = elapsed.as_secs();
    if elapsed.subsec_millis() >= 500 {
        secs += 1;
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}
