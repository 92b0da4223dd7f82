//! Progress view: how the render loop ends for each kind of stream.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use berth_cli::application::progress;
use berth_cli::domain::Phase;
use berth_cli::output::OutputContext;
use berth_cli::output::progress::{RenderOutcome, render};

fn quiet_ctx() -> OutputContext {
    OutputContext::new(true, true)
}

#[tokio::test]
async fn test_render_returns_done_message() {
    let (reporter, events) = progress::channel();
    for phase in Phase::ALL {
        reporter.advance(phase);
    }
    reporter.finish("VPS setup done in 3s");

    assert_eq!(
        render(&quiet_ctx(), events).await,
        RenderOutcome::Completed("VPS setup done in 3s".to_string())
    );
}

#[tokio::test]
async fn test_render_stops_at_error() {
    let (reporter, events) = progress::channel();
    reporter.advance(Phase::LocalPrereqs);
    reporter.fail("Login failed: unable to establish SSH connection");

    assert_eq!(
        render(&quiet_ctx(), events).await,
        RenderOutcome::Failed("Login failed: unable to establish SSH connection".to_string())
    );
}

#[tokio::test]
async fn test_render_reports_disconnect_without_terminal_event() {
    let (reporter, events) = progress::channel();
    reporter.advance(Phase::LocalPrereqs);
    drop(reporter);

    assert_eq!(render(&quiet_ctx(), events).await, RenderOutcome::Disconnected);
}

#[tokio::test]
async fn test_render_consumes_events_from_worker_task() {
    let (reporter, events) = progress::channel();
    let worker = tokio::spawn(async move {
        for phase in Phase::ALL {
            tokio::task::yield_now().await;
            reporter.advance(phase);
        }
        reporter.finish("done");
    });

    let outcome = render(&quiet_ctx(), events).await;
    worker.await.unwrap();
    assert_eq!(outcome, RenderOutcome::Completed("done".to_string()));
}
