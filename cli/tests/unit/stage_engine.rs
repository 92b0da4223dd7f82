//! Stage engine: probes, ordering and failure handling.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use berth_cli::application::ports::SessionOpener;
use berth_cli::application::progress::{self, ProgressEvent};
use berth_cli::application::services::stage_engine::{
    StageOutcome, execute_stage, run_command, run_stage,
};
use berth_cli::domain::stages::{container_runtime_stage, host_setup_stage, reverse_proxy_stage};
use berth_cli::domain::{CommandError, Identity, Phase};

use crate::mocks::{FakeHost, FakeOpener};

async fn service_session(host: &std::sync::Arc<FakeHost>) -> crate::mocks::FakeSession {
    FakeOpener::new(host)
        .open("203.0.113.5", Identity::Service)
        .await
        .expect("open")
}

#[tokio::test]
async fn test_execute_stage_runs_probe_then_commands_in_order() {
    let host = FakeHost::fresh();
    let session = service_session(&host).await;
    let stage = container_runtime_stage();

    let outcome = execute_stage(&session, &stage).await.expect("stage");

    assert_eq!(outcome, StageOutcome::Completed);
    let mut expected = vec![stage.probe.clone().unwrap().command];
    expected.extend(stage.commands.clone());
    assert_eq!(host.commands(), expected);
}

#[tokio::test]
async fn test_execute_stage_skips_when_probe_reports_present() {
    let host = FakeHost::fresh();
    host.reply("docker compose version", "1");
    let session = service_session(&host).await;

    let outcome = execute_stage(&session, &container_runtime_stage())
        .await
        .expect("stage");

    assert_eq!(outcome, StageOutcome::Skipped);
    assert_eq!(host.commands().len(), 1, "only the probe runs");
}

#[tokio::test]
async fn test_probe_ignores_stderr_and_uses_stdout_only() {
    let host = FakeHost::fresh();
    host.reply_with_stderr("[ -d \"traefik\" ]", "0", &["`probe` exited with exit status: 1"]);
    let session = service_session(&host).await;

    let outcome = execute_stage(&session, &reverse_proxy_stage("a@b.com"))
        .await
        .expect("stage");
    assert_eq!(outcome, StageOutcome::Completed);
}

#[tokio::test]
async fn test_second_run_of_probed_stage_runs_no_commands() {
    let host = FakeHost::fresh();
    let session = service_session(&host).await;
    let stage = reverse_proxy_stage("a@b.com");

    execute_stage(&session, &stage).await.expect("first run");
    // The proxy directory now exists.
    host.reply("[ -d \"traefik\" ]", "1");
    let before = host.commands().len();
    let outcome = execute_stage(&session, &stage).await.expect("second run");

    assert_eq!(outcome, StageOutcome::Skipped);
    assert_eq!(host.commands().len(), before + 1);
}

#[tokio::test]
async fn test_execute_stage_stops_at_first_failed_command() {
    let host = FakeHost::fresh();
    host.fail(
        "apt-get upgrade",
        CommandError::SessionLost {
            command: "apt-get upgrade".to_string(),
        },
    );
    let session = service_session(&host).await;
    let stage = host_setup_stage();

    let err = execute_stage(&session, &stage).await.expect_err("should fail");

    assert_eq!(err.stage, "host-setup");
    assert!(matches!(err.source, CommandError::SessionLost { .. }));
    assert_eq!(host.commands().len(), 2, "commands after the failure never start");
}

#[tokio::test]
async fn test_non_zero_exit_is_not_a_failure() {
    let host = FakeHost::fresh();
    host.reply_with_stderr("ufw --force enable", "", &["`sudo ufw --force enable` exited with exit status: 1"]);
    let session = service_session(&host).await;

    let outcome = execute_stage(&session, &host_setup_stage()).await.expect("stage");
    assert_eq!(outcome, StageOutcome::Completed);
}

#[tokio::test]
async fn test_run_command_returns_trimmed_output() {
    let host = FakeHost::fresh();
    let session = service_session(&host).await;
    assert_eq!(run_command(&session, "uname -m").await.unwrap(), "x86_64");
}

#[tokio::test]
async fn test_run_stage_advances_only_on_success() {
    let host = FakeHost::fresh();
    let session = service_session(&host).await;
    let (reporter, mut events) = progress::channel();

    run_stage(&session, &container_runtime_stage(), &reporter)
        .await
        .expect("stage");
    host.fail(
        "traefik",
        CommandError::Spawn {
            command: "probe".to_string(),
            reason: "broken pipe".to_string(),
        },
    );
    run_stage(&session, &reverse_proxy_stage("a@b.com"), &reporter)
        .await
        .expect_err("probe fails");
    drop(reporter);

    assert_eq!(
        events.recv().await,
        Some(ProgressEvent::Advance {
            stage: Phase::ContainerRuntime.index()
        })
    );
    assert_eq!(events.recv().await, None);
}
