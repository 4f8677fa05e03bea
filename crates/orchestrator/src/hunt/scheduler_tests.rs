use super::*;
use crate::event::EventBus;
use crate::hunt::{SeverityHint, Step};
use crate::ssh::fake::{FakeBackend, FakeResponse};

fn two_step_module() -> HuntModule {
    HuntModule {
        id: "linux_network".into(),
        name: "Linux network recon".into(),
        description: "d".into(),
        os_types: vec![crate::domain::AssetOs::Linux],
        tags: vec![],
        severity_hint: SeverityHint::Medium,
        steps: vec![
            Step {
                id: "check_listening_ports".into(),
                description: "d".into(),
                command: "ss -tlnpu".into(),
                timeout_secs: 10,
                requires_sudo: false,
            },
            Step {
                id: "check_hosts_file".into(),
                description: "d".into(),
                command: "cat /etc/hosts".into(),
                timeout_secs: 5,
                requires_sudo: false,
            },
        ],
    }
}

#[tokio::test]
async fn happy_path_runs_all_steps_in_order_and_completes() {
    let backend = FakeBackend::new()
        .with_response("echo __huntd_pid__:$$; ss -tlnpu", FakeResponse::ok("__huntd_pid__:123\ntcp LISTEN\n"))
        .with_response("echo __huntd_pid__:$$; cat /etc/hosts", FakeResponse::ok("__huntd_pid__:124\n127.0.0.1 localhost\n"));
    let bus = EventBus::new(64);
    let sub = bus.subscribe(crate::event::Room::session("s1"));
    let module = two_step_module();

    let outcome = run_hunt(
        "h1",
        "s1",
        &backend,
        &module,
        None,
        &bus,
        tokio_util::sync::CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.observations.len(), 2);
    assert!(matches!(outcome.status, HuntStatus::Completed));
    assert_eq!(outcome.observations[0].stdout.trim(), "tcp LISTEN");

    let started = sub.recv().await;
    assert!(matches!(started.kind, EventKind::HuntStarted { .. }));
}

#[tokio::test]
async fn sudo_required_without_policy_is_skipped_not_fatal() {
    let backend = FakeBackend::new();
    let bus = EventBus::new(64);
    let mut module = two_step_module();
    module.steps[0].requires_sudo = true;

    let outcome =
        run_hunt("h1", "s1", &backend, &module, None, &bus, tokio_util::sync::CancellationToken::new()).await;

    assert!(matches!(outcome.observations[0].exit, ExitOutcome::SkippedNoSudo));
    assert!(matches!(outcome.status, HuntStatus::Completed));
}

#[tokio::test]
async fn cancellation_before_a_step_stops_the_hunt() {
    let backend = FakeBackend::new();
    let bus = EventBus::new(64);
    let module = two_step_module();
    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();

    let outcome = run_hunt("h1", "s1", &backend, &module, None, &bus, cancel).await;
    assert!(matches!(outcome.status, HuntStatus::Cancelled));
    assert!(outcome.observations.is_empty());
}
