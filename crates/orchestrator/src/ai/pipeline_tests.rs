use super::*;
use crate::ai::fake::FakeDriver;
use crate::domain::AssetOs;
use crate::event::Room;
use crate::hunt::{ExitOutcome, HuntModule, SeverityHint};

fn module() -> HuntModule {
    HuntModule {
        id: "linux_network".into(),
        name: "Linux network recon".into(),
        description: "net recon".into(),
        os_types: vec![AssetOs::Linux],
        tags: vec![],
        severity_hint: SeverityHint::Medium,
        steps: vec![],
    }
}

fn observation() -> Observation {
    Observation {
        hunt_id: "hunt-1".into(),
        step_id: "check_ports".into(),
        command_as_sent: "ss -tlnp".into(),
        stdout: "tcp LISTEN 0.0.0.0:4444".into(),
        stderr: String::new(),
        exit: ExitOutcome::Code { code: 0 },
        wall_ms: 4,
        stdout_truncated: false,
        stderr_truncated: false,
    }
}

#[tokio::test]
async fn clean_run_extracts_findings_and_completes() {
    let bus = EventBus::new(32);
    let sub = bus.subscribe(Room::session("session-1"));
    let store = huntd_store::AsyncStore::open_in_memory().unwrap();
    let driver = FakeDriver::new(vec!["analyzing ", "--- ", "```json```"])
        .with_finding("asset-1", "Suspicious listener on 0.0.0.0:4444");

    let outcome =
        run_pipeline(&driver, "asset-1", "session-1", "hunt-1", &module(), &[observation()], &bus, &store).await;

    assert_eq!(outcome.findings_count, 1);

    let started = sub.recv().await;
    assert!(matches!(started.kind, EventKind::AiReasoningStarted { .. }));

    let mut saw_completed = false;
    let mut saw_finding = false;
    for _ in 0..10 {
        let event = sub.recv().await;
        match event.kind {
            EventKind::AiReasoningCompleted { .. } => saw_completed = true,
            EventKind::AiFindingGenerated { .. } => saw_finding = true,
            _ => {}
        }
        if saw_completed && saw_finding {
            break;
        }
    }
    assert!(saw_completed, "expected ai.reasoning_completed");
    assert!(saw_finding, "expected ai.finding_generated");

    let findings = store.list_findings(Some("asset-1".into()), None).await.unwrap();
    assert_eq!(findings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dial_failure_before_any_chunk_emits_error_and_skips_extraction() {
    let bus = EventBus::new(32);
    let sub = bus.subscribe(Room::session("session-1"));
    let store = huntd_store::AsyncStore::open_in_memory().unwrap();
    let driver =
        FakeDriver::new(vec!["unused"]).with_finding("asset-1", "should not appear").failing_before_first_chunk();

    let outcome =
        run_pipeline(&driver, "asset-1", "session-1", "hunt-1", &module(), &[observation()], &bus, &store).await;

    assert_eq!(outcome.findings_count, 0);

    let _started = sub.recv().await;
    let mut saw_error = false;
    for _ in 0..5 {
        let event = sub.recv().await;
        if matches!(event.kind, EventKind::AiError { retryable: false, .. }) {
            saw_error = true;
            break;
        }
    }
    assert!(saw_error, "expected ai.error after exhausting retries with no chunk emitted");

    let findings = store.list_findings(Some("asset-1".into()), None).await.unwrap();
    assert!(findings.is_empty());
}
