use super::*;
use crate::domain::AssetOs;
use crate::hunt::{ExitOutcome, SeverityHint, Step};

fn module(steps: Vec<Step>) -> HuntModule {
    HuntModule {
        id: "linux_network".into(),
        name: "Linux network recon".into(),
        description: "Enumerate listening sockets and peers".into(),
        os_types: vec![AssetOs::Linux],
        tags: vec![],
        severity_hint: SeverityHint::Medium,
        steps,
    }
}

fn observation(step_id: &str, stdout: String) -> Observation {
    Observation {
        hunt_id: "hunt-1".into(),
        step_id: step_id.into(),
        command_as_sent: "ss -tlnp".into(),
        stdout,
        stderr: String::new(),
        exit: ExitOutcome::Code { code: 0 },
        wall_ms: 5,
        stdout_truncated: false,
        stderr_truncated: false,
    }
}

#[test]
fn small_observations_are_not_trimmed() {
    let m = module(vec![]);
    let obs = vec![observation("check_ports", "tcp LISTEN 0.0.0.0:22".into())];
    let ctx = build_context(&m, &obs);
    assert!(ctx.contains("tcp LISTEN 0.0.0.0:22"));
    assert!(ctx.contains("module: linux_network"));
}

#[test]
fn per_step_output_is_clipped_to_budget() {
    let m = module(vec![]);
    let huge = "x".repeat(PER_STEP_BUDGET_BYTES * 2);
    let obs = vec![observation("check_ports", huge)];
    let ctx = build_context(&m, &obs);
    assert!(ctx.contains("...[truncated]"));
    assert!(ctx.len() < PER_STEP_BUDGET_BYTES * 2);
}

#[test]
fn total_context_never_exceeds_global_budget_plus_header() {
    let m = module(vec![]);
    let obs: Vec<Observation> =
        (0..20).map(|i| observation(&format!("step_{i}"), "y".repeat(PER_STEP_BUDGET_BYTES))).collect();
    let ctx = build_context(&m, &obs);
    assert!(ctx.len() <= GLOBAL_BUDGET_BYTES + 4096, "context grew to {} bytes", ctx.len());
}
