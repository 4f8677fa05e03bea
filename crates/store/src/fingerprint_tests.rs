use super::*;
use crate::records::{FindingDraft, FindingKind, Severity};

fn draft(evidence: Vec<String>) -> FindingDraft {
    FindingDraft {
        asset_id: "asset-1".into(),
        session_id: "session-1".into(),
        hunt_id: "hunt-1".into(),
        kind: FindingKind::Detection,
        title: "open port 23 (telnet)".into(),
        severity: Severity::High,
        confidence: 0.8,
        tags: vec![],
        stix_bundle: None,
        remediation: None,
        evidence,
    }
}

#[test]
fn stable_across_evidence_order() {
    let a = draft(vec!["step:s1".into(), "cmd:nc -l 23".into()]);
    let b = draft(vec!["cmd:nc -l 23".into(), "step:s1".into()]);
    assert_eq!(compute(&a), compute(&b));
}

#[test]
fn differs_on_title() {
    let mut a = draft(detection_evidence("s1", "ss -tlnp"));
    let b_evidence = a.evidence.clone();
    a.title = "finding a".into();
    let mut b = draft(b_evidence);
    b.title = "finding b".into();
    assert_ne!(compute(&a), compute(&b));
}

#[test]
fn ai_report_evidence_keys_on_module_only() {
    let e1 = ai_report_evidence("linux_network");
    let e2 = ai_report_evidence("linux_network");
    assert_eq!(e1, e2);
}
