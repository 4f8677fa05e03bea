use super::*;
use crate::fingerprint;
use crate::records::{FindingKind, FindingStatus, Severity};

fn sample_draft() -> FindingDraft {
    FindingDraft {
        asset_id: "asset-1".into(),
        session_id: "session-1".into(),
        hunt_id: "hunt-1".into(),
        kind: FindingKind::Detection,
        title: "open telnet port".into(),
        severity: Severity::Medium,
        confidence: 0.6,
        tags: vec!["network".into()],
        stix_bundle: None,
        remediation: None,
        evidence: fingerprint::detection_evidence("check_listening_ports", "ss -tlnpu"),
    }
}

#[test]
fn upsert_creates_then_escalates() {
    let db = Database::open_in_memory().unwrap();
    let mut seq = 0u32;
    let mut next_id = || {
        seq += 1;
        format!("finding-{seq}")
    };

    let (first, outcome) = db.upsert_finding(&sample_draft(), 1_000, &mut next_id).unwrap();
    assert_eq!(outcome, UpsertOutcome::Created);
    assert_eq!(first.sighting_count, 1);

    let mut escalated = sample_draft();
    escalated.severity = Severity::High;
    escalated.tags = vec!["lateral-movement".into()];

    let (second, outcome) = db.upsert_finding(&escalated, 2_000, &mut next_id).unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);
    assert_eq!(second.id, first.id);
    assert_eq!(second.sighting_count, 2);
    assert_eq!(second.severity, Severity::High);
    assert_eq!(second.last_seen, 2_000);
    assert!(second.tags.contains(&"network".to_string()));
    assert!(second.tags.contains(&"lateral-movement".to_string()));
}

#[test]
fn upsert_idempotent_under_repeat_n_times() {
    let db = Database::open_in_memory().unwrap();
    let mut seq = 0u32;
    let mut next_id = || {
        seq += 1;
        format!("finding-{seq}")
    };

    let mut last_id = String::new();
    for i in 0..5 {
        let (finding, _) = db.upsert_finding(&sample_draft(), 1_000 + i, &mut next_id).unwrap();
        last_id = finding.id;
    }

    let stored = db.get_finding(&last_id).unwrap().unwrap();
    assert_eq!(stored.sighting_count, 5);
}

#[test]
fn list_findings_filters_by_asset_and_session() {
    let db = Database::open_in_memory().unwrap();
    let mut seq = 0u32;
    let mut next_id = || {
        seq += 1;
        format!("finding-{seq}")
    };

    db.upsert_finding(&sample_draft(), 1_000, &mut next_id).unwrap();

    let mut other = sample_draft();
    other.asset_id = "asset-2".into();
    other.title = "different finding".into();
    other.evidence = fingerprint::detection_evidence("other_step", "whoami");
    db.upsert_finding(&other, 1_000, &mut next_id).unwrap();

    assert_eq!(db.list_findings(Some("asset-1"), None).unwrap().len(), 1);
    assert_eq!(db.list_findings(None, None).unwrap().len(), 2);
}

#[test]
fn update_status_and_delete() {
    let db = Database::open_in_memory().unwrap();
    let mut seq = 0u32;
    let mut next_id = || {
        seq += 1;
        format!("finding-{seq}")
    };
    let (finding, _) = db.upsert_finding(&sample_draft(), 1_000, &mut next_id).unwrap();

    db.update_status(&finding.id, FindingStatus::Acknowledged).unwrap();
    assert_eq!(db.get_finding(&finding.id).unwrap().unwrap().status, FindingStatus::Acknowledged);

    db.delete_finding(&finding.id).unwrap();
    assert!(db.get_finding(&finding.id).unwrap().is_none());
}

#[test]
fn timeline_append_get_clear() {
    let db = Database::open_in_memory().unwrap();
    db.append_timeline(&TimelineEvent {
        id: "evt-1".into(),
        asset_id: "asset-1".into(),
        event_type: "ai.finding_generated".into(),
        payload: serde_json::json!({"finding_id": "finding-1"}),
        occurred_at: 1_000,
        analyst_id: Some("analyst-1".into()),
    })
    .unwrap();

    let events = db.get_timeline("asset-1", 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "ai.finding_generated");

    db.clear_timeline("asset-1").unwrap();
    assert!(db.get_timeline("asset-1", 10).unwrap().is_empty());
}

#[test]
fn ai_reports_save_and_list() {
    let db = Database::open_in_memory().unwrap();
    db.save_ai_report(&AiReport {
        id: "report-1".into(),
        asset_id: "asset-1".into(),
        session_id: "session-1".into(),
        hunt_id: "hunt-1".into(),
        report_text: "full report".into(),
        summary: "summary".into(),
        created_at: 1_000,
    })
    .unwrap();

    let reports = db.list_ai_reports("asset-1").unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].report_text, "full report");
}
