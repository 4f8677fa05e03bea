use serde::{Deserialize, Serialize};

/// Severity scale shared by findings and hunt modules, ordered low → critical
/// so upserts can escalate with a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "info" => Severity::Info,
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => return None,
        })
    }
}

/// Lifecycle status of a [`Finding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl FindingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingStatus::Open => "open",
            FindingStatus::Acknowledged => "acknowledged",
            FindingStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "open" => FindingStatus::Open,
            "acknowledged" => FindingStatus::Acknowledged,
            "resolved" => FindingStatus::Resolved,
            _ => return None,
        })
    }
}

/// What produced a [`Finding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    AiReport,
    Detection,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingKind::AiReport => "ai_report",
            FindingKind::Detection => "detection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "ai_report" => FindingKind::AiReport,
            "detection" => FindingKind::Detection,
            _ => return None,
        })
    }
}

/// Three ordered remediation phases attached to a finding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Remediation {
    #[serde(default)]
    pub immediate: Vec<String>,
    #[serde(default)]
    pub short_term: Vec<String>,
    #[serde(default)]
    pub long_term: Vec<String>,
}

/// A candidate finding submitted for upsert. Carries only the fields the
/// caller controls; the store computes `fingerprint`, `sighting_count`,
/// `first_seen`/`last_seen`, and `id` on first insert.
#[derive(Debug, Clone)]
pub struct FindingDraft {
    pub asset_id: String,
    pub session_id: String,
    pub hunt_id: String,
    pub kind: FindingKind,
    pub title: String,
    pub severity: Severity,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub stix_bundle: Option<String>,
    pub remediation: Option<Remediation>,
    /// Stable subset of evidence used for fingerprinting; see
    /// `fingerprint::compute`.
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub asset_id: String,
    pub session_id: String,
    pub hunt_id: String,
    pub kind: FindingKind,
    pub title: String,
    pub severity: Severity,
    pub confidence: f64,
    pub status: FindingStatus,
    pub sighting_count: u32,
    pub first_seen: i64,
    pub last_seen: i64,
    pub fingerprint: String,
    pub tags: Vec<String>,
    pub stix_bundle: Option<String>,
    pub remediation: Option<Remediation>,
}

/// Whether an upsert created a new row or escalated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub asset_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: i64,
    pub analyst_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiReport {
    pub id: String,
    pub asset_id: String,
    pub session_id: String,
    pub hunt_id: String,
    pub report_text: String,
    pub summary: String,
    pub created_at: i64,
}

/// Audit row for a completed hunt run (`hunt_module_runs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntRunRecord {
    pub id: String,
    pub session_id: String,
    pub module_id: String,
    pub run_ai: bool,
    pub status: String,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub findings_count: u32,
}
