use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::fingerprint;
use crate::records::{
    AiReport, Finding, FindingDraft, FindingStatus, HuntRunRecord, Remediation, Severity,
    TimelineEvent, UpsertOutcome,
};
use crate::schema;

/// Synchronous sqlite-backed implementation of the Intelligence Store
/// operations. Wrapped by [`crate::AsyncStore`] for
/// callers that must not block their executor thread.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        schema::init_schema(&db.conn)?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        schema::init_schema(&db.conn)?;
        Ok(db)
    }

    /// Upsert rule: find existing by `(asset_id, fingerprint)`; on
    /// a hit, increment `sighting_count`, advance `last_seen`, escalate
    /// `severity` to the max, union `tags`, and overwrite `remediation`
    /// with the latest value. On a miss, insert with `sighting_count = 1`.
    pub fn upsert_finding(
        &self,
        draft: &FindingDraft,
        now: i64,
        id_factory: impl FnOnce() -> String,
    ) -> Result<(Finding, UpsertOutcome)> {
        let fp = fingerprint::compute(draft);

        let existing = self.find_finding_row(&draft.asset_id, &fp)?;

        let (finding, outcome) = match existing {
            Some(mut current) => {
                current.sighting_count += 1;
                current.last_seen = now;
                current.severity = current.severity.max(draft.severity);
                for tag in &draft.tags {
                    if !current.tags.contains(tag) {
                        current.tags.push(tag.clone());
                    }
                }
                current.confidence = draft.confidence.max(current.confidence);
                current.remediation = draft.remediation.clone();
                current.stix_bundle = draft.stix_bundle.clone().or(current.stix_bundle);
                self.write_finding(&current)?;
                (current, UpsertOutcome::Updated)
            }
            None => {
                let finding = Finding {
                    id: id_factory(),
                    asset_id: draft.asset_id.clone(),
                    session_id: draft.session_id.clone(),
                    hunt_id: draft.hunt_id.clone(),
                    kind: draft.kind,
                    title: draft.title.clone(),
                    severity: draft.severity,
                    confidence: draft.confidence,
                    status: FindingStatus::Open,
                    sighting_count: 1,
                    first_seen: now,
                    last_seen: now,
                    fingerprint: fp,
                    tags: draft.tags.clone(),
                    stix_bundle: draft.stix_bundle.clone(),
                    remediation: draft.remediation.clone(),
                };
                self.write_finding(&finding)?;
                (finding, UpsertOutcome::Created)
            }
        };

        Ok((finding, outcome))
    }

    fn find_finding_row(&self, asset_id: &str, fingerprint: &str) -> Result<Option<Finding>> {
        self.conn
            .query_row(
                "SELECT id, asset_id, session_id, hunt_id, kind, title, severity, confidence, \
                 status, sighting_count, first_seen, last_seen, fingerprint, tags, stix_bundle, \
                 remediation FROM findings WHERE asset_id = ?1 AND fingerprint = ?2",
                params![asset_id, fingerprint],
                row_to_finding,
            )
            .optional()
            .map_err(Error::from)
    }

    fn write_finding(&self, finding: &Finding) -> Result<()> {
        let tags_json = serde_json::to_string(&finding.tags).unwrap_or_default();
        let remediation_json =
            finding.remediation.as_ref().map(|r| serde_json::to_string(r).unwrap_or_default());

        self.conn.execute(
            "INSERT INTO findings (id, asset_id, session_id, hunt_id, kind, title, severity, \
             confidence, status, sighting_count, first_seen, last_seen, fingerprint, tags, \
             stix_bundle, remediation) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16) \
             ON CONFLICT(asset_id, fingerprint) DO UPDATE SET \
             session_id=?3, hunt_id=?4, title=?6, severity=?7, confidence=?8, status=?9, \
             sighting_count=?10, last_seen=?12, tags=?14, stix_bundle=?15, remediation=?16",
            params![
                finding.id,
                finding.asset_id,
                finding.session_id,
                finding.hunt_id,
                finding.kind.as_str(),
                finding.title,
                finding.severity.as_str(),
                finding.confidence,
                finding.status.as_str(),
                finding.sighting_count,
                finding.first_seen,
                finding.last_seen,
                finding.fingerprint,
                tags_json,
                finding.stix_bundle,
                remediation_json,
            ],
        )?;
        Ok(())
    }

    pub fn get_finding(&self, id: &str) -> Result<Option<Finding>> {
        self.conn
            .query_row(
                "SELECT id, asset_id, session_id, hunt_id, kind, title, severity, confidence, \
                 status, sighting_count, first_seen, last_seen, fingerprint, tags, stix_bundle, \
                 remediation FROM findings WHERE id = ?1",
                [id],
                row_to_finding,
            )
            .optional()
            .map_err(Error::from)
    }

    pub fn list_findings(
        &self,
        asset_id: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Vec<Finding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, asset_id, session_id, hunt_id, kind, title, severity, confidence, \
             status, sighting_count, first_seen, last_seen, fingerprint, tags, stix_bundle, \
             remediation FROM findings \
             WHERE (?1 IS NULL OR asset_id = ?1) AND (?2 IS NULL OR session_id = ?2) \
             ORDER BY last_seen DESC",
        )?;
        let rows = stmt
            .query_map(params![asset_id, session_id], row_to_finding)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_status(&self, id: &str, status: FindingStatus) -> Result<()> {
        let changed =
            self.conn.execute("UPDATE findings SET status = ?1 WHERE id = ?2", params![
                status.as_str(),
                id
            ])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("finding {id}")));
        }
        Ok(())
    }

    pub fn delete_finding(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM findings WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("finding {id}")));
        }
        Ok(())
    }

    pub fn append_timeline(&self, event: &TimelineEvent) -> Result<()> {
        let payload_json = serde_json::to_string(&event.payload).unwrap_or_default();
        self.conn.execute(
            "INSERT INTO timeline_events (id, asset_id, event_type, payload, occurred_at, \
             analyst_id) VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                event.id,
                event.asset_id,
                event.event_type,
                payload_json,
                event.occurred_at,
                event.analyst_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_timeline(&self, asset_id: &str, limit: usize) -> Result<Vec<TimelineEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, asset_id, event_type, payload, occurred_at, analyst_id \
             FROM timeline_events WHERE asset_id = ?1 ORDER BY occurred_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![asset_id, limit as i64], row_to_timeline_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn clear_timeline(&self, asset_id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM timeline_events WHERE asset_id = ?1", [asset_id])?;
        Ok(())
    }

    pub fn save_ai_report(&self, report: &AiReport) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ai_reports (id, asset_id, session_id, hunt_id, report_text, summary, \
             created_at) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                report.id,
                report.asset_id,
                report.session_id,
                report.hunt_id,
                report.report_text,
                report.summary,
                report.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn list_ai_reports(&self, asset_id: &str) -> Result<Vec<AiReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, asset_id, session_id, hunt_id, report_text, summary, created_at \
             FROM ai_reports WHERE asset_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([asset_id], |row| {
                Ok(AiReport {
                    id: row.get(0)?,
                    asset_id: row.get(1)?,
                    session_id: row.get(2)?,
                    hunt_id: row.get(3)?,
                    report_text: row.get(4)?,
                    summary: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_ai_report(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM ai_reports WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("ai report {id}")));
        }
        Ok(())
    }

    /// Audit row for a hunt run (`hunt_module_runs`); not part of the core
    /// finding/timeline operation list but part of the persisted schema.
    pub fn record_hunt_run(&self, run: &HuntRunRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO hunt_module_runs (id, session_id, module_id, run_ai, status, \
             started_at, ended_at, findings_count) VALUES (?1,?2,?3,?4,?5,?6,?7,?8) \
             ON CONFLICT(id) DO UPDATE SET status=?5, ended_at=?7, findings_count=?8",
            params![
                run.id,
                run.session_id,
                run.module_id,
                run.run_ai,
                run.status,
                run.started_at,
                run.ended_at,
                run.findings_count,
            ],
        )?;
        Ok(())
    }
}

fn row_to_finding(row: &rusqlite::Row<'_>) -> rusqlite::Result<Finding> {
    let severity_str: String = row.get(6)?;
    let status_str: String = row.get(8)?;
    let kind_str: String = row.get(4)?;
    let tags_json: String = row.get(13)?;
    let remediation_json: Option<String> = row.get(15)?;

    Ok(Finding {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        session_id: row.get(2)?,
        hunt_id: row.get(3)?,
        kind: crate::records::FindingKind::parse(&kind_str).unwrap_or(crate::records::FindingKind::Detection),
        title: row.get(5)?,
        severity: Severity::parse(&severity_str).unwrap_or(Severity::Info),
        confidence: row.get(7)?,
        status: FindingStatus::parse(&status_str).unwrap_or(FindingStatus::Open),
        sighting_count: row.get(9)?,
        first_seen: row.get(10)?,
        last_seen: row.get(11)?,
        fingerprint: row.get(12)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        stix_bundle: row.get(14)?,
        remediation: remediation_json.and_then(|j| serde_json::from_str::<Remediation>(&j).ok()),
    })
}

fn row_to_timeline_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimelineEvent> {
    let payload_json: String = row.get(3)?;
    Ok(TimelineEvent {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        event_type: row.get(2)?,
        payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null),
        occurred_at: row.get(4)?,
        analyst_id: row.get(5)?,
    })
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
