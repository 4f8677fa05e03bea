use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::warn;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::records::{
    AiReport, Finding, FindingDraft, FindingStatus, HuntRunRecord, TimelineEvent, UpsertOutcome,
};

/// Async-friendly facade over [`Database`]. Every operation hands the
/// blocking sqlite connection to `spawn_blocking` so the orchestrator's
/// session owner tasks never stall waiting on disk I/O — the store
/// mediates its own concurrency.
#[derive(Clone)]
pub struct AsyncStore {
    inner: Arc<Mutex<Database>>,
}

impl AsyncStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self { inner: Arc::new(Mutex::new(Database::open(path)?)) })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { inner: Arc::new(Mutex::new(Database::open_in_memory()?)) })
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let db = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&db)
        })
        .await
        .map_err(|e| Error::TaskFailed(e.to_string()))?
    }

    pub async fn upsert_finding(&self, draft: FindingDraft, now: i64) -> Result<(Finding, UpsertOutcome)> {
        self.with_db(move |db| db.upsert_finding(&draft, now, || Uuid::new_v4().to_string())).await
    }

    pub async fn get_finding(&self, id: String) -> Result<Option<Finding>> {
        self.with_db(move |db| db.get_finding(&id)).await
    }

    pub async fn list_findings(
        &self,
        asset_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Vec<Finding>> {
        self.with_db(move |db| db.list_findings(asset_id.as_deref(), session_id.as_deref())).await
    }

    pub async fn update_status(&self, id: String, status: FindingStatus) -> Result<()> {
        self.with_db(move |db| db.update_status(&id, status)).await
    }

    pub async fn delete_finding(&self, id: String) -> Result<()> {
        self.with_db(move |db| db.delete_finding(&id)).await
    }

    pub async fn append_timeline(&self, event: TimelineEvent) -> Result<()> {
        self.with_db(move |db| db.append_timeline(&event)).await
    }

    pub async fn get_timeline(&self, asset_id: String, limit: usize) -> Result<Vec<TimelineEvent>> {
        self.with_db(move |db| db.get_timeline(&asset_id, limit)).await
    }

    pub async fn clear_timeline(&self, asset_id: String) -> Result<()> {
        self.with_db(move |db| db.clear_timeline(&asset_id)).await
    }

    pub async fn save_ai_report(&self, report: AiReport) -> Result<()> {
        self.with_db(move |db| db.save_ai_report(&report)).await
    }

    pub async fn list_ai_reports(&self, asset_id: String) -> Result<Vec<AiReport>> {
        self.with_db(move |db| db.list_ai_reports(&asset_id)).await
    }

    pub async fn delete_ai_report(&self, id: String) -> Result<()> {
        self.with_db(move |db| db.delete_ai_report(&id)).await
    }

    pub async fn record_hunt_run(&self, run: HuntRunRecord) -> Result<()> {
        self.with_db(move |db| db.record_hunt_run(&run)).await
    }

    /// Upsert a finding and append its `ai.finding_generated` timeline
    /// event in one call, matching the "every upsert also appends a
    /// timeline event" rule. Timeline-append failure is logged,
    /// not propagated — the finding write already succeeded and losing the
    /// audit trail entry is not reason to fail the caller's hunt.
    pub async fn upsert_finding_with_timeline(
        &self,
        draft: FindingDraft,
        now: i64,
        analyst_id: Option<String>,
    ) -> Result<(Finding, UpsertOutcome)> {
        let asset_id = draft.asset_id.clone();
        let (finding, outcome) = self.upsert_finding(draft, now).await?;

        let event = TimelineEvent {
            id: Uuid::new_v4().to_string(),
            asset_id,
            event_type: "ai.finding_generated".into(),
            payload: serde_json::json!({
                "finding_id": finding.id,
                "outcome": match outcome {
                    UpsertOutcome::Created => "created",
                    UpsertOutcome::Updated => "updated",
                },
            }),
            occurred_at: now,
            analyst_id,
        };
        if let Err(err) = self.append_timeline(event).await {
            warn!(finding_id = finding.id.as_str(), "failed to record timeline event: {err}");
        }

        Ok((finding, outcome))
    }
}
