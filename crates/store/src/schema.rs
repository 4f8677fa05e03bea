use rusqlite::Connection;

use crate::error::Result;

/// Bump when changing table definitions; existing on-disk databases below
/// this version are rebuilt from scratch, matching this crate's audit-only
/// persistence contract (no recovery of live state).
pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current_version != 0 && current_version != SCHEMA_VERSION {
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS findings (
            id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            hunt_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            severity TEXT NOT NULL,
            confidence REAL NOT NULL,
            status TEXT NOT NULL,
            sighting_count INTEGER NOT NULL,
            first_seen INTEGER NOT NULL,
            last_seen INTEGER NOT NULL,
            fingerprint TEXT NOT NULL,
            tags TEXT NOT NULL,
            stix_bundle TEXT,
            remediation TEXT,
            UNIQUE(asset_id, fingerprint)
        );

        CREATE INDEX IF NOT EXISTS idx_findings_asset ON findings(asset_id);
        CREATE INDEX IF NOT EXISTS idx_findings_session ON findings(session_id);

        CREATE TABLE IF NOT EXISTS timeline_events (
            id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            occurred_at INTEGER NOT NULL,
            analyst_id TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_timeline_asset ON timeline_events(asset_id, occurred_at DESC);

        CREATE TABLE IF NOT EXISTS ai_reports (
            id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            hunt_id TEXT NOT NULL,
            report_text TEXT NOT NULL,
            summary TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_asset ON ai_reports(asset_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS hunt_module_runs (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            module_id TEXT NOT NULL,
            run_ai INTEGER NOT NULL,
            status TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            findings_count INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"), [])?;
    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS hunt_module_runs;
        DROP TABLE IF EXISTS ai_reports;
        DROP TABLE IF EXISTS timeline_events;
        DROP TABLE IF EXISTS findings;
        "#,
    )?;
    Ok(())
}
