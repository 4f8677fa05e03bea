// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs the AI Pipeline over a completed hunt's observations (retry/
//! 2-5), driven from the session owner after `run_hunt` returns.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use super::{context::build_context, Driver, DriverError};
use crate::domain::ReasoningState;
use crate::event::{EventBus, EventKind, Room};
use crate::hunt::{HuntModule, Observation};
use huntd_store::{AsyncStore, FindingDraft, FindingKind};

const MAX_STREAM_RETRIES: u32 = 2;
const RETRY_BACKOFFS_MS: [u64; 2] = [500, 2000];

/// Stream a report once, draining chunks into `report_text` and publishing
/// `ai.reasoning_chunk` for each. Returns `Ok(())` once the stream ends
/// cleanly, or the error that ended it (either the initial dial or a chunk
/// mid-stream).
async fn stream_once(
    driver: &dyn Driver,
    context: String,
    bus: &EventBus,
    room: &Room,
    session_id: &str,
    turn_id: &str,
    report_text: &mut String,
    any_chunk_emitted: &mut bool,
    state: &mut ReasoningState,
) -> Result<(), DriverError> {
    let mut rx = driver.stream_report(context).await?;
    while let Some(chunk_result) = rx.recv().await {
        let chunk = chunk_result?;
        *any_chunk_emitted = true;
        *state = resolve_state(chunk.state, *state, &chunk.text, report_text);
        report_text.push_str(&chunk.text);
        bus.publish(
            room.clone(),
            Some(session_id.to_string()),
            EventKind::AiReasoningChunk { turn_id: turn_id.to_string(), state: *state, text: chunk.text },
        );
    }
    Ok(())
}

fn resolve_state(driver_state: Option<ReasoningState>, current: ReasoningState, chunk: &str, so_far: &str) -> ReasoningState {
    if let Some(s) = driver_state {
        return s;
    }
    if current == ReasoningState::Generating {
        return current;
    }
    if so_far.contains("```") || chunk.contains("```") {
        return ReasoningState::Generating;
    }
    if current == ReasoningState::Concluding {
        return current;
    }
    if so_far.contains("---") || chunk.contains("---") {
        return ReasoningState::Concluding;
    }
    current
}

/// Outcome of running the AI Pipeline over one hunt.
pub struct PipelineOutcome {
    pub findings_count: u32,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_pipeline(
    driver: &dyn Driver,
    asset_id: &str,
    session_id: &str,
    hunt_id: &str,
    module: &HuntModule,
    observations: &[Observation],
    bus: &EventBus,
    store: &AsyncStore,
) -> PipelineOutcome {
    let room = Room::session(session_id);
    let context = build_context(module, observations);
    let turn_id = Uuid::new_v4().to_string();

    bus.publish(room.clone(), Some(session_id.to_string()), EventKind::AiReasoningStarted { turn_id: turn_id.clone() });

    let mut report_text = String::new();
    let mut any_chunk_emitted = false;
    let mut state = ReasoningState::Analyzing;
    let mut last_error: Option<DriverError> = None;

    for attempt in 0..=MAX_STREAM_RETRIES {
        any_chunk_emitted = false;
        report_text.clear();
        match stream_once(
            driver,
            context.clone(),
            bus,
            &room,
            session_id,
            &turn_id,
            &mut report_text,
            &mut any_chunk_emitted,
            &mut state,
        )
        .await
        {
            Ok(()) => {
                last_error = None;
                break;
            }
            Err(e) => {
                last_error = Some(e);
                if any_chunk_emitted || attempt == MAX_STREAM_RETRIES {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFFS_MS[attempt as usize])).await;
            }
        }
    }

    match &last_error {
        None => {
            bus.publish(room.clone(), Some(session_id.to_string()), EventKind::AiReasoningCompleted { turn_id });
        }
        Some(e) => {
            bus.publish(
                room.clone(),
                Some(session_id.to_string()),
                EventKind::AiError { code: "AI_UNAVAILABLE", message: e.to_string(), retryable: false },
            );
        }
    }

    let summary = driver.summarize_report(&report_text);
    let report = huntd_store::AiReport {
        id: Uuid::new_v4().to_string(),
        asset_id: asset_id.to_string(),
        session_id: session_id.to_string(),
        hunt_id: hunt_id.to_string(),
        report_text: report_text.clone(),
        summary,
        created_at: now_ms(),
    };
    if let Err(e) = store.save_ai_report(report).await {
        warn!(hunt_id = %hunt_id, error = %e, "failed to persist ai report");
    }

    let mut findings_count = 0u32;
    if last_error.is_none() {
        for parsed in driver.extract_findings(&report_text, observations) {
            let draft = FindingDraft {
                asset_id: asset_id.to_string(),
                session_id: session_id.to_string(),
                hunt_id: hunt_id.to_string(),
                kind: FindingKind::AiReport,
                title: parsed.title,
                severity: parsed.severity,
                confidence: parsed.confidence,
                tags: parsed.tags,
                stix_bundle: parsed.stix_bundle,
                remediation: parsed.remediation,
                evidence: parsed.evidence,
            };
            match store.upsert_finding_with_timeline(draft, now_ms(), None).await {
                Ok((finding, _outcome)) => {
                    findings_count += 1;
                    bus.publish(
                        room.clone(),
                        Some(session_id.to_string()),
                        EventKind::AiFindingGenerated {
                            finding_id: finding.id,
                            title: finding.title,
                            severity: finding.severity,
                        },
                    );
                }
                Err(e) => warn!(hunt_id = %hunt_id, error = %e, "failed to upsert finding"),
            }
        }
    }

    PipelineOutcome { findings_count }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
