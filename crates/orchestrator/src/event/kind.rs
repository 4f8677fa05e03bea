// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::domain::{HuntStatus, ReasoningState, SessionMode, SessionState};
use huntd_store::Severity;
use serde::{Deserialize, Serialize};

/// A single event on the bus: common envelope fields plus a kind-specific
/// payload — every event carries an event-type, a timestamp pair,
/// an optional session-id, and a kind-specific payload").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub wall_time_ms: i64,
    pub monotonic_ms: u64,
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(session_id: Option<String>, wall_time_ms: i64, monotonic_ms: u64, kind: EventKind) -> Self {
        Self { event_id: uuid::Uuid::new_v4().to_string(), wall_time_ms, monotonic_ms, session_id, kind }
    }
}

/// The closed set of event kinds the orchestrator ever emits. No
/// other variants may be added without a corresponding change to this
/// taxonomy — subscribers rely on it being exhaustive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventKind {
    #[serde(rename = "session.created")]
    SessionCreated { asset_id: String, mode: SessionMode },
    #[serde(rename = "session.state_changed")]
    SessionStateChanged { from: SessionState, to: SessionState, reason: Option<String> },
    #[serde(rename = "session.mode_changed")]
    SessionModeChanged { from: SessionMode, to: SessionMode },
    #[serde(rename = "session.locked")]
    SessionLocked { holder: String },
    #[serde(rename = "session.unlocked")]
    SessionUnlocked { holder: String },
    #[serde(rename = "session.terminated")]
    SessionTerminated { reason: String },

    #[serde(rename = "ssh.connecting")]
    SshConnecting { host: String, attempt: u32 },
    #[serde(rename = "ssh.connected")]
    SshConnected { host: String },
    #[serde(rename = "ssh.disconnected")]
    SshDisconnected { reason: String },
    #[serde(rename = "ssh.error")]
    SshError { code: &'static str, message: String },
    #[serde(rename = "ssh.command_started")]
    SshCommandStarted { step_id: String, command: String },
    #[serde(rename = "ssh.command_output")]
    SshCommandOutput { step_id: String, stream: OutputStream, chunk: String },
    #[serde(rename = "ssh.command_completed")]
    SshCommandCompleted { step_id: String, exit_code: Option<i32>, truncated: bool },

    #[serde(rename = "terminal.started")]
    TerminalStarted { cols: u16, rows: u16 },
    #[serde(rename = "terminal.data")]
    TerminalData { chunk: String },
    #[serde(rename = "terminal.resize")]
    TerminalResize { cols: u16, rows: u16 },
    #[serde(rename = "terminal.closed")]
    TerminalClosed,

    #[serde(rename = "hunt.started")]
    HuntStarted { hunt_id: String, module_id: String },
    #[serde(rename = "hunt.step_started")]
    HuntStepStarted { hunt_id: String, step_id: String, index: u32 },
    #[serde(rename = "hunt.observation")]
    HuntObservation { hunt_id: String, step_id: String, summary: String, truncated: bool },
    #[serde(rename = "hunt.step_completed")]
    HuntStepCompleted { hunt_id: String, step_id: String, exit_code: Option<i32> },
    #[serde(rename = "hunt.completed")]
    HuntCompleted { hunt_id: String, status: HuntStatus, finding_count: u32 },
    #[serde(rename = "hunt.failed")]
    HuntFailed { hunt_id: String, reason: String },
    #[serde(rename = "hunt.cancelled")]
    HuntCancelled { hunt_id: String },

    #[serde(rename = "ai.reasoning_started")]
    AiReasoningStarted { turn_id: String },
    #[serde(rename = "ai.reasoning_chunk")]
    AiReasoningChunk { turn_id: String, state: ReasoningState, text: String },
    #[serde(rename = "ai.reasoning_completed")]
    AiReasoningCompleted { turn_id: String },
    #[serde(rename = "ai.finding_generated")]
    AiFindingGenerated { finding_id: String, title: String, severity: Severity },
    #[serde(rename = "ai.error")]
    AiError { code: &'static str, message: String, retryable: bool },

    #[serde(rename = "timeline.event_recorded")]
    TimelineEventRecorded { timeline_event_id: String, summary: String },

    #[serde(rename = "system.error")]
    SystemError { code: &'static str, message: String },
    #[serde(rename = "system.backpressure")]
    SystemBackpressure { room: String, dropped: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}
