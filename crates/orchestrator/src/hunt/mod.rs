// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hunt Scheduler: hunt-module types, the module-file parser, and
//! sequential step execution against a session's SSH backend.

pub mod parser;
pub mod scheduler;

pub use parser::parse_module;
pub use scheduler::run_hunt;

use serde::{Deserialize, Serialize};

use crate::domain::{AssetOs, HuntStatus};

/// Severity hint carried on a [`HuntModule`]. Distinct from
/// `huntd_store::Severity` in name only — kept separate so the hunt-module
/// file format and the persisted Finding severity can evolve independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityHint {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl SeverityHint {
    pub fn to_store_severity(self) -> huntd_store::Severity {
        match self {
            Self::Critical => huntd_store::Severity::Critical,
            Self::High => huntd_store::Severity::High,
            Self::Medium => huntd_store::Severity::Medium,
            Self::Low => huntd_store::Severity::Low,
            Self::Info => huntd_store::Severity::Info,
        }
    }
}

/// One command within a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub command: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub requires_sudo: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

/// A static hunt-module definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntModule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub os_types: Vec<AssetOs>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub severity_hint: SeverityHint,
    pub steps: Vec<Step>,
}

impl HuntModule {
    pub fn supports_os(&self, os: AssetOs) -> bool {
        self.os_types.contains(&os)
    }
}

/// Outcome of running one [`Step`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub hunt_id: String,
    pub step_id: String,
    pub command_as_sent: String,
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitOutcome,
    pub wall_ms: u64,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitOutcome {
    Code { code: i32 },
    Timeout,
    Signal { signal: i32 },
    SkippedNoSudo,
}

/// Result of a full hunt run, returned to the owner loop.
#[derive(Debug, Clone)]
pub struct HuntOutcome {
    pub status: HuntStatus,
    pub findings_count: u32,
    pub observations: Vec<Observation>,
}
