// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared value types referenced by the session, hunt, event, and gateway
//! modules. Kept separate to avoid those modules importing each other just
//! for an enum.

use serde::{Deserialize, Serialize};

/// OS tag on an Asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOs {
    Linux,
    Windows,
    Macos,
    Unknown,
}

impl AssetOs {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetOs::Linux => "linux",
            AssetOs::Windows => "windows",
            AssetOs::Macos => "macos",
            AssetOs::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "linux" => AssetOs::Linux,
            "windows" => AssetOs::Windows,
            "macos" => AssetOs::Macos,
            "unknown" => AssetOs::Unknown,
            _ => return None,
        })
    }
}

/// Sudo policy on an Asset's credential record. The default chosen to
/// resolve the open question on sudo password reuse is
/// [`SudoPolicy::ReuseSshPassword`] — see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SudoPolicy {
    NoPasswd,
    ReuseSshPassword,
    CustomPassword,
}

/// Session mode toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Ai,
    Interactive,
}

/// Session state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Initializing,
    Connecting,
    Connected,
    Running,
    Paused,
    Locked,
    Disconnected,
    Failed,
    Terminated,
}

impl SessionState {
    /// `Disconnected` is a recoverable, transient state (the owner retries
    /// the SSH dial with backoff before giving up) — only `Failed` and
    /// `Terminated` are actually terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Failed | SessionState::Terminated)
    }
}

/// Hunt lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HuntStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Reasoning phase reported on `ai.reasoning_chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningState {
    Analyzing,
    Concluding,
    Generating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failed_and_terminated_are_terminal() {
        assert!(SessionState::Failed.is_terminal());
        assert!(SessionState::Terminated.is_terminal());
        assert!(!SessionState::Disconnected.is_terminal());
        assert!(!SessionState::Running.is_terminal());
        assert!(!SessionState::Locked.is_terminal());
    }
}
