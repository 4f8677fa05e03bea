// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure session state graph. Kept free of I/O and locking so the
//! graph itself is exhaustively testable, independent of the owner loop
//! that drives it (`owner.rs`).

use crate::domain::{SessionMode, SessionState};
use std::fmt;

/// An event that may move a session from one state to another.
#[derive(Debug, Clone)]
pub enum Trigger {
    Open,
    SshConnected,
    SshError,
    EnterMode(SessionMode),
    Lock { by: String },
    Unlock { by: String },
    Pause,
    Resume,
    SshDisconnected,
    RetryConnect,
    RetriesExhausted,
    Close,
}

impl Trigger {
    fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::SshConnected => "ssh.connected",
            Self::SshError => "ssh.error",
            Self::EnterMode(_) => "enter_mode",
            Self::Lock { .. } => "lock",
            Self::Unlock { .. } => "unlock",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::SshDisconnected => "ssh.disconnected",
            Self::RetryConnect => "retry_connect",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SessionState,
    pub trigger: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no transition for trigger {:?} from state {:?}", self.trigger, self.from)
    }
}

impl std::error::Error for TransitionError {}

/// Apply `trigger` to `current`, returning the next state or an error if
/// the trigger is not valid from that state.
/// `locked_by` is only consulted for `Unlock`.
pub fn apply(
    current: SessionState,
    locked_by: Option<&str>,
    trigger: &Trigger,
) -> Result<SessionState, TransitionError> {
    use SessionState::*;
    use Trigger::*;

    let err = || TransitionError { from: current, trigger: trigger.name() };

    match (current, trigger) {
        (Initializing, Open) => Ok(Connecting),
        (Connecting, SshConnected) => Ok(Connected),
        (Connecting, SshError) => Ok(Failed),
        (Connected, EnterMode(_)) => Ok(Running),
        (Running, EnterMode(_)) => Ok(Running),
        (Running, Lock { .. }) => Ok(Locked),
        (Running, Pause) => Ok(Paused),
        (Running, SshDisconnected) => Ok(Disconnected),
        (Locked, Unlock { by }) => {
            if locked_by == Some(by.as_str()) {
                Ok(Running)
            } else {
                Err(err())
            }
        }
        (Paused, Resume) => Ok(Running),
        (Disconnected, RetryConnect) => Ok(Connecting),
        (Disconnected, RetriesExhausted) => Ok(Failed),
        (state, Close) if !state.is_terminal() => Ok(Terminated),
        _ => Err(err()),
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
