// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Runtime: the state machine, the single-writer owner task,
//! and the inbox handle external callers use to submit writer ops. A
//! select-loop over one local PTY backend, generalized to an SSH-backed
//! mode-switching channel.

pub mod owner;
pub mod registry;
pub mod transition;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::warn;

use crate::domain::{SessionMode, SessionState};
use crate::error::ErrorCode;
use crate::hunt::HuntModule;

/// Immutable identity of a session, set once at creation.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub id: String,
    pub asset_id: String,
    pub analyst_id: String,
    pub created_at_ms: i64,
}

/// Mutable, externally-readable session fields. The owner task is the only
/// writer; readers (HTTP GET handlers) take a snapshot via `RwLock::read`.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub state: SessionState,
    pub locked_by: Option<String>,
    pub terminated_at_ms: Option<i64>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self { mode: SessionMode::Interactive, state: SessionState::Initializing, locked_by: None, terminated_at_ms: None }
    }
}

type Reply<T> = oneshot::Sender<Result<T, ErrorCode>>;

/// Messages accepted by a session's owner inbox, processed strictly FIFO
/// (single-writer invariant).
pub enum Command {
    EnterMode { by: String, mode: SessionMode, reply: Reply<()> },
    Lock { by: String, reply: Reply<()> },
    Unlock { by: String, reply: Reply<()> },
    Pause { by: String, reply: Reply<()> },
    Resume { by: String, reply: Reply<()> },
    Close { reply: oneshot::Sender<()> },
    TerminalInput { by: String, data: Bytes, reply: Reply<()> },
    TerminalResize { by: String, cols: u16, rows: u16, reply: Reply<()> },
    StartHunt { by: String, module: Arc<HuntModule>, run_ai: bool, reply: Reply<String> },
    CancelHunt { by: String, hunt_id: String, reply: Reply<()> },
    /// Internal: raised by the owner's own SSH read loop.
    SshConnected,
    SshError { message: String },
    SshDisconnected { reason: String },
}

/// A handle callers use to submit commands to a session's owner task.
/// Cloning is cheap; all clones share the same inbox and snapshot.
#[derive(Clone)]
pub struct SessionHandle {
    pub meta: Arc<SessionMeta>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    inbox: mpsc::Sender<Command>,
}

const INBOX_TIMEOUT: Duration = Duration::from_secs(10);

impl SessionHandle {
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().await.clone()
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ErrorCode> {
        let (tx, rx) = oneshot::channel();
        if self.inbox.send(make(tx)).await.is_err() {
            return Err(ErrorCode::Conflict);
        }
        match tokio::time::timeout(INBOX_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ErrorCode::Invariant),
            Err(_) => Err(ErrorCode::Busy),
        }
    }

    pub async fn enter_mode(&self, by: impl Into<String>, mode: SessionMode) -> Result<(), ErrorCode> {
        self.call(|reply| Command::EnterMode { by: by.into(), mode, reply }).await
    }

    pub async fn lock(&self, by: impl Into<String>) -> Result<(), ErrorCode> {
        self.call(|reply| Command::Lock { by: by.into(), reply }).await
    }

    pub async fn unlock(&self, by: impl Into<String>) -> Result<(), ErrorCode> {
        self.call(|reply| Command::Unlock { by: by.into(), reply }).await
    }

    pub async fn pause(&self, by: impl Into<String>) -> Result<(), ErrorCode> {
        self.call(|reply| Command::Pause { by: by.into(), reply }).await
    }

    pub async fn resume(&self, by: impl Into<String>) -> Result<(), ErrorCode> {
        self.call(|reply| Command::Resume { by: by.into(), reply }).await
    }

    pub async fn close(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inbox.send(Command::Close { reply: tx }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn terminal_input(&self, by: impl Into<String>, data: Bytes) -> Result<(), ErrorCode> {
        self.call(|reply| Command::TerminalInput { by: by.into(), data, reply }).await
    }

    pub async fn terminal_resize(&self, by: impl Into<String>, cols: u16, rows: u16) -> Result<(), ErrorCode> {
        self.call(|reply| Command::TerminalResize { by: by.into(), cols, rows, reply }).await
    }

    pub async fn start_hunt(
        &self,
        by: impl Into<String>,
        module: Arc<HuntModule>,
        run_ai: bool,
    ) -> Result<String, ErrorCode> {
        self.call(|reply| Command::StartHunt { by: by.into(), module, run_ai, reply }).await
    }

    pub async fn cancel_hunt(&self, by: impl Into<String>, hunt_id: impl Into<String>) -> Result<(), ErrorCode> {
        self.call(|reply| Command::CancelHunt { by: by.into(), hunt_id: hunt_id.into(), reply }).await
    }

    /// Best-effort notification used by the SSH read task; never blocks the
    /// caller for long since the inbox poisons to "closed" rather than
    /// waiting once the owner has exited.
    pub fn notify_ssh_connected(&self) {
        if self.inbox.try_send(Command::SshConnected).is_err() {
            warn!(session_id = %self.meta.id, "dropped ssh.connected notification, owner inbox closed");
        }
    }

    pub fn notify_ssh_error(&self, message: impl Into<String>) {
        let _ = self.inbox.try_send(Command::SshError { message: message.into() });
    }

    pub fn notify_ssh_disconnected(&self, reason: impl Into<String>) {
        let _ = self.inbox.try_send(Command::SshDisconnected { reason: reason.into() });
    }
}

/// Checks the per-session lock exclusivity invariant:
/// once locked, only the locker may perform writer operations.
pub fn check_writer_allowed(locked_by: &Option<String>, requester: &str) -> Result<(), ErrorCode> {
    match locked_by {
        Some(holder) if holder != requester => Err(ErrorCode::Locked),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
