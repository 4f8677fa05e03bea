// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session owner task: the single serializer that mutates session
//! state, mediates the SSH Connector, and runs hunts. A select-loop
//! generalized from a local PTY child process to a remote SSH channel
//! with a writer gate
//! between interactive PTY bytes and scripted hunt exec.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use futures_util::future::OptionFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::transition::{self, Trigger};
use super::{check_writer_allowed, Command, SessionHandle, SessionMeta, SessionSnapshot};
use crate::ai::{self, Driver};
use crate::domain::{HuntStatus, SessionMode, SessionState, SudoPolicy};
use crate::error::ErrorCode;
use crate::event::{EventBus, EventKind, Room};
use crate::hunt::{self, HuntModule, HuntOutcome};
use crate::ssh::{self, ConnectTarget, PtyChannel, SshBackend, SshError};
use huntd_store::{AsyncStore, HuntRunRecord};

const MAX_RECONNECT_ATTEMPTS: u32 = 3;
const RECONNECT_BACKOFFS_MS: [u64; 3] = [250, 1000, 4000];
const SSH_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

struct PtyRuntime {
    input_tx: mpsc::Sender<Bytes>,
    resize_tx: mpsc::Sender<(u16, u16)>,
    join: JoinHandle<Result<Option<i32>, SshError>>,
}

struct ActiveHunt {
    hunt_id: String,
    cancel: CancellationToken,
    join: JoinHandle<HuntOutcome>,
}

/// Owns everything the session needs across its lifetime: the inbox, the
/// live SSH backend (once connected), the optional interactive PTY
/// runtime, and at most one in-flight hunt.
pub struct Owner {
    meta: Arc<SessionMeta>,
    snapshot: Arc<tokio::sync::RwLock<SessionSnapshot>>,
    inbox: mpsc::Receiver<Command>,
    self_handle: SessionHandle,
    target: ConnectTarget,
    sudo_policy: Option<SudoPolicy>,
    ssh: Option<Arc<dyn SshBackend>>,
    bus: Arc<EventBus>,
    store: AsyncStore,
    driver: Option<Arc<dyn Driver>>,
    shutdown: CancellationToken,
    retry_count: u32,
    pty: Option<PtyRuntime>,
    active_hunt: Option<ActiveHunt>,
}

/// Build a session, spawn its owner task, and return the handle callers
/// use to submit commands. The owner immediately begins connecting.
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    meta: SessionMeta,
    target: ConnectTarget,
    sudo_policy: Option<SudoPolicy>,
    bus: Arc<EventBus>,
    store: AsyncStore,
    driver: Option<Arc<dyn Driver>>,
    shutdown: CancellationToken,
) -> SessionHandle {
    let meta = Arc::new(meta);
    let snapshot = Arc::new(tokio::sync::RwLock::new(SessionSnapshot::initial()));
    let (tx, rx) = mpsc::channel(256);

    let handle = SessionHandle { meta: meta.clone(), snapshot: snapshot.clone(), inbox: tx };

    let owner = Owner {
        meta,
        snapshot,
        inbox: rx,
        self_handle: handle.clone(),
        target,
        sudo_policy,
        ssh: None,
        bus,
        store,
        driver,
        shutdown,
        retry_count: 0,
        pty: None,
        active_hunt: None,
    };

    tokio::spawn(owner.run());
    handle
}

impl Owner {
    fn room(&self) -> Room {
        Room::session(self.meta.id.clone())
    }

    async fn mode(&self) -> SessionMode {
        self.snapshot.read().await.mode
    }

    async fn state(&self) -> SessionState {
        self.snapshot.read().await.state
    }

    async fn locked_by(&self) -> Option<String> {
        self.snapshot.read().await.locked_by.clone()
    }

    async fn apply(&self, trigger: Trigger) -> Result<SessionState, transition::TransitionError> {
        let mut snap = self.snapshot.write().await;
        let next = transition::apply(snap.state, snap.locked_by.as_deref(), &trigger)?;
        let prev = snap.state;
        snap.state = next;
        match &trigger {
            Trigger::Lock { by } => snap.locked_by = Some(by.clone()),
            Trigger::Unlock { .. } => snap.locked_by = None,
            _ => {}
        }
        if next == SessionState::Terminated {
            snap.terminated_at_ms = Some(now_ms());
        }
        drop(snap);

        self.bus.publish(
            self.room(),
            Some(self.meta.id.clone()),
            EventKind::SessionStateChanged { from: prev, to: next, reason: None },
        );
        Ok(next)
    }

    pub async fn run(mut self) {
        self.bus.publish(
            self.room(),
            Some(self.meta.id.clone()),
            EventKind::SessionCreated { asset_id: self.meta.asset_id.clone(), mode: SessionMode::Interactive },
        );
        let _ = self.apply(Trigger::Open).await;
        self.connect_once().await;

        loop {
            let hunt_join: OptionFuture<_> = self.active_hunt.as_mut().map(|a| &mut a.join).into();
            let pty_join: OptionFuture<_> = self.pty.as_mut().map(|p| &mut p.join).into();

            tokio::select! {
                cmd = self.inbox.recv() => {
                    match cmd {
                        Some(Command::Close { reply }) => {
                            self.handle_close().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                Some(result) = hunt_join => {
                    self.handle_hunt_finished(result).await;
                }
                Some(result) = pty_join => {
                    self.handle_pty_exited(result).await;
                }
                _ = self.shutdown.cancelled() => {
                    self.handle_close().await;
                    break;
                }
            }
        }

        debug!(session_id = %self.meta.id, "session owner exiting");
    }

    async fn connect_once(&mut self) {
        self.bus.publish(
            self.room(),
            Some(self.meta.id.clone()),
            EventKind::SshConnecting { host: self.target.host.clone(), attempt: self.retry_count + 1 },
        );
        let result = tokio::time::timeout(SSH_DIAL_TIMEOUT, ssh::connect(&self.target)).await;
        match result {
            Ok(Ok(backend)) => {
                self.ssh = Some(Arc::from(backend));
                self.retry_count = 0;
                let _ = self.apply(Trigger::SshConnected).await;
                self.bus.publish(
                    self.room(),
                    Some(self.meta.id.clone()),
                    EventKind::SshConnected { host: self.target.host.clone() },
                );
            }
            Ok(Err(e)) => self.fail_connect(e.to_string()).await,
            Err(_) => self.fail_connect("ssh dial timed out".into()).await,
        }
    }

    async fn fail_connect(&mut self, message: String) {
        self.bus.publish(
            self.room(),
            Some(self.meta.id.clone()),
            EventKind::SshError { code: "UNREACHABLE", message: message.clone() },
        );
        let _ = self.apply(Trigger::SshError).await;
        warn!(session_id = %self.meta.id, error = %message, "ssh connect failed");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::EnterMode { by, mode, reply } => {
                let result = self.enter_mode(&by, mode).await;
                let _ = reply.send(result);
            }
            Command::Lock { by, reply } => {
                let result = self.lock(by).await;
                let _ = reply.send(result);
            }
            Command::Unlock { by, reply } => {
                let result = self.unlock(by).await;
                let _ = reply.send(result);
            }
            Command::Pause { by, reply } => {
                let result = self.writer_op(&by, Trigger::Pause).await;
                let _ = reply.send(result);
            }
            Command::Resume { by, reply } => {
                let result = self.writer_op(&by, Trigger::Resume).await;
                let _ = reply.send(result);
            }
            Command::TerminalInput { by, data, reply } => {
                let result = self.terminal_input(&by, data).await;
                let _ = reply.send(result);
            }
            Command::TerminalResize { by, cols, rows, reply } => {
                let result = self.terminal_resize(&by, cols, rows).await;
                let _ = reply.send(result);
            }
            Command::StartHunt { by, module, run_ai, reply } => {
                let result = self.start_hunt(&by, module, run_ai).await;
                let _ = reply.send(result);
            }
            Command::CancelHunt { by, hunt_id, reply } => {
                let result = self.cancel_hunt(&by, &hunt_id).await;
                let _ = reply.send(result);
            }
            Command::Close { .. } => unreachable!("handled in run()"),
            Command::SshConnected => self.retry_connect().await,
            Command::SshError { message } => self.fail_connect(message).await,
            Command::SshDisconnected { reason } => self.handle_disconnected(reason).await,
        }
    }

    async fn lock(&mut self, by: String) -> Result<(), ErrorCode> {
        self.apply(Trigger::Lock { by: by.clone() }).await.map_err(|_| ErrorCode::Conflict)?;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::SessionLocked { holder: by });
        Ok(())
    }

    async fn unlock(&mut self, by: String) -> Result<(), ErrorCode> {
        self.apply(Trigger::Unlock { by: by.clone() }).await.map_err(|_| ErrorCode::Locked)?;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::SessionUnlocked { holder: by });
        Ok(())
    }

    async fn enter_mode(&mut self, by: &str, mode: SessionMode) -> Result<(), ErrorCode> {
        check_writer_allowed(&self.locked_by().await, by)?;
        let from = self.mode().await;
        self.apply(Trigger::EnterMode(mode)).await.map_err(|_| ErrorCode::Conflict)?;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::SessionModeChanged { from, to: mode });
        if mode == SessionMode::Interactive && self.pty.is_none() {
            self.open_pty(80, 24).await?;
        }
        Ok(())
    }

    async fn writer_op(&mut self, by: &str, trigger: Trigger) -> Result<(), ErrorCode> {
        check_writer_allowed(&self.locked_by().await, by)?;
        self.apply(trigger).await.map(|_| ()).map_err(|_| ErrorCode::Conflict)
    }

    async fn open_pty(&mut self, cols: u16, rows: u16) -> Result<(), ErrorCode> {
        let Some(ssh) = self.ssh.clone() else { return Err(ErrorCode::Conflict) };
        let mut channel = ssh.open_pty(cols, rows).await.map_err(|_| ErrorCode::Unreachable)?;

        let (output_tx, mut output_rx) = mpsc::channel::<Bytes>(256);
        let (input_tx, input_rx) = mpsc::channel::<Bytes>(256);
        let (resize_tx, resize_rx) = mpsc::channel::<(u16, u16)>(4);

        let join = tokio::spawn(async move { channel.run(output_tx, input_rx, resize_rx).await });

        let bus = self.bus.clone();
        let room = self.room();
        let session_id = self.meta.id.clone();
        tokio::spawn(async move {
            while let Some(chunk) = output_rx.recv().await {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&chunk);
                bus.publish(room.clone(), Some(session_id.clone()), EventKind::TerminalData { chunk: encoded });
            }
        });

        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::TerminalStarted { cols, rows });
        self.pty = Some(PtyRuntime { input_tx, resize_tx, join });
        Ok(())
    }

    async fn terminal_input(&mut self, by: &str, data: Bytes) -> Result<(), ErrorCode> {
        check_writer_allowed(&self.locked_by().await, by)?;
        if self.active_hunt.is_some() {
            return Err(ErrorCode::Busy);
        }
        let Some(pty) = &self.pty else { return Err(ErrorCode::Conflict) };
        pty.input_tx.send(data).await.map_err(|_| ErrorCode::ChannelClosed)
    }

    async fn terminal_resize(&mut self, by: &str, cols: u16, rows: u16) -> Result<(), ErrorCode> {
        check_writer_allowed(&self.locked_by().await, by)?;
        let Some(pty) = &self.pty else { return Err(ErrorCode::Conflict) };
        pty.resize_tx.send((cols, rows)).await.map_err(|_| ErrorCode::ChannelClosed)?;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::TerminalResize { cols, rows });
        Ok(())
    }

    /// Starting a hunt closes the writer gate to the interactive PTY until
    /// it finishes or is cancelled — `terminal_input`
    /// rejects with `Busy` for the duration rather than queuing, so the
    /// caller can surface a clear "hunt in progress" state instead of
    /// silently delaying keystrokes.
    async fn start_hunt(&mut self, by: &str, module: Arc<HuntModule>, run_ai: bool) -> Result<String, ErrorCode> {
        check_writer_allowed(&self.locked_by().await, by)?;
        if self.active_hunt.is_some() {
            return Err(ErrorCode::Busy);
        }
        let Some(ssh) = self.ssh.clone() else { return Err(ErrorCode::Conflict) };

        let hunt_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let cancel_for_task = cancel.clone();
        let bus = self.bus.clone();
        let session_id = self.meta.id.clone();
        let asset_id = self.meta.asset_id.clone();
        let sudo_policy = self.sudo_policy;
        let store = self.store.clone();
        let driver = self.driver.clone();
        let started_at = now_ms();
        let record_id = hunt_id.clone();
        let module_id = module.id.clone();

        let join = tokio::spawn(async move {
            let mut outcome =
                hunt::run_hunt(&record_id, &session_id, ssh.as_ref(), &module, sudo_policy, &bus, cancel_for_task).await;

            if run_ai && outcome.status == HuntStatus::Completed {
                if let Some(driver) = &driver {
                    let pipeline_outcome = ai::run_pipeline(
                        driver.as_ref(),
                        &asset_id,
                        &session_id,
                        &record_id,
                        &module,
                        &outcome.observations,
                        &bus,
                        &store,
                    )
                    .await;
                    outcome.findings_count = pipeline_outcome.findings_count;
                } else {
                    warn!(hunt_id = %record_id, "run_ai requested but no AI driver is configured");
                }
            }

            let record = HuntRunRecord {
                id: record_id.clone(),
                session_id: session_id.clone(),
                module_id,
                run_ai,
                status: hunt_status_str(outcome.status).into(),
                started_at,
                ended_at: Some(now_ms()),
                findings_count: outcome.findings_count,
            };
            if let Err(e) = store.record_hunt_run(record).await {
                warn!(hunt_id = %record_id, error = %e, "failed to persist hunt run");
            }
            outcome
        });

        self.active_hunt = Some(ActiveHunt { hunt_id: hunt_id.clone(), cancel, join });
        Ok(hunt_id)
    }

    async fn cancel_hunt(&mut self, by: &str, hunt_id: &str) -> Result<(), ErrorCode> {
        check_writer_allowed(&self.locked_by().await, by)?;
        match &self.active_hunt {
            Some(active) if active.hunt_id == hunt_id => {
                active.cancel.cancel();
                Ok(())
            }
            _ => Err(ErrorCode::NotFound),
        }
    }

    async fn handle_hunt_finished(&mut self, result: Result<HuntOutcome, tokio::task::JoinError>) {
        let hunt_id = self.active_hunt.take().map(|a| a.hunt_id).unwrap_or_default();
        match result {
            Ok(outcome) => {
                self.bus.publish(
                    self.room(),
                    Some(self.meta.id.clone()),
                    EventKind::HuntCompleted { hunt_id, status: outcome.status, finding_count: outcome.findings_count },
                );
            }
            Err(e) => {
                warn!(session_id = %self.meta.id, error = %e, "hunt task panicked");
                self.bus.publish(
                    self.room(),
                    Some(self.meta.id.clone()),
                    EventKind::HuntFailed { hunt_id, reason: e.to_string() },
                );
            }
        }
    }

    async fn handle_pty_exited(&mut self, result: Result<Result<Option<i32>, SshError>, tokio::task::JoinError>) {
        self.pty = None;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::TerminalClosed);
        if let Ok(Err(e)) = result {
            warn!(session_id = %self.meta.id, error = %e, "pty channel ended with error");
        }
    }

    async fn retry_connect(&mut self) {
        if self.state().await != SessionState::Disconnected {
            return;
        }
        let _ = self.apply(Trigger::RetryConnect).await;
        self.connect_once().await;
    }

    async fn handle_disconnected(&mut self, reason: String) {
        if self.state().await.is_terminal() {
            return;
        }
        self.ssh = None;
        self.pty = None;
        let _ = self.apply(Trigger::SshDisconnected).await;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::SshDisconnected { reason });

        self.retry_count += 1;
        if self.retry_count > MAX_RECONNECT_ATTEMPTS {
            let _ = self.apply(Trigger::RetriesExhausted).await;
            return;
        }

        let backoff_ms = RECONNECT_BACKOFFS_MS[(self.retry_count - 1) as usize % RECONNECT_BACKOFFS_MS.len()];
        let handle = self.self_handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            handle.notify_ssh_connected();
        });
    }

    async fn handle_close(&mut self) {
        if let Some(active) = self.active_hunt.take() {
            active.cancel.cancel();
        }
        if let Some(ssh) = self.ssh.take() {
            ssh.close().await;
        }
        let _ = self.apply(Trigger::Close).await;
        self.bus.publish(self.room(), Some(self.meta.id.clone()), EventKind::SessionTerminated { reason: "close".into() });
    }
}

fn hunt_status_str(status: crate::domain::HuntStatus) -> &'static str {
    use crate::domain::HuntStatus::*;
    match status {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
