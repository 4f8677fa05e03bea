// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH connector abstraction. Object-safe and boxed-future based, mirroring
//! a local PTY backend's trait shape so the Session Runtime can hold
//! `Box<dyn SshBackend>` without generics.

pub mod fake;
pub mod russh_backend;

use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;

/// Where to connect and how to authenticate.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    pub host_key_policy: HostKeyPolicy,
}

#[derive(Debug, Clone)]
pub enum SshAuth {
    Password(String),
    PrivateKey { pem: String, passphrase: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    TrustOnFirstUse,
    Pinned(Vec<u8>),
}

/// Errors surfaced by an SSH backend, already classified against the
/// Gateway's error taxonomy.
#[derive(Debug, Clone)]
pub enum SshError {
    Unreachable(String),
    AuthFailed(String),
    HostKeyMismatch { expected: String, got: String },
    ChannelClosed(String),
    ExecTimeout,
    Io(String),
}

impl fmt::Display for SshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(m) => write!(f, "unreachable: {m}"),
            Self::AuthFailed(m) => write!(f, "auth failed: {m}"),
            Self::HostKeyMismatch { expected, got } => {
                write!(f, "host key mismatch: expected {expected}, got {got}")
            }
            Self::ChannelClosed(m) => write!(f, "channel closed: {m}"),
            Self::ExecTimeout => write!(f, "exec timed out"),
            Self::Io(m) => write!(f, "io error: {m}"),
        }
    }
}

impl std::error::Error for SshError {}

impl SshError {
    pub fn code(&self) -> crate::error::ErrorCode {
        use crate::error::ErrorCode;
        match self {
            Self::Unreachable(_) => ErrorCode::Unreachable,
            Self::AuthFailed(_) => ErrorCode::AuthFailed,
            Self::HostKeyMismatch { .. } => ErrorCode::HostKeyMismatch,
            Self::ChannelClosed(_) => ErrorCode::ChannelClosed,
            Self::ExecTimeout => ErrorCode::ExecTimeout,
            Self::Io(_) => ErrorCode::ChannelClosed,
        }
    }
}

/// Result of a one-shot command execution.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stdout_truncated: bool,
    pub stderr: Vec<u8>,
    pub stderr_truncated: bool,
}

/// A live interactive channel backed by a remote PTY.
///
/// Object-safe for use as `Box<dyn PtyChannel>`, mirroring `pty::Backend`.
pub trait PtyChannel: Send + 'static {
    fn run(
        &mut self,
        output_tx: mpsc::Sender<Bytes>,
        input_rx: mpsc::Receiver<Bytes>,
        resize_rx: mpsc::Receiver<(u16, u16)>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i32>, SshError>> + Send + '_>>;
}

/// An established SSH connection to one Asset. Object-safe so the Session
/// Runtime can hold `Box<dyn SshBackend>` regardless of whether it is
/// backed by `russh` or the in-memory fake used in tests.
pub trait SshBackend: Send + Sync + 'static {
    fn exec(
        &self,
        command: &str,
        timeout: Duration,
        output_cap_bytes: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome, SshError>> + Send + '_>>;

    fn open_pty(
        &self,
        cols: u16,
        rows: u16,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn PtyChannel>, SshError>> + Send + '_>>;

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Connect to a target and return a boxed, already-authenticated backend.
/// A separate free function (rather than a trait method) since connecting
/// has no `&self` to dispatch on yet.
pub async fn connect(target: &ConnectTarget) -> Result<Box<dyn SshBackend>, SshError> {
    russh_backend::RusshBackend::connect(target).await.map(|b| Box::new(b) as Box<dyn SshBackend>)
}
