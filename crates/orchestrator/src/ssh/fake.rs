// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory SSH backend used by `tests/specs` so hunts and sessions can be
//! exercised without a real network or remote host.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{ExecOutcome, PtyChannel, SshBackend, SshError};

/// A canned response for one command, matched by exact string.
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl FakeResponse {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: Some(0), stdout: stdout.into().into_bytes(), stderr: Vec::new() }
    }

    pub fn failing(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self { exit_code: Some(exit_code), stdout: Vec::new(), stderr: stderr.into().into_bytes() }
    }
}

/// Scriptable fake standing in for a real SSH connection.
pub struct FakeBackend {
    responses: Mutex<HashMap<String, FakeResponse>>,
    default_response: FakeResponse,
    echo_pty: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_response: FakeResponse::ok(""),
            echo_pty: true,
        }
    }

    pub fn with_response(self, command: impl Into<String>, response: FakeResponse) -> Self {
        self.responses.lock().unwrap_or_else(|p| p.into_inner()).insert(command.into(), response);
        self
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SshBackend for FakeBackend {
    fn exec(
        &self,
        command: &str,
        _timeout: Duration,
        output_cap_bytes: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome, SshError>> + Send + '_>> {
        let command = command.to_owned();
        Box::pin(async move {
            let responses = self.responses.lock().unwrap_or_else(|p| p.into_inner());
            let response = responses.get(&command).cloned().unwrap_or_else(|| self.default_response.clone());
            drop(responses);

            let stdout_truncated = response.stdout.len() > output_cap_bytes;
            let stderr_truncated = response.stderr.len() > output_cap_bytes;
            Ok(ExecOutcome {
                exit_code: response.exit_code,
                stdout: response.stdout.into_iter().take(output_cap_bytes).collect(),
                stdout_truncated,
                stderr: response.stderr.into_iter().take(output_cap_bytes).collect(),
                stderr_truncated,
            })
        })
    }

    fn open_pty(
        &self,
        _cols: u16,
        _rows: u16,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn PtyChannel>, SshError>> + Send + '_>> {
        let echo = self.echo_pty;
        Box::pin(async move { Ok(Box::new(FakePty { echo }) as Box<dyn PtyChannel>) })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {})
    }
}

struct FakePty {
    echo: bool,
}

impl PtyChannel for FakePty {
    fn run(
        &mut self,
        output_tx: mpsc::Sender<Bytes>,
        mut input_rx: mpsc::Receiver<Bytes>,
        mut resize_rx: mpsc::Receiver<(u16, u16)>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i32>, SshError>> + Send + '_>> {
        let echo = self.echo;
        Box::pin(async move {
            loop {
                tokio::select! {
                    input = input_rx.recv() => {
                        match input {
                            Some(data) if echo => {
                                if output_tx.send(data).await.is_err() {
                                    break;
                                }
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                    resize = resize_rx.recv() => {
                        if resize.is_none() {
                            break;
                        }
                    }
                }
            }
            Ok(Some(0))
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
