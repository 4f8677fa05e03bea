// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use russh::client::{self, Msg};
use russh::keys::{decode_secret_key, key::PublicKey};
use russh::{ChannelMsg, Disconnect};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ConnectTarget, ExecOutcome, HostKeyPolicy, PtyChannel, SshAuth, SshBackend, SshError};
use crate::ring::CappedBuffer;

/// `russh::client::Handler` that enforces the Asset's configured host key
/// policy (trust-on-first-use by default, pinned fingerprint when
/// configured).
struct HostKeyVerifier {
    policy: HostKeyPolicy,
}

impl client::Handler for HostKeyVerifier {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::TrustOnFirstUse => Ok(true),
            HostKeyPolicy::Pinned(expected) => {
                let got = server_public_key.public_key_bytes();
                Ok(got == *expected)
            }
        }
    }
}

/// Real SSH backend over the `russh` client, used in production (vs.
/// [`super::fake::FakeBackend`] used in `tests/specs`).
pub struct RusshBackend {
    handle: client::Handle<HostKeyVerifier>,
}

impl RusshBackend {
    pub async fn connect(target: &ConnectTarget) -> Result<Self, SshError> {
        let config = Arc::new(client::Config::default());
        let verifier = HostKeyVerifier { policy: target.host_key_policy.clone() };

        let mut handle = client::connect(config, (target.host.as_str(), target.port), verifier)
            .await
            .map_err(|e| SshError::Unreachable(e.to_string()))?;

        let authenticated = match &target.auth {
            SshAuth::Password(password) => handle
                .authenticate_password(&target.username, password)
                .await
                .map_err(|e| SshError::AuthFailed(e.to_string()))?,
            SshAuth::PrivateKey { pem, passphrase } => {
                let key = decode_secret_key(pem, passphrase.as_deref())
                    .map_err(|e| SshError::AuthFailed(format!("invalid private key: {e}")))?;
                handle
                    .authenticate_publickey(&target.username, Arc::new(key))
                    .await
                    .map_err(|e| SshError::AuthFailed(e.to_string()))?
            }
        };

        if !authenticated {
            return Err(SshError::AuthFailed("server rejected credentials".into()));
        }

        debug!(host = %target.host, "ssh connected");
        Ok(Self { handle })
    }
}

impl SshBackend for RusshBackend {
    fn exec(
        &self,
        command: &str,
        timeout: Duration,
        output_cap_bytes: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome, SshError>> + Send + '_>> {
        let command = command.to_owned();
        Box::pin(async move {
            let mut channel = self
                .handle
                .channel_open_session()
                .await
                .map_err(|e| SshError::ChannelClosed(e.to_string()))?;
            channel.exec(true, command).await.map_err(|e| SshError::ChannelClosed(e.to_string()))?;

            let mut stdout = CappedBuffer::new(output_cap_bytes);
            let mut stderr = CappedBuffer::new(output_cap_bytes);
            let mut exit_code = None;

            let result = tokio::time::timeout(timeout, async {
                while let Some(msg) = channel.wait().await {
                    match msg {
                        ChannelMsg::Data { data } => stdout.write(&data),
                        ChannelMsg::ExtendedData { data, ext: 1 } => stderr.write(&data),
                        ChannelMsg::ExtendedData { .. } => {}
                        ChannelMsg::ExitStatus { exit_status } => {
                            exit_code = Some(exit_status as i32);
                        }
                        ChannelMsg::Eof | ChannelMsg::Close => break,
                        _ => {}
                    }
                }
            })
            .await;

            if result.is_err() {
                return Err(SshError::ExecTimeout);
            }

            Ok(ExecOutcome {
                exit_code,
                stdout_truncated: stdout.truncated(),
                stdout: stdout.into_string().into_bytes(),
                stderr_truncated: stderr.truncated(),
                stderr: stderr.into_string().into_bytes(),
            })
        })
    }

    fn open_pty(
        &self,
        cols: u16,
        rows: u16,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn PtyChannel>, SshError>> + Send + '_>> {
        Box::pin(async move {
            let mut channel = self
                .handle
                .channel_open_session()
                .await
                .map_err(|e| SshError::ChannelClosed(e.to_string()))?;
            channel
                .request_pty(true, "xterm-256color", cols as u32, rows as u32, 0, 0, &[])
                .await
                .map_err(|e| SshError::ChannelClosed(e.to_string()))?;
            channel.request_shell(true).await.map_err(|e| SshError::ChannelClosed(e.to_string()))?;

            Ok(Box::new(RusshPty { channel: Some(channel) }) as Box<dyn PtyChannel>)
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Err(e) = self.handle.disconnect(Disconnect::ByApplication, "", "en").await {
                warn!(error = %e, "ssh disconnect failed");
            }
        })
    }
}

struct RusshPty {
    channel: Option<client::Channel<Msg>>,
}

impl PtyChannel for RusshPty {
    fn run(
        &mut self,
        output_tx: mpsc::Sender<Bytes>,
        mut input_rx: mpsc::Receiver<Bytes>,
        mut resize_rx: mpsc::Receiver<(u16, u16)>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i32>, SshError>> + Send + '_>> {
        Box::pin(async move {
            let Some(mut channel) = self.channel.take() else {
                return Err(SshError::ChannelClosed("pty already consumed".into()));
            };
            let mut exit_code = None;

            loop {
                tokio::select! {
                    msg = channel.wait() => {
                        match msg {
                            Some(ChannelMsg::Data { data }) => {
                                if output_tx.send(Bytes::copy_from_slice(&data)).await.is_err() {
                                    break;
                                }
                            }
                            Some(ChannelMsg::ExitStatus { exit_status }) => {
                                exit_code = Some(exit_status as i32);
                            }
                            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => break,
                            _ => {}
                        }
                    }
                    input = input_rx.recv() => {
                        match input {
                            Some(data) => {
                                channel.data(&data[..]).await.map_err(|e| SshError::ChannelClosed(e.to_string()))?;
                            }
                            None => break,
                        }
                    }
                    resize = resize_rx.recv() => {
                        if let Some((cols, rows)) = resize {
                            channel
                                .window_change(cols as u32, rows as u32, 0, 0)
                                .await
                                .map_err(|e| SshError::ChannelClosed(e.to_string()))?;
                        }
                    }
                }
            }

            Ok(exit_code)
        })
    }
}
