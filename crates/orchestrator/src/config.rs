// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Multi-tenant security-hunting orchestrator.
#[derive(Debug, Parser)]
#[command(name = "huntd", version, about)]
pub struct Config {
    /// HTTP + WebSocket port to listen on.
    #[arg(long, env = "HUNTD_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "HUNTD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bearer-token signing secret used to verify JWTs at the Gateway.
    /// When unset, auth is disabled (local/dev mode).
    #[arg(long, env = "HUNTD_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Path to the sqlite database backing the Intelligence Store.
    /// Omit (or pass ":memory:") to run with an in-memory store.
    #[arg(long, env = "HUNTD_DB_PATH", default_value = "huntd.db")]
    pub db_path: String,

    /// Directory of hunt-module spec files loaded at start-up.
    #[arg(long, env = "HUNTD_MODULES_DIR")]
    pub modules_dir: Option<PathBuf>,

    /// SSH host-key verification policy.
    #[arg(long, env = "HUNTD_SSH_HOST_KEY_POLICY", default_value = "trust-on-first-use")]
    pub ssh_host_key_policy: String,

    /// Path to the known-hosts-style pin file; required when
    /// `--ssh-host-key-policy pinned` is selected.
    #[arg(long, env = "HUNTD_SSH_KNOWN_HOSTS")]
    pub ssh_known_hosts: Option<PathBuf>,

    /// Which AI driver backs the AI Pipeline.
    #[arg(long, env = "HUNTD_AI_DRIVER", default_value = "none")]
    pub ai_driver: String,

    /// Base URL for the selected AI driver's HTTP API.
    #[arg(long, env = "HUNTD_AI_BASE_URL")]
    pub ai_base_url: Option<String>,

    /// Model name passed to the selected AI driver.
    #[arg(long, env = "HUNTD_AI_MODEL")]
    pub ai_model: Option<String>,

    /// Name of the environment variable holding the AI driver's API key.
    /// The orchestrator reads the named variable at start-up; the key
    /// itself is never accepted as a CLI argument.
    #[arg(long, env = "HUNTD_AI_API_KEY_ENV")]
    pub ai_api_key_env: Option<String>,

    /// Per-session concurrent-hunt cap.
    #[arg(long, env = "HUNTD_HUNT_CONCURRENCY", default_value = "1")]
    pub hunt_concurrency: usize,

    /// Default per-step timeout in seconds when a module omits one.
    #[arg(long, env = "HUNTD_DEFAULT_STEP_TIMEOUT", default_value = "30")]
    pub default_step_timeout_secs: u64,

    /// Log format (json or text).
    #[arg(long, env = "HUNTD_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "HUNTD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Bootstrap analyst username accepted by `POST /auth/login`. Stands in
    /// for an external auth collaborator so the Gateway's login surface is
    /// exercisable without a separate identity service.
    #[arg(long, env = "HUNTD_AUTH_USERNAME", default_value = "admin")]
    pub auth_username: String,

    /// Bootstrap analyst password accepted by `POST /auth/login`.
    #[arg(long, env = "HUNTD_AUTH_PASSWORD", default_value = "admin")]
    pub auth_password: String,

    /// Access-token lifetime in seconds.
    #[arg(long, env = "HUNTD_ACCESS_TOKEN_TTL_SECS", default_value = "900")]
    pub access_token_ttl_secs: u64,

    /// Refresh-token lifetime in seconds.
    #[arg(long, env = "HUNTD_REFRESH_TOKEN_TTL_SECS", default_value = "604800")]
    pub refresh_token_ttl_secs: u64,
}

/// Supported AI Pipeline drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiDriverKind {
    Anthropic,
    OpenAiCompat,
    Ollama,
    None,
}

/// Host-key verification policy for the SSH Connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyPolicy {
    TrustOnFirstUse,
    Pinned,
}

impl Config {
    /// Validate cross-field invariants after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ai_driver_kind()?;
        self.host_key_policy()?;

        if self.host_key_policy()? == HostKeyPolicy::Pinned && self.ssh_known_hosts.is_none() {
            anyhow::bail!("--ssh-host-key-policy pinned requires --ssh-known-hosts");
        }

        if self.ai_driver_kind()? != AiDriverKind::None {
            if self.ai_model.is_none() {
                anyhow::bail!("--ai-model is required when an AI driver is selected");
            }
            if self.ai_driver_kind()? != AiDriverKind::Ollama && self.ai_api_key_env.is_none() {
                anyhow::bail!("--ai-api-key-env is required for this AI driver");
            }
        }

        if self.hunt_concurrency == 0 {
            anyhow::bail!("--hunt-concurrency must be at least 1");
        }

        Ok(())
    }

    pub fn ai_driver_kind(&self) -> anyhow::Result<AiDriverKind> {
        match self.ai_driver.to_lowercase().as_str() {
            "anthropic" => Ok(AiDriverKind::Anthropic),
            "openai" | "openai-compat" => Ok(AiDriverKind::OpenAiCompat),
            "ollama" => Ok(AiDriverKind::Ollama),
            "none" => Ok(AiDriverKind::None),
            other => anyhow::bail!("invalid --ai-driver: {other}"),
        }
    }

    pub fn host_key_policy(&self) -> anyhow::Result<HostKeyPolicy> {
        match self.ssh_host_key_policy.to_lowercase().as_str() {
            "trust-on-first-use" | "tofu" => Ok(HostKeyPolicy::TrustOnFirstUse),
            "pinned" => Ok(HostKeyPolicy::Pinned),
            other => anyhow::bail!("invalid --ssh-host-key-policy: {other}"),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
