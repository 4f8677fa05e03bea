// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI Pipeline: a `Driver` contract with three swappable HTTP-backed
//! implementations, context budgeting, and the reasoning/finding-extraction
//! pipeline run after a hunt completes with `run_ai = true`.

pub mod anthropic;
pub mod context;
pub mod fake;
pub mod ollama;
pub mod openai_compat;
pub mod pipeline;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{AiDriverKind, Config};
use crate::domain::ReasoningState;
use crate::hunt::Observation;
use huntd_store::{Remediation, Severity};

pub use pipeline::run_pipeline;

/// One chunk of a driver's streaming report. `state` is driver-reported
/// when the driver knows it; `None` lets the pipeline fall back to the
/// textual heuristic.
#[derive(Debug, Clone)]
pub struct ReportChunk {
    pub text: String,
    pub state: Option<ReasoningState>,
}

/// A finding as the driver extracts it from report text — everything it
/// can know from the report alone. The pipeline attaches `asset_id`,
/// `session_id`, and `hunt_id` (which the driver never sees) before handing
/// it to the Intelligence Store as a `FindingDraft`.
#[derive(Debug, Clone)]
pub struct ParsedFinding {
    pub title: String,
    pub severity: Severity,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub stix_bundle: Option<String>,
    pub remediation: Option<Remediation>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum DriverError {
    Transport(String),
    Parse(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(m) => write!(f, "ai transport error: {m}"),
            Self::Parse(m) => write!(f, "ai response parse error: {m}"),
        }
    }
}

impl std::error::Error for DriverError {}

/// A backend capable of reasoning over a completed hunt's observations
/// Object-safe and boxed-future based, mirroring `SshBackend`'s
/// shape so the pipeline can hold `Arc<dyn Driver>` without generics.
pub trait Driver: Send + Sync + 'static {
    /// Begin streaming a report over `context`. Returns a channel the
    /// pipeline drains; the driver pushes chunks from a background task it
    /// spawns internally, mirroring `PtyChannel`'s "return a channel, run
    /// the I/O behind it" shape.
    fn stream_report(
        &self,
        context: String,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Result<ReportChunk, DriverError>>, DriverError>> + Send + '_>>;

    /// Parse findings out of the finished report text. Synchronous: by the
    /// time this is called the report is fully in memory, and extraction is
    /// text parsing, not a further network call.
    fn extract_findings(&self, report_text: &str, observations: &[Observation]) -> Vec<ParsedFinding>;

    fn summarize_report(&self, report_text: &str) -> String;
}

/// Build the configured driver, or `None` when the AI Pipeline is disabled
/// (`--ai-driver none`, the default).
pub fn build_driver(config: &Config) -> anyhow::Result<Option<Arc<dyn Driver>>> {
    let kind = config.ai_driver_kind()?;
    if kind == AiDriverKind::None {
        return Ok(None);
    }

    let model = config
        .ai_model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--ai-model is required when an AI driver is selected"))?;
    let api_key = match &config.ai_api_key_env {
        Some(var) => Some(
            std::env::var(var)
                .map_err(|_| anyhow::anyhow!("environment variable {var} named by --ai-api-key-env is not set"))?,
        ),
        None => None,
    };

    let driver: Arc<dyn Driver> = match kind {
        AiDriverKind::Anthropic => Arc::new(anthropic::AnthropicDriver::new(
            config.ai_base_url.clone().unwrap_or_else(|| "https://api.anthropic.com".into()),
            api_key.ok_or_else(|| anyhow::anyhow!("--ai-api-key-env is required for the anthropic driver"))?,
            model,
        )),
        AiDriverKind::OpenAiCompat => Arc::new(openai_compat::OpenAiCompatDriver::new(
            config
                .ai_base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--ai-base-url is required for the openai-compat driver"))?,
            api_key.ok_or_else(|| anyhow::anyhow!("--ai-api-key-env is required for the openai-compat driver"))?,
            model,
        )),
        AiDriverKind::Ollama => Arc::new(ollama::OllamaDriver::new(
            config.ai_base_url.clone().unwrap_or_else(|| "http://localhost:11434".into()),
            model,
        )),
        AiDriverKind::None => unreachable!("handled above"),
    };
    Ok(Some(driver))
}
