// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver for any OpenAI Chat Completions-compatible endpoint (`--ai-driver
//! openai-compat --ai-base-url ...`), streamed via SSE the same way the
//! Anthropic driver is. Also hosts the finding-extraction/summary helpers
//! shared by the Anthropic driver, since both speak the same "trailing JSON
//! block" report convention.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;

use super::{Driver, DriverError, ParsedFinding, ReportChunk};
use crate::hunt::Observation;
use huntd_store::{Remediation, Severity};

const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiCompatDriver {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiCompatDriver {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let client = Client::builder().timeout(STREAM_IDLE_TIMEOUT).build().unwrap_or_default();
        Self { base_url, api_key, model, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

impl Driver for OpenAiCompatDriver {
    fn stream_report(
        &self,
        context: String,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Result<ReportChunk, DriverError>>, DriverError>> + Send + '_>>
    {
        Box::pin(async move {
            let body = serde_json::json!({
                "model": self.model,
                "stream": true,
                "messages": [
                    {"role": "system", "content": "You are a security analyst reviewing hunt observations for findings."},
                    {"role": "user", "content": context},
                ],
            });

            let response = self
                .client
                .post(self.url("/chat/completions"))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| DriverError::Transport(e.to_string()))?;

            let response = response.error_for_status().map_err(|e| DriverError::Transport(e.to_string()))?;

            let (tx, rx) = mpsc::channel(64);
            tokio::spawn(drain_sse(response, tx));
            Ok(rx)
        })
    }

    fn extract_findings(&self, report_text: &str, _observations: &[Observation]) -> Vec<ParsedFinding> {
        parse_trailing_json_findings(report_text)
    }

    fn summarize_report(&self, report_text: &str) -> String {
        first_n_chars(report_text, 512)
    }
}

async fn drain_sse(response: reqwest::Response, tx: mpsc::Sender<Result<ReportChunk, DriverError>>) {
    let mut stream = response.bytes_stream();
    let mut buf = String::new();

    loop {
        let next = match stream.next().await {
            Some(chunk) => chunk,
            None => break,
        };
        let bytes = match next {
            Ok(b) => b,
            Err(e) => {
                let _ = tx.send(Err(DriverError::Transport(e.to_string()))).await;
                return;
            }
        };
        buf.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(pos) = buf.find('\n') {
            let line = buf[..pos].trim_end_matches('\r').to_string();
            buf.drain(..pos + 1);
            let Some(data) = line.strip_prefix("data: ") else { continue };
            if data == "[DONE]" {
                return;
            }
            if let Some(chunk) = parse_chat_chunk(data) {
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn parse_chat_chunk(data: &str) -> Option<ReportChunk> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    let text = value.get("choices")?.get(0)?.get("delta")?.get("content")?.as_str()?;
    Some(ReportChunk { text: text.to_string(), state: None })
}

/// The model is instructed (in the driver's prompt, not modeled here) to
/// close its report with a fenced ```json block listing findings. This pulls
/// the last such block out of the finished report text and decodes it; a
/// report with no block, or a malformed one, yields no findings rather than
/// an error — an AI report with prose but no structured findings is still a
/// valid outcome.
pub(super) fn parse_trailing_json_findings(report_text: &str) -> Vec<ParsedFinding> {
    let Some(start) = report_text.rfind("```json") else { return Vec::new() };
    let after_fence = &report_text[start + "```json".len()..];
    let Some(end) = after_fence.find("```") else { return Vec::new() };
    let block = after_fence[..end].trim();

    let Ok(raw): Result<Vec<RawFinding>, _> = serde_json::from_str(block) else { return Vec::new() };
    raw.into_iter().map(RawFinding::into_parsed).collect()
}

pub(super) fn first_n_chars(text: &str, n: usize) -> String {
    let mut out: String = text.chars().take(n).collect();
    if text.chars().count() > n {
        out.push('\u{2026}');
    }
    out
}

#[derive(serde::Deserialize)]
struct RawFinding {
    title: String,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    stix_bundle: Option<String>,
    #[serde(default)]
    remediation: Option<Remediation>,
    #[serde(default)]
    evidence: Vec<String>,
}

impl RawFinding {
    fn into_parsed(self) -> ParsedFinding {
        ParsedFinding {
            title: self.title,
            severity: self.severity.unwrap_or(Severity::Medium),
            confidence: self.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            tags: self.tags,
            stix_bundle: self.stix_bundle,
            remediation: self.remediation,
            evidence: self.evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_trailing_findings_block() {
        let report = "Some analysis prose.\n\n```json\n[{\"title\":\"Exposed secret\",\"severity\":\"high\",\"confidence\":0.9}]\n```\n";
        let findings = parse_trailing_json_findings(report);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Exposed secret");
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn report_without_a_findings_block_yields_no_findings() {
        assert!(parse_trailing_json_findings("just prose, no findings here").is_empty());
    }

    #[test]
    fn first_n_chars_truncates_and_marks_truncation() {
        let s = first_n_chars("abcdef", 3);
        assert_eq!(s, "abc\u{2026}");
        assert_eq!(first_n_chars("ab", 3), "ab");
    }
}
