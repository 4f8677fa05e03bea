// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver for a local Ollama instance (`--ai-driver ollama`). No API key;
//! streams newline-delimited JSON from `/api/generate` rather than SSE.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;

use super::{Driver, DriverError, ParsedFinding, ReportChunk};
use crate::hunt::Observation;

const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OllamaDriver {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaDriver {
    pub fn new(base_url: String, model: String) -> Self {
        let client = Client::builder().timeout(STREAM_IDLE_TIMEOUT).build().unwrap_or_default();
        Self { base_url, model, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

impl Driver for OllamaDriver {
    fn stream_report(
        &self,
        context: String,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Result<ReportChunk, DriverError>>, DriverError>> + Send + '_>>
    {
        Box::pin(async move {
            let body = serde_json::json!({
                "model": self.model,
                "stream": true,
                "prompt": format!("You are a security analyst reviewing hunt observations for findings.\n\n{context}"),
            });

            let response = self
                .client
                .post(self.url("/api/generate"))
                .json(&body)
                .send()
                .await
                .map_err(|e| DriverError::Transport(e.to_string()))?;

            let response = response.error_for_status().map_err(|e| DriverError::Transport(e.to_string()))?;

            let (tx, rx) = mpsc::channel(64);
            tokio::spawn(drain_ndjson(response, tx));
            Ok(rx)
        })
    }

    fn extract_findings(&self, report_text: &str, _observations: &[Observation]) -> Vec<ParsedFinding> {
        super::openai_compat::parse_trailing_json_findings(report_text)
    }

    fn summarize_report(&self, report_text: &str) -> String {
        super::openai_compat::first_n_chars(report_text, 512)
    }
}

async fn drain_ndjson(response: reqwest::Response, tx: mpsc::Sender<Result<ReportChunk, DriverError>>) {
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
            let line = buf[..pos].to_string();
            buf.drain(..pos + 1);
            if line.trim().is_empty() {
                continue;
            }
            match parse_generate_line(&line) {
                Ok(Some(chunk)) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    }
}

/// Returns `Ok(Some(chunk))` for an in-progress line, `Ok(None)` once
/// `done: true` ends the stream, or `Err` if the line isn't valid JSON.
fn parse_generate_line(line: &str) -> Result<Option<ReportChunk>, DriverError> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| DriverError::Parse(e.to_string()))?;
    if value.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
        return Ok(None);
    }
    let text = value.get("response").and_then(|r| r.as_str()).unwrap_or("");
    Ok(Some(ReportChunk { text: text.to_string(), state: None }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_an_in_progress_line() {
        let chunk = parse_generate_line("{\"response\":\"hel\",\"done\":false}").unwrap().unwrap();
        assert_eq!(chunk.text, "hel");
    }

    #[test]
    fn done_line_ends_the_stream() {
        assert!(parse_generate_line("{\"response\":\"\",\"done\":true}").unwrap().is_none());
    }

    #[test]
    fn malformed_line_is_a_parse_error() {
        assert!(parse_generate_line("not json").is_err());
    }
}
