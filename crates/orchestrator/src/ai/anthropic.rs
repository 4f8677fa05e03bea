// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anthropic Messages API driver. HTTP client shape uses a timeout'd
//! `reqwest::Client` with
//! bearer-style auth header, JSON bodies); streaming parses the
//! `text/event-stream` the Messages API returns when `stream: true`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;

use super::{Driver, DriverError, ParsedFinding, ReportChunk};
use crate::hunt::Observation;

const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AnthropicDriver {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicDriver {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let client = Client::builder().timeout(STREAM_IDLE_TIMEOUT).build().unwrap_or_default();
        Self { base_url, api_key, model, client }
    }
}

impl Driver for AnthropicDriver {
    fn stream_report(
        &self,
        context: String,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Result<ReportChunk, DriverError>>, DriverError>> + Send + '_>>
    {
        Box::pin(async move {
            let body = serde_json::json!({
                "model": self.model,
                "max_tokens": 4096,
                "stream": true,
                "messages": [{
                    "role": "user",
                    "content": format!("Analyze the following hunt observations for security findings:\n\n{context}"),
                }],
            });

            let response = self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
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
        super::openai_compat::parse_trailing_json_findings(report_text)
    }

    fn summarize_report(&self, report_text: &str) -> String {
        super::openai_compat::first_n_chars(report_text, 512)
    }
}

/// Drain an Anthropic `text/event-stream` response, emitting one
/// `ReportChunk` per `content_block_delta` event's text, and forwarding
/// transport errors through the channel so the pipeline's retry logic sees
/// them.
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

        while let Some(pos) = buf.find("\n\n") {
            let event = buf[..pos].to_string();
            buf.drain(..pos + 2);
            if let Some(chunk) = parse_sse_event(&event) {
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn parse_sse_event(event: &str) -> Option<ReportChunk> {
    let data_line = event.lines().find_map(|l| l.strip_prefix("data: "))?;
    let value: serde_json::Value = serde_json::from_str(data_line).ok()?;
    let text = value.get("delta")?.get("text")?.as_str()?;
    Some(ReportChunk { text: text.to_string(), state: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_content_block_delta_event() {
        let event = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"hello\"}}";
        let chunk = parse_sse_event(event).unwrap();
        assert_eq!(chunk.text, "hello");
    }

    #[test]
    fn ignores_events_without_a_delta_text_field() {
        let event = "event: message_stop\ndata: {\"type\":\"message_stop\"}";
        assert!(parse_sse_event(event).is_none());
    }
}
