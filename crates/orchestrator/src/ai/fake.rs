// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory AI driver used by tests to exercise the pipeline without a
//! network call, mirroring `ssh::fake::FakeBackend`'s scriptable-fake shape.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use super::{Driver, DriverError, ParsedFinding, ReportChunk};
use crate::hunt::Observation;
use huntd_store::Severity;

/// A driver that streams a fixed set of chunks, then returns a fixed set of
/// findings, or fails on the Nth stream attempt if configured to.
pub struct FakeDriver {
    chunks: Vec<String>,
    findings: Vec<ParsedFinding>,
    fail_before_first_chunk: bool,
}

impl FakeDriver {
    pub fn new(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(String::from).collect(),
            findings: Vec::new(),
            fail_before_first_chunk: false,
        }
    }

    pub fn with_finding(mut self, _asset_id: impl Into<String>, title: impl Into<String>) -> Self {
        self.findings.push(ParsedFinding {
            title: title.into(),
            severity: Severity::Medium,
            confidence: 0.7,
            tags: vec![],
            stix_bundle: None,
            remediation: None,
            evidence: vec!["fake".into()],
        });
        self
    }

    pub fn failing_before_first_chunk(mut self) -> Self {
        self.fail_before_first_chunk = true;
        self
    }
}

impl Driver for FakeDriver {
    fn stream_report(
        &self,
        _context: String,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Result<ReportChunk, DriverError>>, DriverError>> + Send + '_>>
    {
        let fail = self.fail_before_first_chunk;
        let chunks = self.chunks.clone();
        Box::pin(async move {
            if fail {
                return Err(DriverError::Transport("fake dial failure".into()));
            }
            let (tx, rx) = mpsc::channel(chunks.len().max(1));
            for chunk in chunks {
                let _ = tx.send(Ok(ReportChunk { text: chunk, state: None })).await;
            }
            Ok(rx)
        })
    }

    fn extract_findings(&self, _report_text: &str, _observations: &[Observation]) -> Vec<ParsedFinding> {
        self.findings.clone()
    }

    fn summarize_report(&self, report_text: &str) -> String {
        report_text.chars().take(120).collect()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
