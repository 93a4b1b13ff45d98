//! Run accounting: live counters while a load runs and the report it
//! leaves behind.
//!
//! A [`LoadSession`] is owned by the loader and fed as records move
//! through; [`finish`](LoadSession::finish) freezes it into a
//! [`LoadReport`]. The report serializes cleanly, so callers can log it,
//! ship it, or assert on it in tests.

use crate::backend::{WriteOutcome, WriteStatus};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// One document that did not make it, with the reason it was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub id: String,
    pub reason: String,
}

/// Summary of a finished run.
///
/// `bytes` counts the serialized size of every document dispatched to the
/// backend, whether or not the store accepted it; oversize documents are
/// never dispatched and do not count.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub records: u64,
    pub written: u64,
    pub failed: u64,
    pub oversize: u64,
    pub transform_failures: u64,
    pub bytes: u64,
    pub chunks: u64,
    pub flushes: u64,
    pub elapsed_ms: u64,
    pub failures: Vec<FailureDetail>,
}

impl LoadReport {
    /// The report as a JSON value, for logging or persistence.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Mutable counters for a run in progress.
#[derive(Debug)]
pub struct LoadSession {
    started: Instant,
    progress_every: u64,
    records: u64,
    written: u64,
    failed: u64,
    oversize: u64,
    transform_failures: u64,
    bytes: u64,
    chunks: u64,
    flushes: u64,
    failures: Vec<FailureDetail>,
}

impl LoadSession {
    /// Start the clock. `progress_every` of zero disables progress logs.
    #[must_use]
    pub fn new(progress_every: u64) -> Self {
        Self {
            started: Instant::now(),
            progress_every,
            records: 0,
            written: 0,
            failed: 0,
            oversize: 0,
            transform_failures: 0,
            bytes: 0,
            chunks: 0,
            flushes: 0,
            failures: Vec::new(),
        }
    }

    /// Count one raw record off the source stream.
    pub fn record_seen(&mut self) {
        self.records += 1;
        if self.progress_every > 0 && self.records % self.progress_every == 0 {
            info!(
                records = self.records,
                written = self.written,
                failed = self.failed,
                "ingest progress"
            );
        }
    }

    /// Count a record the transformer could not turn into a document.
    pub fn record_transform_failure(&mut self) {
        self.transform_failures += 1;
    }

    /// Count a chunk handed to the backend.
    pub fn record_chunk(&mut self, bytes: usize) {
        self.chunks += 1;
        self.bytes += bytes as u64;
    }

    /// Count a backend flush.
    pub fn record_flush(&mut self) {
        self.flushes += 1;
    }

    /// Fold per-document outcomes into the totals, keeping the detail of
    /// every non-accepted document.
    pub fn record_outcomes(&mut self, outcomes: &[WriteOutcome]) {
        for outcome in outcomes {
            match &outcome.status {
                WriteStatus::Ok => self.written += 1,
                WriteStatus::Failed(_) => {
                    self.failed += 1;
                    self.failures.push(FailureDetail {
                        id: outcome.id.as_str().to_string(),
                        reason: outcome.status.to_string(),
                    });
                }
                WriteStatus::SkippedTooLarge { .. } => {
                    self.oversize += 1;
                    self.failures.push(FailureDetail {
                        id: outcome.id.as_str().to_string(),
                        reason: outcome.status.to_string(),
                    });
                }
            }
        }
    }

    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Stop the clock and produce the report.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn finish(self) -> LoadReport {
        LoadReport {
            records: self.records,
            written: self.written,
            failed: self.failed,
            oversize: self.oversize,
            transform_failures: self.transform_failures,
            bytes: self.bytes,
            chunks: self.chunks,
            flushes: self.flushes,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            failures: self.failures,
        }
    }
}
