//! A backend that records everything and fails on demand.

use crate::backend::{BackendAdapter, TargetSpec, WriteOutcome};
use crate::chunk::Chunk;
use crate::document::DocumentId;
use crate::error::{BackendError, BackendResult};
use std::collections::HashSet;

/// Store stand-in for loader and pipeline tests.
///
/// Accepts every document by default and keeps a full trace of the calls
/// it received. Rejections and chunk-level failures are opt-in:
/// [`with_failing_ids`](Self::with_failing_ids) turns specific documents
/// away individually, [`with_chunk_error_at`](Self::with_chunk_error_at)
/// makes one whole `write_chunk` call fail the way a lost connection
/// would.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    target: Option<TargetSpec>,
    target_ready: bool,
    fail_ids: HashSet<String>,
    chunk_error_at: Option<usize>,
    chunk_records: Vec<usize>,
    chunk_bytes: Vec<usize>,
    written: Vec<DocumentId>,
    flushes: usize,
    finalized: bool,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject these document identifiers individually.
    #[must_use]
    pub fn with_failing_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Fail the nth `write_chunk` call (1-based) outright.
    #[must_use]
    pub fn with_chunk_error_at(mut self, nth: usize) -> Self {
        self.chunk_error_at = Some(nth);
        self
    }

    /// Record counts of the chunks received, in order.
    #[must_use]
    pub fn chunk_record_counts(&self) -> &[usize] {
        &self.chunk_records
    }

    /// Cumulative byte sizes of the chunks received, in order.
    #[must_use]
    pub fn chunk_byte_sizes(&self) -> &[usize] {
        &self.chunk_bytes
    }

    /// Identifiers accepted, in arrival order.
    #[must_use]
    pub fn written(&self) -> &[DocumentId] {
        &self.written
    }

    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    #[must_use]
    pub fn finalized(&self) -> bool {
        self.finalized
    }

    #[must_use]
    pub fn target(&self) -> Option<&TargetSpec> {
        self.target.as_ref()
    }
}

impl BackendAdapter for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn connect(&mut self, target: &TargetSpec) -> BackendResult<()> {
        self.target = Some(target.clone());
        self.target_ready = false;
        Ok(())
    }

    fn ensure_target(&mut self) -> BackendResult<()> {
        if self.target.is_none() {
            return Err(BackendError::unavailable("not connected"));
        }
        self.target_ready = true;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: Chunk) -> BackendResult<Vec<WriteOutcome>> {
        if !self.target_ready {
            return Err(BackendError::unavailable("not connected"));
        }
        if self.chunk_error_at == Some(self.chunk_records.len() + 1) {
            return Err(BackendError::unavailable("injected chunk failure"));
        }
        self.chunk_records.push(chunk.len());
        self.chunk_bytes.push(chunk.cumulative_bytes());
        let mut outcomes = Vec::with_capacity(chunk.len());
        for document in chunk.into_documents() {
            if self.fail_ids.contains(document.id().as_str()) {
                outcomes.push(WriteOutcome::failed(
                    document.id().clone(),
                    "injected rejection",
                ));
            } else {
                self.written.push(document.id().clone());
                outcomes.push(WriteOutcome::ok(document.id().clone()));
            }
        }
        Ok(outcomes)
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.flushes += 1;
        Ok(())
    }

    fn finalize(&mut self) -> BackendResult<()> {
        self.finalized = true;
        Ok(())
    }
}
