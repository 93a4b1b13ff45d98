//! The bulk loader: chunk assembly, commit cadence, and run accounting.
//!
//! One [`BulkLoader`] drives one run against one backend. Documents go in
//! through [`accept`](BulkLoader::accept); the loader assembles chunks
//! under the configured record and byte bounds, dispatches each chunk as
//! it closes, and flushes the backend whenever accepting the next document
//! would push the bytes since the last flush past the commit window. The
//! flush happens before the document is accepted, so the window bound
//! holds at all times rather than on average.
//!
//! Oversize documents are turned away at the door with a
//! `skipped: too large` outcome and never reach the backend. The single
//! byte knob [`LoaderConfig::max_bytes`] bounds both one chunk and the
//! commit window, and the oversize cap is clamped to it, so no accepted
//! document can breach either bound on its own.

use crate::backend::{BackendAdapter, TargetSpec, WriteOutcome};
use crate::chunk::{Chunk, ChunkBuilder};
use crate::document::Document;
use crate::error::{BackendResult, TransformError};
use crate::session::{LoadReport, LoadSession};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_RECORDS: usize = 500;
pub const DEFAULT_MAX_BYTES: usize = 32 * 1024 * 1024;
pub const DEFAULT_OVERSIZE_LIMIT: usize = 8 * 1024 * 1024;
pub const DEFAULT_PROGRESS_EVERY: u64 = 10_000;

/// Tuning for a load run.
///
/// `workers` of zero lets the pooled pipeline pick a count from the
/// machine; the sequential pipeline ignores it.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Most documents one chunk may carry.
    pub max_records: usize,
    /// Most cumulative serialized bytes one chunk, and one commit window,
    /// may carry.
    pub max_bytes: usize,
    /// Single-document size cap; clamped to `max_bytes` when applied.
    pub oversize_limit: usize,
    /// Transform worker threads for the pooled pipeline; 0 picks a default.
    pub workers: usize,
    /// Emit a progress log every this many records; 0 disables.
    pub progress_every: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            max_bytes: DEFAULT_MAX_BYTES,
            oversize_limit: DEFAULT_OVERSIZE_LIMIT,
            workers: 0,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl LoaderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_oversize_limit(mut self, oversize_limit: usize) -> Self {
        self.oversize_limit = oversize_limit;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        self.progress_every = progress_every;
        self
    }

    /// The oversize cap as applied: never looser than the chunk byte bound.
    #[must_use]
    pub fn oversize_cap(&self) -> usize {
        self.oversize_limit.min(self.max_bytes)
    }

    /// Worker count for the pooled pipeline, resolving 0 to a machine
    /// default.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().clamp(1, 8)
        } else {
            self.workers
        }
    }
}

/// Drives one load run against one backend.
pub struct BulkLoader<'a, B: BackendAdapter + ?Sized> {
    backend: &'a mut B,
    config: LoaderConfig,
    builder: ChunkBuilder,
    since_flush: usize,
    session: LoadSession,
}

impl<'a, B: BackendAdapter + ?Sized> BulkLoader<'a, B> {
    /// Connect the backend to `target`, create the target if needed, and
    /// start a session.
    ///
    /// # Errors
    ///
    /// Fails when the backend refuses the connection or cannot create the
    /// target.
    pub fn new(
        backend: &'a mut B,
        target: &TargetSpec,
        config: LoaderConfig,
    ) -> BackendResult<Self> {
        backend.connect(target)?;
        backend.ensure_target()?;
        info!(backend = backend.name(), %target, "load session opened");
        let builder = ChunkBuilder::new(config.max_records, config.max_bytes);
        let session = LoadSession::new(config.progress_every);
        Ok(Self {
            backend,
            config,
            builder,
            since_flush: 0,
            session,
        })
    }

    /// Documents waiting in the chunk under assembly.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.builder.len()
    }

    /// Take one document into the run.
    ///
    /// Oversize documents are recorded as skipped and consume no backend
    /// I/O. For everything else this dispatches and flushes as the bounds
    /// require, so any call may carry the cost of a backend round trip.
    ///
    /// # Errors
    ///
    /// Fails when the backend rejects a chunk write or a flush, which ends
    /// the run.
    pub fn accept(&mut self, document: Document) -> BackendResult<()> {
        self.session.record_seen();
        let len = document.serialized_len();
        let cap = self.config.oversize_cap();
        if len > cap {
            warn!(id = %document.id(), size = len, cap, "document skipped: too large");
            let outcome = WriteOutcome::skipped_too_large(document.id().clone(), len, cap);
            self.session.record_outcomes(&[outcome]);
            return Ok(());
        }
        // Flush-before-accept: commit what is pending rather than let the
        // window grow past the bound.
        if self.since_flush + self.builder.bytes() + len > self.config.max_bytes {
            self.dispatch_pending()?;
            self.flush_backend()?;
        }
        let mut document = document;
        loop {
            match self.builder.try_push(document) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    // Record bound reached; an empty builder accepts any
                    // document, so this loop runs at most twice.
                    self.dispatch_pending()?;
                    document = returned;
                }
            }
        }
    }

    /// Count a record the transformer rejected. The record is gone; the
    /// run continues.
    pub fn fail_transform(&mut self, error: &TransformError) {
        self.session.record_seen();
        self.session.record_transform_failure();
        debug!(%error, "record dropped by transformer");
    }

    /// Dispatch the remainder, flush, run backend finalization, and
    /// produce the report.
    ///
    /// # Errors
    ///
    /// Fails when the backend rejects the final writes, flush, or
    /// finalization.
    pub fn finish(mut self) -> BackendResult<LoadReport> {
        self.dispatch_pending()?;
        self.flush_backend()?;
        self.backend.finalize()?;
        let report = self.session.finish();
        info!(
            records = report.records,
            written = report.written,
            failed = report.failed,
            oversize = report.oversize,
            transform_failures = report.transform_failures,
            chunks = report.chunks,
            flushes = report.flushes,
            elapsed_ms = report.elapsed_ms,
            "load finished"
        );
        Ok(report)
    }

    /// End the run early, keeping what was already parsed.
    ///
    /// The chunk under assembly is dispatched and flushed best-effort so a
    /// mid-stream failure does not discard work that already cleared the
    /// parser. Backend finalization is skipped; the run did not complete.
    #[must_use]
    pub fn abort(mut self) -> LoadReport {
        if let Err(error) = self.drain() {
            warn!(%error, "backend refused the drain during abort");
        }
        let report = self.session.finish();
        warn!(
            records = report.records,
            written = report.written,
            "load aborted"
        );
        report
    }

    fn drain(&mut self) -> BackendResult<()> {
        self.dispatch_pending()?;
        self.flush_backend()
    }

    fn dispatch_pending(&mut self) -> BackendResult<()> {
        let Some(chunk) = self.builder.take() else {
            return Ok(());
        };
        self.dispatch(chunk)
    }

    fn dispatch(&mut self, chunk: Chunk) -> BackendResult<()> {
        let docs = chunk.len();
        let bytes = chunk.cumulative_bytes();
        self.session.record_chunk(bytes);
        self.since_flush += bytes;
        let outcomes = self.backend.write_chunk(chunk)?;
        self.session.record_outcomes(&outcomes);
        debug!(docs, bytes, "chunk dispatched");
        Ok(())
    }

    fn flush_backend(&mut self) -> BackendResult<()> {
        self.backend.flush()?;
        self.session.record_flush();
        self.since_flush = 0;
        Ok(())
    }
}
