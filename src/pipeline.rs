//! End-to-end ingest runs: records in, a [`LoadReport`] out.
//!
//! Both entry points consume a fallible record stream, apply one
//! transformer, and drive one backend through a [`BulkLoader`]. The
//! sequential form does everything on the calling thread. The pooled form
//! moves transformation onto worker threads via
//! [`pooled_ingest`](crate::pool::pooled_ingest) while parsing and loading
//! stay single-threaded; the two forms produce the same totals and the
//! same final store state.
//!
//! A structural parse failure ends either run the same way: chunks formed
//! before the failure are dispatched and flushed, then the failure comes
//! back as [`PipelineError::Parse`].

use crate::backend::{BackendAdapter, TargetSpec};
use crate::error::{ParseError, PipelineError};
use crate::loader::{BulkLoader, LoaderConfig};
use crate::pool;
use crate::session::LoadReport;
use crate::transform::RecordTransformer;
use crate::xref::CrossReferenceIndex;
use tracing::warn;

/// Run an ingest on the calling thread.
///
/// # Errors
///
/// Returns [`PipelineError::Parse`] when the stream fails structurally,
/// after draining what already parsed, or [`PipelineError::Backend`] when
/// the backend becomes unusable.
pub fn run_sequential<R, T, B>(
    records: impl Iterator<Item = Result<R, ParseError>>,
    transformer: &T,
    xrefs: Option<&CrossReferenceIndex>,
    backend: &mut B,
    target: &TargetSpec,
    config: LoaderConfig,
) -> Result<LoadReport, PipelineError>
where
    T: RecordTransformer<R> + ?Sized,
    B: BackendAdapter + ?Sized,
{
    let mut loader = BulkLoader::new(backend, target, config)?;
    for item in records {
        match item {
            Ok(record) => match transformer.transform(record, xrefs) {
                Ok(document) => loader.accept(document)?,
                Err(error) => loader.fail_transform(&error),
            },
            Err(error) => {
                warn!(%error, "structural failure; draining formed chunks");
                let _ = loader.abort();
                return Err(PipelineError::Parse(error));
            }
        }
    }
    Ok(loader.finish()?)
}

/// Run an ingest with transformation spread over worker threads.
///
/// Worker count comes from [`LoaderConfig::effective_workers`]; parsing
/// order is preserved into the pool, document order out of it is not.
///
/// # Errors
///
/// Same contract as [`run_sequential`], plus [`PipelineError::Pool`] when
/// worker threads cannot be spawned.
pub fn run_pooled<R, T, B>(
    records: impl Iterator<Item = Result<R, ParseError>> + Send,
    transformer: &T,
    xrefs: Option<&CrossReferenceIndex>,
    backend: &mut B,
    target: &TargetSpec,
    config: LoaderConfig,
) -> Result<LoadReport, PipelineError>
where
    R: Send,
    T: RecordTransformer<R> + ?Sized,
    B: BackendAdapter + ?Sized,
{
    let workers = config.effective_workers();
    let mut loader = BulkLoader::new(backend, target, config)?;
    match pool::pooled_ingest(records, transformer, xrefs, &mut loader, workers)? {
        Some(error) => {
            warn!(%error, "structural failure; draining formed chunks");
            let _ = loader.abort();
            Err(PipelineError::Parse(error))
        }
        None => Ok(loader.finish()?),
    }
}
