//! Optional transform worker pool.
//!
//! Parsing stays on one thread; transformation is the CPU-heavy stage
//! worth spreading. The reader thread pulls records off the source
//! iterator and feeds a bounded channel; workers pull from the shared
//! receiver, run the transformer, and push results to a second bounded
//! channel the caller's thread drains into the loader. Both channels hold
//! [`QUEUE_FACTOR`] items per worker, so a lagging stage stalls its
//! upstream instead of buffering without bound.
//!
//! A structural parse failure stops the reader, but everything it parsed
//! first is still delivered and loaded before the failure surfaces, the
//! same drain a sequential run performs. Workers may reorder documents
//! relative to the source stream; totals and final store state do not
//! depend on that order.

use crate::backend::BackendAdapter;
use crate::error::{ParseError, PipelineError};
use crate::loader::BulkLoader;
use crate::transform::RecordTransformer;
use crate::xref::CrossReferenceIndex;
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread;

/// Channel capacity per worker.
pub const QUEUE_FACTOR: usize = 10;

enum PoolItem {
    Document(crate::document::Document),
    TransformFailed(crate::error::TransformError),
    ParseFailed(ParseError),
}

/// Run the record stream through a pool of transform workers into the
/// loader.
///
/// Returns the structural parse failure, if one ended the stream, after
/// the drain has completed; the caller decides whether to abort or
/// finish the loader.
///
/// # Errors
///
/// Fails when a worker thread cannot be spawned or the backend rejects a
/// write mid-drain.
pub fn pooled_ingest<R, T, B>(
    records: impl Iterator<Item = Result<R, ParseError>> + Send,
    transformer: &T,
    xrefs: Option<&CrossReferenceIndex>,
    loader: &mut BulkLoader<'_, B>,
    workers: usize,
) -> Result<Option<ParseError>, PipelineError>
where
    R: Send,
    T: RecordTransformer<R> + ?Sized,
    B: BackendAdapter + ?Sized,
{
    let workers = workers.max(1);
    let queue = workers * QUEUE_FACTOR;

    thread::scope(|scope| {
        let (feed_tx, feed_rx) = sync_channel::<Result<R, ParseError>>(queue);
        let (out_tx, out_rx) = sync_channel::<PoolItem>(queue);
        let feed_rx = Arc::new(Mutex::new(feed_rx));

        thread::Builder::new()
            .name("ingest-reader".to_string())
            .spawn_scoped(scope, move || {
                for item in records {
                    let fatal = item.is_err();
                    if feed_tx.send(item).is_err() {
                        break; // workers exited early
                    }
                    if fatal {
                        break; // nothing follows a structural failure
                    }
                }
            })
            .map_err(|e| PipelineError::Pool(format!("spawn reader: {e}")))?;

        for index in 0..workers {
            let feed_rx = Arc::clone(&feed_rx);
            let out_tx = out_tx.clone();
            thread::Builder::new()
                .name(format!("transform-{index}"))
                .spawn_scoped(scope, move || {
                    loop {
                        let item = match feed_rx.lock().unwrap().recv() {
                            Ok(item) => item,
                            Err(_) => break, // reader finished
                        };
                        let out = match item {
                            Ok(record) => match transformer.transform(record, xrefs) {
                                Ok(document) => PoolItem::Document(document),
                                Err(error) => PoolItem::TransformFailed(error),
                            },
                            Err(error) => PoolItem::ParseFailed(error),
                        };
                        if out_tx.send(out).is_err() {
                            break; // consumer gone
                        }
                    }
                })
                .map_err(|e| PipelineError::Pool(format!("spawn worker: {e}")))?;
        }
        drop(out_tx); // this thread's copy

        let mut parse_error = None;
        for item in out_rx {
            match item {
                PoolItem::Document(document) => loader.accept(document)?,
                PoolItem::TransformFailed(error) => loader.fail_transform(&error),
                PoolItem::ParseFailed(error) => parse_error = Some(error),
            }
        }
        Ok(parse_error)
    })
}
