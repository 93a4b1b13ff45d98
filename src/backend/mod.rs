//! Store adapters and the contract the loader drives them through.
//!
//! One trait, four embedded engines. Each engine models the write-path
//! semantics of a store family rather than wrapping a network client, so
//! loading behavior (staging, visibility, per-document rejection) is
//! testable without infrastructure:
//!
//! * [`SearchIndexBackend`]: bulk writes staged invisible, a refresh makes
//!   them searchable.
//! * [`DocumentStoreBackend`]: writes durable immediately, flush is a
//!   no-op, secondary indexes built after the load.
//! * [`RelationalBackend`]: rows staged in an open transaction, flush
//!   commits.
//! * [`GraphBackend`]: per-chunk transactions, edges to unseen nodes held
//!   pending until the endpoint arrives.
//!
//! The loader calls the same sequence against all of them: `connect`,
//! `ensure_target`, then `write_chunk` per chunk with `flush` at commit
//! points and one `finalize` at the end of the run.

use crate::chunk::Chunk;
use crate::document::DocumentId;
use crate::error::BackendResult;
use std::fmt;

pub mod document;
pub mod graph;
pub mod relational;
pub mod search;

pub use document::DocumentStoreBackend;
pub use graph::GraphBackend;
pub use relational::RelationalBackend;
pub use search::{FieldKind, SearchIndexBackend};

// ============================================================================
// Target Addressing
// ============================================================================

/// Where a run lands: the target name plus an optional sub-scope.
///
/// The name addresses the store family's primary unit (index, table, graph);
/// `collection` narrows it where the family has a second level, like a
/// document-store collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    name: String,
    collection: Option<String>,
}

impl TargetSpec {
    /// Create a target addressed by name alone.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: None,
        }
    }

    /// Narrow the target to a named collection within it.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(collection) => write!(f, "{}/{}", self.name, collection),
            None => write!(f, "{}", self.name),
        }
    }
}

// ============================================================================
// Per-Document Outcomes
// ============================================================================

/// What happened to one document inside a chunk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    /// Accepted by the store.
    Ok,
    /// Rejected individually; the rest of the chunk was unaffected.
    Failed(String),
    /// Never sent: the document exceeded the single-document cap.
    SkippedTooLarge { size: usize, cap: usize },
}

impl WriteStatus {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::SkippedTooLarge { size, cap } => {
                write!(f, "skipped: too large ({size} bytes, cap {cap})")
            }
        }
    }
}

/// One document's identity paired with its [`WriteStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub id: DocumentId,
    pub status: WriteStatus,
}

impl WriteOutcome {
    #[must_use]
    pub fn ok(id: DocumentId) -> Self {
        Self {
            id,
            status: WriteStatus::Ok,
        }
    }

    #[must_use]
    pub fn failed(id: DocumentId, reason: impl Into<String>) -> Self {
        Self {
            id,
            status: WriteStatus::Failed(reason.into()),
        }
    }

    #[must_use]
    pub fn skipped_too_large(id: DocumentId, size: usize, cap: usize) -> Self {
        Self {
            id,
            status: WriteStatus::SkippedTooLarge { size, cap },
        }
    }
}

// ============================================================================
// The Adapter Contract
// ============================================================================

/// Write-path contract every store family implements.
///
/// Writes are upserts keyed on the document identifier, so re-running a
/// load converges instead of duplicating. A document rejected inside a
/// chunk surfaces as a [`WriteOutcome`] and never poisons its neighbors;
/// an `Err` from any method means the backend itself is unusable and the
/// run should stop.
pub trait BackendAdapter: Send {
    /// Short family name for logs ("search-index", "graph", ...).
    fn name(&self) -> &str;

    /// Bind the adapter to a target and reset any per-run state.
    ///
    /// # Errors
    ///
    /// Fails when the store is unreachable or refuses the session.
    fn connect(&mut self, target: &TargetSpec) -> BackendResult<()>;

    /// Create the target if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails when called before [`connect`](Self::connect) or when the
    /// store cannot create the target.
    fn ensure_target(&mut self) -> BackendResult<()>;

    /// Write one chunk, returning exactly one outcome per document in
    /// chunk order.
    ///
    /// # Errors
    ///
    /// Fails only for chunk-level breakage (lost connection, aborted
    /// transaction). Per-document rejections are outcomes, not errors.
    fn write_chunk(&mut self, chunk: Chunk) -> BackendResult<Vec<WriteOutcome>>;

    /// Make writes since the last flush durable or visible, per the store
    /// family's semantics. Default is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot complete the commit or refresh.
    fn flush(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// End-of-run hook: build deferred indexes, resolve or drop pending
    /// state. Default is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when post-load work cannot complete.
    fn finalize(&mut self) -> BackendResult<()> {
        Ok(())
    }
}
