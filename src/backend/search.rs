//! Search-index engine: bulk writes land in an unrefreshed segment.
//!
//! Models the bulk path of a search cluster. Documents accepted by
//! [`write_chunk`](crate::backend::BackendAdapter::write_chunk) are staged
//! and stay invisible to queries until a refresh; [`flush`] performs the
//! refresh and [`finalize`] issues one last refresh so a finished run is
//! fully searchable. Field types are mapped dynamically from the first
//! value seen, and a later document whose field disagrees with the mapping
//! is rejected alone, the way a bulk item failure leaves the rest of the
//! request intact.
//!
//! [`flush`]: crate::backend::BackendAdapter::flush
//! [`finalize`]: crate::backend::BackendAdapter::finalize

use crate::backend::{BackendAdapter, TargetSpec, WriteOutcome};
use crate::chunk::Chunk;
use crate::document::{Document, DocumentId};
use crate::error::{BackendError, BackendResult};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Field type recorded by dynamic mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Number,
    String,
    Array,
    Object,
}

fn value_kind(value: &Value) -> Option<FieldKind> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(FieldKind::Bool),
        Value::Number(_) => Some(FieldKind::Number),
        Value::String(_) => Some(FieldKind::String),
        Value::Array(_) => Some(FieldKind::Array),
        Value::Object(_) => Some(FieldKind::Object),
    }
}

/// In-memory search index with staged-then-refreshed visibility.
#[derive(Debug, Default)]
pub struct SearchIndexBackend {
    target: Option<TargetSpec>,
    target_ready: bool,
    mapping: HashMap<String, FieldKind>,
    staged: Vec<Document>,
    live: HashMap<DocumentId, Document>,
    refreshes: u64,
}

impl SearchIndexBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents visible to queries, i.e. refreshed.
    #[must_use]
    pub fn searchable(&self) -> usize {
        self.live.len()
    }

    /// Documents written but not yet refreshed.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Fetch a refreshed document; staged documents are not found.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.live.get(&DocumentId::from(id))
    }

    /// The dynamically mapped type of a field, if any document fixed one.
    #[must_use]
    pub fn mapped_kind(&self, field: &str) -> Option<FieldKind> {
        self.mapping.get(field).copied()
    }

    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    fn require_target(&self) -> BackendResult<()> {
        match (&self.target, self.target_ready) {
            (Some(_), true) => Ok(()),
            (Some(target), false) => Err(BackendError::target_missing(format!(
                "index {target} not created"
            ))),
            (None, _) => Err(BackendError::unavailable("not connected")),
        }
    }

    /// Validate a document against the mapping. Returns the mappings the
    /// document would introduce; they are only committed if the whole
    /// document is accepted.
    fn check_mapping(&self, document: &Document) -> Result<Vec<(String, FieldKind)>, String> {
        let mut introduced = Vec::new();
        for (name, value) in document.fields() {
            let Some(kind) = value_kind(value) else {
                continue;
            };
            match self.mapping.get(name) {
                Some(mapped) if *mapped != kind => {
                    return Err(format!(
                        "field {name:?} is mapped as {mapped:?}, got {kind:?}"
                    ));
                }
                Some(_) => {}
                None => introduced.push((name.clone(), kind)),
            }
        }
        Ok(introduced)
    }
}

impl BackendAdapter for SearchIndexBackend {
    fn name(&self) -> &str {
        "search-index"
    }

    fn connect(&mut self, target: &TargetSpec) -> BackendResult<()> {
        // A staged segment left by an aborted run is discarded; refreshed
        // data is store state and survives.
        self.staged.clear();
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
        self.require_target()?;
        let mut outcomes = Vec::with_capacity(chunk.len());
        for document in chunk.into_documents() {
            match self.check_mapping(&document) {
                Ok(introduced) => {
                    self.mapping.extend(introduced);
                    outcomes.push(WriteOutcome::ok(document.id().clone()));
                    self.staged.push(document);
                }
                Err(reason) => {
                    outcomes.push(WriteOutcome::failed(document.id().clone(), reason));
                }
            }
        }
        Ok(outcomes)
    }

    fn flush(&mut self) -> BackendResult<()> {
        let made_visible = self.staged.len();
        // Last write wins for duplicate identifiers within a segment.
        self.live
            .extend(self.staged.drain(..).map(|d| (d.id().clone(), d)));
        self.refreshes += 1;
        debug!(made_visible, searchable = self.live.len(), "index refreshed");
        Ok(())
    }

    fn finalize(&mut self) -> BackendResult<()> {
        self.flush()
    }
}
