//! Document-store engine: writes are durable the moment they are
//! acknowledged.
//!
//! Models a document database. There is no staging layer, so
//! [`flush`](crate::backend::BackendAdapter::flush) has nothing to commit
//! and is a no-op; the commit cadence of the loader only matters to stores
//! that stage. Field names are validated the way document stores restrict
//! them (no dots, no leading `$`, at any nesting level) and a violating
//! document is rejected alone. Secondary indexes over configured fields are
//! deferred to [`finalize`](crate::backend::BackendAdapter::finalize),
//! which is how bulk loads avoid paying index maintenance per write.

use crate::backend::{BackendAdapter, TargetSpec, WriteOutcome};
use crate::chunk::Chunk;
use crate::document::{Document, DocumentId};
use crate::error::{BackendError, BackendResult};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// In-memory document store with insert-or-replace writes and post-load
/// secondary indexes.
#[derive(Debug, Default)]
pub struct DocumentStoreBackend {
    target: Option<TargetSpec>,
    target_ready: bool,
    indexed_fields: Vec<String>,
    store: BTreeMap<DocumentId, Document>,
    indexes: HashMap<String, HashMap<String, Vec<DocumentId>>>,
}

/// Field names a document store refuses to persist.
fn invalid_field_name(fields: &serde_json::Map<String, Value>) -> Option<String> {
    for (name, value) in fields {
        if name.contains('.') || name.starts_with('$') {
            return Some(name.clone());
        }
        if let Value::Object(nested) = value
            && let Some(bad) = invalid_field_name(nested)
        {
            return Some(bad);
        }
    }
    None
}

/// Canonical index keys for a field value. Arrays index every element, the
/// multikey behavior document stores give list fields.
fn index_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar_key).collect(),
        other => vec![scalar_key(other)],
    }
}

fn scalar_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DocumentStoreBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the fields to build secondary indexes over at the end of
    /// the run.
    #[must_use]
    pub fn with_indexes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexed_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Documents currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.store.get(&DocumentId::from(id))
    }

    /// Whether [`finalize`](crate::backend::BackendAdapter::finalize) built
    /// an index over this field.
    #[must_use]
    pub fn index_built(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    /// Identifiers of documents whose indexed field carries this key.
    /// Empty when the index or key is absent.
    #[must_use]
    pub fn find_by(&self, field: &str, key: &str) -> &[DocumentId] {
        self.indexes
            .get(field)
            .and_then(|index| index.get(key))
            .map_or(&[], Vec::as_slice)
    }

    fn require_target(&self) -> BackendResult<()> {
        match (&self.target, self.target_ready) {
            (Some(_), true) => Ok(()),
            (Some(target), false) => Err(BackendError::target_missing(format!(
                "collection {target} not created"
            ))),
            (None, _) => Err(BackendError::unavailable("not connected")),
        }
    }
}

impl BackendAdapter for DocumentStoreBackend {
    fn name(&self) -> &str {
        "document-store"
    }

    fn connect(&mut self, target: &TargetSpec) -> BackendResult<()> {
        self.target = Some(target.clone());
        self.target_ready = false;
        // Indexes from a previous run go stale as soon as new writes land;
        // finalize rebuilds them from scratch.
        self.indexes.clear();
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
            if let Some(bad) = invalid_field_name(document.fields()) {
                outcomes.push(WriteOutcome::failed(
                    document.id().clone(),
                    format!("invalid field name {bad:?}"),
                ));
                continue;
            }
            outcomes.push(WriteOutcome::ok(document.id().clone()));
            self.store.insert(document.id().clone(), document);
        }
        Ok(outcomes)
    }

    fn flush(&mut self) -> BackendResult<()> {
        // Writes are durable on acknowledgment; nothing staged to commit.
        Ok(())
    }

    fn finalize(&mut self) -> BackendResult<()> {
        self.indexes.clear();
        for field in &self.indexed_fields {
            let mut index: HashMap<String, Vec<DocumentId>> = HashMap::new();
            for (id, document) in &self.store {
                let Some(value) = document.field(field) else {
                    continue;
                };
                for key in index_keys(value) {
                    index.entry(key).or_default().push(id.clone());
                }
            }
            debug!(field, keys = index.len(), "secondary index built");
            self.indexes.insert(field.clone(), index);
        }
        Ok(())
    }
}
