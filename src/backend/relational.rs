//! Relational engine: rows stage in an open transaction until commit.
//!
//! Models bulk insertion into a relational table. The column set is fixed
//! by the first document written; later documents carrying a column the
//! table does not have are rejected alone, while missing columns become
//! NULL. Nested values are stored as JSON text, the usual compromise when
//! flattening semi-structured data into rows.
//! [`flush`](crate::backend::BackendAdapter::flush) commits the open
//! transaction; rows not yet committed are invisible and are rolled back
//! by a reconnect.

use crate::backend::{BackendAdapter, TargetSpec, WriteOutcome};
use crate::chunk::Chunk;
use crate::document::{Document, DocumentId};
use crate::error::{BackendError, BackendResult};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

type Row = Vec<Option<String>>;

/// In-memory relational table with transactional commit.
#[derive(Debug, Default)]
pub struct RelationalBackend {
    target: Option<TargetSpec>,
    target_ready: bool,
    columns: Vec<String>,
    staged: Vec<(DocumentId, Row)>,
    committed: BTreeMap<DocumentId, Row>,
    commits: u64,
}

/// A field value rendered as a SQL cell. Scalars keep their text form,
/// nested structures serialize to JSON text.
fn cell_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            Some(serde_json::to_string(value).unwrap_or_default())
        }
    }
}

impl RelationalBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Column names, fixed by the first write. Empty before any write.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows visible after commit.
    #[must_use]
    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    /// Rows sitting in the open transaction.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// A committed cell by row identifier and column name.
    #[must_use]
    pub fn cell(&self, id: &str, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.committed
            .get(&DocumentId::from(id))?
            .get(index)?
            .as_deref()
    }

    fn require_target(&self) -> BackendResult<()> {
        match (&self.target, self.target_ready) {
            (Some(_), true) => Ok(()),
            (Some(target), false) => Err(BackendError::target_missing(format!(
                "table {target} not created"
            ))),
            (None, _) => Err(BackendError::unavailable("not connected")),
        }
    }

    /// Bind a document to the table's columns. The first document fixes
    /// the schema: `id` plus its field names.
    fn bind_row(&mut self, document: &Document) -> Result<Row, String> {
        if self.columns.is_empty() {
            self.columns.push("id".to_string());
            self.columns
                .extend(document.fields().keys().cloned());
        }
        for name in document.fields().keys() {
            if !self.columns.iter().any(|c| c == name) {
                return Err(format!("unknown column {name:?}"));
            }
        }
        let mut row = Row::with_capacity(self.columns.len());
        row.push(Some(document.id().as_str().to_string()));
        for column in &self.columns[1..] {
            row.push(document.field(column).and_then(cell_value));
        }
        Ok(row)
    }
}

impl BackendAdapter for RelationalBackend {
    fn name(&self) -> &str {
        "relational"
    }

    fn connect(&mut self, target: &TargetSpec) -> BackendResult<()> {
        // Reconnecting rolls back whatever the previous session left open.
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
            match self.bind_row(&document) {
                Ok(row) => {
                    outcomes.push(WriteOutcome::ok(document.id().clone()));
                    self.staged.push((document.id().clone(), row));
                }
                Err(reason) => {
                    outcomes.push(WriteOutcome::failed(document.id().clone(), reason));
                }
            }
        }
        Ok(outcomes)
    }

    fn flush(&mut self) -> BackendResult<()> {
        let rows = self.staged.len();
        // Upsert on primary key: a re-inserted row replaces the old one.
        self.committed.extend(self.staged.drain(..));
        self.commits += 1;
        debug!(rows, total = self.committed.len(), "transaction committed");
        Ok(())
    }

    fn finalize(&mut self) -> BackendResult<()> {
        self.flush()
    }
}
