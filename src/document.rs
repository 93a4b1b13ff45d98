//! Canonical documents and their identifiers.
//!
//! A [`Document`] is the unit every backend adapter understands: a stable
//! identifier derived from the source record's natural key plus a map of
//! normalized fields. Documents are immutable once constructed, and their
//! serialized size is computed exactly once so chunking and oversize checks
//! never re-serialize.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Stable identifier of a [`Document`].
///
/// Identifiers are a deterministic function of the source natural key, which
/// is what makes re-ingestion idempotent: the same source data always maps to
/// the same identifier, so a rerun overwrites rather than duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        DocumentId(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        DocumentId(id)
    }
}

/// Canonical unit handed to a backend adapter.
///
/// Field values are JSON values; list-valued fields are normalized at
/// transform time so consumers never branch on "list or scalar". The cached
/// serialized length is the byte length of the JSON encoding of the field
/// map, and is what chunk byte bounds and the oversize cap measure.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    id: DocumentId,
    fields: Map<String, Value>,
    #[serde(skip)]
    serialized_len: usize,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, fields: Map<String, Value>) -> Self {
        let serialized_len = serde_json::to_vec(&fields).map_or(0, |buf| buf.len());
        Document {
            id: id.into(),
            fields,
            serialized_len,
        }
    }

    #[must_use]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Byte length of the serialized field map, computed at construction.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        self.serialized_len
    }

    /// The field map as a JSON object value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_parts(self) -> (DocumentId, Map<String, Value>) {
        (self.id, self.fields)
    }
}

/// Incremental construction of a [`Document`].
///
/// `opt_field` pairs with the coercion helpers: a field that failed coercion
/// arrives as `None` and is silently omitted, which is exactly the
/// drop-the-field-keep-the-record contract.
#[derive(Debug)]
pub struct DocumentBuilder {
    id: DocumentId,
    fields: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        DocumentBuilder {
            id: id.into(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn opt_field<V: Into<Value>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.fields.insert(name.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Document {
        Document::new(self.id, self.fields)
    }
}
