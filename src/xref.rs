//! Cross-reference index for one-sided joins during normalization.
//!
//! Secondary delimited files map compound keys (`namespace:identifier`) to
//! foreign identifiers plus free-form metadata columns. The index inverts
//! that into `foreign id -> [entry, ...]`, preserving file order per key, so
//! transformers enrich each primary record with one hash lookup instead of
//! re-scanning the secondary file.
//!
//! The whole index is materialized before the first lookup. That is a
//! deliberate memory-for-simplicity trade: secondary files are bounded by
//! their own cardinality, while the primary stream is not.

use crate::error::ParseError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One row of the secondary file, keyed under its foreign identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XrefEntry {
    pub namespace: String,
    pub identifier: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,
}

impl XrefEntry {
    /// Render the entry as a JSON object for embedding in a document field.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("namespace".into(), Value::String(self.namespace.clone()));
        obj.insert("identifier".into(), Value::String(self.identifier.clone()));
        if !self.metadata.is_empty() {
            obj.insert(
                "metadata".into(),
                Value::Array(
                    self.metadata
                        .iter()
                        .map(|m| Value::String(m.clone()))
                        .collect(),
                ),
            );
        }
        Value::Object(obj)
    }
}

/// In-memory multi-map from foreign identifier to cross-reference entries.
///
/// Read-only after construction; built fully before the primary stream
/// starts and discarded at run end.
#[derive(Debug, Default)]
pub struct CrossReferenceIndex {
    entries: HashMap<String, Vec<XrefEntry>>,
    rows: usize,
}

impl CrossReferenceIndex {
    /// Build the index from tab-delimited rows.
    ///
    /// Each row is `namespace:identifier<TAB>foreign_id<TAB>metadata...`.
    /// A first field without the `:` separator is kept whole as the
    /// identifier under the sentinel namespace `dataset`.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`ParseError`] on IO failure or on a row without both
    /// a compound key and a foreign identifier.
    pub fn from_reader<R: Read>(reader: R, dataset: &str) -> Result<Self, ParseError> {
        Self::from_reader_with_delimiter(reader, dataset, b'\t')
    }

    /// Same as [`CrossReferenceIndex::from_reader`] with an explicit field
    /// delimiter.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`ParseError`] on IO failure or on a row without both
    /// a compound key and a foreign identifier.
    pub fn from_reader_with_delimiter<R: Read>(
        reader: R,
        dataset: &str,
        delimiter: u8,
    ) -> Result<Self, ParseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries: HashMap<String, Vec<XrefEntry>> = HashMap::new();
        let mut rows = 0usize;
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            if record.len() < 2 {
                return Err(ParseError::Delimited {
                    row: i as u64 + 1,
                    message: format!(
                        "expected compound key and foreign identifier, got {} field(s)",
                        record.len()
                    ),
                });
            }
            let (namespace, identifier) = match record[0].split_once(':') {
                Some((ns, id)) => (ns.to_string(), id.to_string()),
                None => (dataset.to_string(), record[0].to_string()),
            };
            let metadata = record.iter().skip(2).map(str::to_string).collect();
            entries
                .entry(record[1].to_string())
                .or_default()
                .push(XrefEntry {
                    namespace,
                    identifier,
                    metadata,
                });
            rows += 1;
        }

        let index = CrossReferenceIndex { entries, rows };
        info!(
            dataset,
            rows,
            keys = index.entries.len(),
            "cross-reference index built"
        );
        Ok(index)
    }

    /// Build the index from a file, decompressing transparently.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or fails to parse.
    pub fn from_path(path: impl AsRef<Path>, dataset: &str) -> anyhow::Result<Self> {
        let reader = crate::source::open_input(path)?;
        Ok(Self::from_reader(reader, dataset)?)
    }

    /// Entries recorded under a foreign identifier, in file order.
    ///
    /// An absent key yields `None`, never an error.
    #[must_use]
    pub fn lookup(&self, foreign_id: &str) -> Option<&[XrefEntry]> {
        self.entries.get(foreign_id).map(Vec::as_slice)
    }

    /// Entries for a foreign identifier rendered as a JSON array, for
    /// embedding in a document field. Absent keys yield an empty array.
    #[must_use]
    pub fn lookup_value(&self, foreign_id: &str) -> Value {
        match self.lookup(foreign_id) {
            Some(entries) => Value::Array(entries.iter().map(XrefEntry::to_value).collect()),
            None => Value::Array(Vec::new()),
        }
    }

    /// Total rows ingested from the secondary file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of distinct foreign identifiers.
    #[must_use]
    pub fn distinct_keys(&self) -> usize {
        self.entries.len()
    }
}
