//! Bounded batches of documents.
//!
//! A [`Chunk`] is the unit one backend request or transaction carries.
//! Assembly runs under two simultaneous bounds, record count and cumulative
//! serialized bytes: a pure record-count bound is insufficient because
//! individual source records vary in size by orders of magnitude.

use crate::document::Document;

/// A batch of documents dispatched together in one backend request.
#[derive(Debug)]
pub struct Chunk {
    documents: Vec<Document>,
    cumulative_bytes: usize,
}

impl Chunk {
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Sum of the serialized lengths of the documents in this chunk.
    #[must_use]
    pub fn cumulative_bytes(&self) -> usize {
        self.cumulative_bytes
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }
}

impl<'a> IntoIterator for &'a Chunk {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

/// Assembles chunks under the record-count and byte bounds.
///
/// `try_push` hands the document back instead of breaching a bound; the
/// caller dispatches the chunk under assembly and pushes again. An empty
/// builder accepts any single document so an oversized one cannot wedge the
/// assembly loop; the loader's oversize cap keeps such documents out of the
/// stream in the first place.
#[derive(Debug)]
pub struct ChunkBuilder {
    max_records: usize,
    max_bytes: usize,
    documents: Vec<Document>,
    bytes: usize,
}

impl ChunkBuilder {
    /// # Panics
    ///
    /// Panics if `max_records` is zero.
    #[must_use]
    pub fn new(max_records: usize, max_bytes: usize) -> Self {
        assert!(max_records > 0, "max_records must be positive");
        ChunkBuilder {
            max_records,
            max_bytes,
            documents: Vec::new(),
            bytes: 0,
        }
    }

    /// Add a document unless doing so would breach a bound.
    ///
    /// # Errors
    ///
    /// Returns the document back when the chunk under assembly is already at
    /// its record bound, or when the document's bytes would push a non-empty
    /// chunk past the byte bound.
    pub fn try_push(&mut self, document: Document) -> Result<(), Document> {
        if self.documents.len() >= self.max_records {
            return Err(document);
        }
        let len = document.serialized_len();
        if !self.documents.is_empty() && self.bytes + len > self.max_bytes {
            return Err(document);
        }
        self.bytes += len;
        self.documents.push(document);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Serialized bytes accepted since the last take.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.documents.len() >= self.max_records || self.bytes >= self.max_bytes
    }

    /// Close the chunk under assembly and reset for the next one.
    ///
    /// Returns `None` when nothing has been accepted since the last take.
    pub fn take(&mut self) -> Option<Chunk> {
        if self.documents.is_empty() {
            return None;
        }
        let chunk = Chunk {
            documents: std::mem::take(&mut self.documents),
            cumulative_bytes: self.bytes,
        };
        self.bytes = 0;
        Some(chunk)
    }
}
