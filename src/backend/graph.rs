//! Graph engine: node upserts with deferred edge resolution.
//!
//! Models loading into a property graph. Every document upserts a node;
//! edge intents are read from a configurable list field (default `links`)
//! whose entries are either bare target identifiers or objects of the form
//! `{"to": id, "label": name}`. An edge whose target node has not been
//! seen yet is held pending and materializes the moment the target
//! arrives, which makes load order irrelevant for forward references.
//! Pending state is scoped to the run: whatever is still unresolved at
//! [`finalize`](crate::backend::BackendAdapter::finalize) is dropped and
//! counted, and a reconnect clears it.
//!
//! Each [`write_chunk`](crate::backend::BackendAdapter::write_chunk) call
//! is one transaction, committed when the call returns.

use crate::backend::{BackendAdapter, TargetSpec, WriteOutcome};
use crate::chunk::Chunk;
use crate::document::{Document, DocumentId};
use crate::error::{BackendError, BackendResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// In-memory property graph with run-scoped pending edges.
#[derive(Debug)]
pub struct GraphBackend {
    target: Option<TargetSpec>,
    target_ready: bool,
    edge_field: String,
    nodes: HashMap<DocumentId, Document>,
    edges: HashSet<(DocumentId, DocumentId, String)>,
    pending: HashMap<DocumentId, Vec<(DocumentId, String)>>,
    dropped_pending: u64,
    transactions: u64,
}

impl Default for GraphBackend {
    fn default() -> Self {
        Self {
            target: None,
            target_ready: false,
            edge_field: "links".to_string(),
            nodes: HashMap::new(),
            edges: HashSet::new(),
            pending: HashMap::new(),
            dropped_pending: 0,
            transactions: 0,
        }
    }
}

impl GraphBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read edge intents from a different field. The field name doubles as
    /// the default edge label.
    #[must_use]
    pub fn with_edge_field(mut self, field: impl Into<String>) -> Self {
        self.edge_field = field.into();
        self
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Document> {
        self.nodes.get(&DocumentId::from(id))
    }

    #[must_use]
    pub fn has_edge(&self, from: &str, to: &str, label: &str) -> bool {
        self.edges.contains(&(
            DocumentId::from(from),
            DocumentId::from(to),
            label.to_string(),
        ))
    }

    /// Edges still waiting for their target node.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Pending edges dropped at the end of the run.
    #[must_use]
    pub fn dropped_pending(&self) -> u64 {
        self.dropped_pending
    }

    #[must_use]
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    fn require_target(&self) -> BackendResult<()> {
        match (&self.target, self.target_ready) {
            (Some(_), true) => Ok(()),
            (Some(target), false) => Err(BackendError::target_missing(format!(
                "graph {target} not created"
            ))),
            (None, _) => Err(BackendError::unavailable("not connected")),
        }
    }

    /// Edge intents declared by a document. Malformed entries are dropped
    /// individually, like any other bad field.
    fn edge_intents(&self, document: &Document) -> Vec<(DocumentId, String)> {
        let Some(value) = document.field(&self.edge_field) else {
            return Vec::new();
        };
        let items = match value {
            Value::Array(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        let mut intents = Vec::new();
        for item in items {
            match item {
                Value::String(to) => {
                    intents.push((DocumentId::from(to.as_str()), self.edge_field.clone()));
                }
                Value::Object(map) => match map.get("to").and_then(Value::as_str) {
                    Some(to) => {
                        let label = map
                            .get("label")
                            .and_then(Value::as_str)
                            .unwrap_or(&self.edge_field);
                        intents.push((DocumentId::from(to), label.to_string()));
                    }
                    None => {
                        debug!(node = %document.id(), "dropping edge intent without a target");
                    }
                },
                _ => {
                    debug!(node = %document.id(), "dropping malformed edge intent");
                }
            }
        }
        intents
    }

    fn upsert_node(&mut self, document: Document) {
        let id = document.id().clone();
        self.nodes.insert(id.clone(), document);
        // The new node may be the missing endpoint of earlier intents.
        if let Some(waiting) = self.pending.remove(&id) {
            for (from, label) in waiting {
                self.edges.insert((from, id.clone(), label));
            }
        }
    }

    fn record_edge(&mut self, from: DocumentId, to: DocumentId, label: String) {
        if self.nodes.contains_key(&to) {
            self.edges.insert((from, to, label));
        } else {
            self.pending.entry(to).or_default().push((from, label));
        }
    }
}

impl BackendAdapter for GraphBackend {
    fn name(&self) -> &str {
        "graph"
    }

    fn connect(&mut self, target: &TargetSpec) -> BackendResult<()> {
        self.target = Some(target.clone());
        self.target_ready = false;
        // Pending edges are run state, never store state.
        self.pending.clear();
        self.dropped_pending = 0;
        self.transactions = 0;
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
            let intents = self.edge_intents(&document);
            let from = document.id().clone();
            outcomes.push(WriteOutcome::ok(from.clone()));
            self.upsert_node(document);
            for (to, label) in intents {
                self.record_edge(from.clone(), to, label);
            }
        }
        self.transactions += 1;
        debug!(
            tx = self.transactions,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            pending = self.pending_len(),
            "graph transaction committed"
        );
        Ok(outcomes)
    }

    fn finalize(&mut self) -> BackendResult<()> {
        let dropped = self.pending_len() as u64;
        if dropped > 0 {
            self.dropped_pending += dropped;
            debug!(dropped, "dropped pending edges with no target node");
        }
        self.pending.clear();
        Ok(())
    }
}
