//! # Ironsilo
//!
//! A **streaming ingest and bulk loading toolkit** for oversized semi-structured
//! reference datasets. Ironsilo parses multi-gigabyte source files lazily,
//! normalizes records into canonical documents, and loads them into a store in
//! bounded chunks with controlled commit cadence, so memory stays flat no matter
//! how large the input grows.
//!
//! ## Key Features
//!
//! - **Lazy pull-based parsing** - records materialize one at a time, never the
//!   whole file
//! - **Nested markup sources** - extract every element subtree at a fixed depth
//!   (feature: `format-xml`)
//! - **Column-delimited sources** - group adjacent rows sharing a key into one
//!   logical record
//! - **Transparent decompression** - gzip, zstd, bzip2, and xz inputs detected
//!   by name or magic bytes
//! - **Zip archives** - recurse into archive entries, including per-entry
//!   compression (feature: `archive-zip`)
//! - **Cross-reference enrichment** - a TSV-built side index consulted during
//!   transformation
//! - **Chunked bulk loading** - record and byte bounds per chunk, flushes on a
//!   byte-driven commit window
//! - **Per-document outcomes** - one rejected document never poisons its chunk
//! - **Four store families** - search index, document store, relational table,
//!   property graph, behind one adapter trait
//! - **Optional worker pool** - parallel transformation with bounded queues and
//!   real backpressure
//!
//! ## Quick Start
//!
//! ```ignore
//! use ironsilo::*;
//! use ironsilo::source::markup::{open_markup, MarkupNode};
//!
//! # fn main() -> anyhow::Result<()> {
//! // Records are the element subtrees at depth 2 of a compressed dump.
//! let records = open_markup("catalog.xml.gz", 2)?;
//!
//! // One closure normalizes each record into a document.
//! let transformer = |node: MarkupNode, _: Option<&CrossReferenceIndex>| {
//!     let accession = node
//!         .child_text("accession")
//!         .ok_or_else(|| TransformError::missing_key(node.name.clone()))?;
//!     Ok(DocumentBuilder::new(accession)
//!         .opt_field("name", node.child_text("name"))
//!         .build())
//! };
//!
//! // Load into a search index under the default bounds.
//! let mut backend = SearchIndexBackend::new();
//! let report = run_sequential(
//!     records,
//!     &transformer,
//!     None,
//!     &mut backend,
//!     &TargetSpec::new("catalog"),
//!     LoaderConfig::default(),
//! )?;
//! println!("wrote {} documents in {} chunks", report.written, report.chunks);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Sources
//!
//! A source is any iterator of `Result<R, ParseError>`. The built-in openers
//! produce them from files: [`open_markup`](source::markup::open_markup) for
//! nested markup, [`open_delimited`](source::delimited::open_delimited) for
//! key-grouped rows, [`open_archive`](source::archive::open_archive) for zip
//! archives. All of them read through
//! [`open_input`](source::open_input), which strips compression
//! transparently. Parsing is strict: a structural violation ends the stream
//! with the error rather than resynchronizing past it.
//!
//! ### Documents and Transformers
//!
//! A [`Document`] is a stable identifier plus a map of normalized fields. A
//! [`RecordTransformer`] turns one raw record into one document; plain
//! closures implement the trait. The contract is strict about three things:
//! identifiers are deterministic ([`stable_id`] helps for compound keys), a
//! field that fails coercion is dropped alone while the record survives, and
//! list-like fields always materialize as lists ([`ensure_list`]).
//!
//! ### Chunks and the Loader
//!
//! The [`BulkLoader`] assembles documents into [`Chunk`]s bounded by record
//! count and cumulative serialized bytes, dispatches each chunk as it closes,
//! and flushes the backend before any document that would push the bytes
//! since the last flush past the commit window. Oversize documents are
//! skipped with an outcome, not an error, and the run continues.
//!
//! ### Backends
//!
//! A [`BackendAdapter`] is driven through `connect`, `ensure_target`,
//! repeated `write_chunk` calls, `flush` at commit points, and one
//! `finalize`. The four embedded engines model the write-path semantics of
//! their store families; see the [`backend`] module for what staging,
//! visibility, and rejection mean to each.
//!
//! ### Cross-References
//!
//! A [`CrossReferenceIndex`] maps foreign identifiers to entries in other
//! datasets, built fully from TSV before the primary stream starts so
//! lookups during transformation are pure map reads.
//!
//! ## Feature Flags
//!
//! - `format-xml` - nested markup parsing via quick-xml
//! - `archive-zip` - zip archive recursion
//! - `compression-gzip` / `compression-zstd` / `compression-bzip2` /
//!   `compression-xz` - input codecs
//!
//! All of them are on by default; delimited parsing and the cross-reference
//! index are always available.
//!
//! ## Examples
//!
//! ### Grouped rows with cross-references
//!
//! ```ignore
//! use ironsilo::*;
//! use ironsilo::source::delimited::{open_delimited, RowGroup};
//!
//! # fn main() -> anyhow::Result<()> {
//! let xrefs = CrossReferenceIndex::from_path("mappings.tsv.gz", "legacy")?;
//! let groups = open_delimited("measurements.tsv")?;
//!
//! let transformer = |group: RowGroup, xrefs: Option<&CrossReferenceIndex>| {
//!     let mut builder = DocumentBuilder::new(group.key.as_str());
//!     if let Some(index) = xrefs {
//!         builder = builder.field("xrefs", index.lookup_value(&group.key));
//!     }
//!     Ok(builder.field("rows", group.len()).build())
//! };
//!
//! let mut backend = RelationalBackend::new();
//! let report = run_sequential(
//!     groups,
//!     &transformer,
//!     Some(&xrefs),
//!     &mut backend,
//!     &TargetSpec::new("measurements"),
//!     LoaderConfig::default().with_max_records(1000),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Recursing into an archive
//!
//! ```ignore
//! use ironsilo::*;
//! use ironsilo::source::archive::{open_archive, EntryRecords};
//! use ironsilo::source::markup::MarkupRecords;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Parse every markup entry of the archive; skip everything else.
//! let records = open_archive("bundle.zip", |name, reader| {
//!     name.ends_with(".xml").then(|| {
//!         Box::new(MarkupRecords::new(reader, 2)) as EntryRecords<_>
//!     })
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! An ingest run is a straight line:
//!
//! 1. A source iterator pulls records off the file one at a time
//! 2. The transformer normalizes each record, consulting the optional
//!    cross-reference index
//! 3. The loader assembles chunks under its bounds and dispatches them
//! 4. The backend reports per-document outcomes; flushes commit on the byte
//!    window
//! 5. [`finish`](BulkLoader::finish) flushes the remainder, finalizes the
//!    backend, and yields the [`LoadReport`]
//!
//! The pooled variant inserts a bounded worker stage between 1 and 3;
//! everything else is unchanged.
//!
//! ## Module Overview
//!
//! - [`source`] - input discovery, decompression, and the record parsers
//! - [`xref`] - the cross-reference side index
//! - [`document`] / [`transform`] - canonical documents and the transformer
//!   contract
//! - [`chunk`] / [`loader`] - bounded chunk assembly and the bulk loader
//! - [`backend`] - the adapter trait and the four store engines
//! - [`pipeline`] / [`pool`] - end-to-end runs, sequential and pooled
//! - [`session`] - run counters and the final report
//! - [`error`] - the failure taxonomy
//! - [`testing`] - fixture writers and a recording backend

pub mod backend;
pub mod chunk;
pub mod document;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod pool;
pub mod session;
pub mod source;
pub mod testing;
pub mod transform;
pub mod xref;

// General re-exports
pub use backend::{
    BackendAdapter, DocumentStoreBackend, GraphBackend, RelationalBackend, SearchIndexBackend,
    TargetSpec, WriteOutcome, WriteStatus,
};
pub use chunk::{Chunk, ChunkBuilder};
pub use document::{Document, DocumentBuilder, DocumentId};
pub use error::{BackendError, ParseError, PipelineError, TransformError};
pub use loader::{BulkLoader, LoaderConfig};
pub use pipeline::{run_pooled, run_sequential};
pub use session::{FailureDetail, LoadReport};
pub use source::{
    SourceFormat, discover_inputs, discover_inputs_required, open_input, sniff_format,
};
pub use transform::{RecordTransformer, ensure_list, normalize_lists, stable_id};
pub use xref::{CrossReferenceIndex, XrefEntry};

// Gated re-exports
#[cfg(feature = "format-xml")]
pub use source::markup::{MarkupNode, MarkupRecords, open_markup};

pub use source::delimited::{DelimitedOptions, RowGroup, RowGroups, open_delimited};

#[cfg(feature = "archive-zip")]
pub use source::archive::{ArchiveEntries, ArchiveRecords, open_archive};
