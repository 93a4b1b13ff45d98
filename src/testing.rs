//! Testing utilities for ingest pipelines.
//!
//! Everything a test needs to exercise a full run without standing up
//! infrastructure:
//!
//! - **Fixture writers**: drop source files (plain, compressed, zip
//!   archives) into a temporary directory
//! - **Sample data**: small markup, delimited, and cross-reference
//!   payloads with known shapes
//! - **[`RecordingBackend`]**: a store that remembers every chunk, flush,
//!   and finalize it sees, with injectable per-document rejections and
//!   chunk-level failures
//!
//! # Quick Start
//!
//! ```
//! use ironsilo::backend::BackendAdapter;
//! use ironsilo::backend::TargetSpec;
//! use ironsilo::testing::RecordingBackend;
//!
//! let mut backend = RecordingBackend::new();
//! backend.connect(&TargetSpec::new("scratch"))?;
//! backend.ensure_target()?;
//! assert_eq!(backend.chunk_record_counts(), &[] as &[usize]);
//! # Ok::<(), ironsilo::error::BackendError>(())
//! ```

pub mod backends;
pub mod fixtures;

pub use backends::*;
pub use fixtures::*;
