//! Error taxonomy for the ingest pipeline.
//!
//! Errors fall into two tiers. Fatal errors ([`ParseError`], [`BackendError`],
//! and the top-level [`PipelineError`] that carries them) terminate the run.
//! Recoverable conditions never cross a module boundary as an `Err`: a field
//! that fails coercion is dropped and counted, a record that cannot be
//! normalized surfaces as a counted [`TransformError`], and a document the
//! backend rejects is reported in its chunk's outcome list while the rest of
//! the chunk proceeds.

use thiserror::Error;

/// Fatal structural violation in source data.
///
/// A parser that hits one of these cannot safely continue: the grouping or
/// nesting assumptions the stream depends on no longer hold, so the remainder
/// of the stream is abandoned. The loader drains any chunk it already holds
/// before the error surfaces.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "format-xml")]
    #[error("malformed markup: {0}")]
    Markup(String),

    #[error("malformed delimited row {row}: {message}")]
    Delimited { row: u64, message: String },

    #[cfg(feature = "archive-zip")]
    #[error("archive entry {entry:?}: {message}")]
    Archive { entry: String, message: String },

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(feature = "format-xml")]
impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        ParseError::Markup(e.to_string())
    }
}

impl From<csv::Error> for ParseError {
    fn from(e: csv::Error) -> Self {
        let row = e.position().map_or(0, csv::Position::line);
        ParseError::Delimited {
            row,
            message: e.to_string(),
        }
    }
}

/// A record that could not be normalized into a document.
///
/// Recoverable at run scope: the pipeline counts it, logs the record hint,
/// and moves on to the next record.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("record {hint:?}: no usable natural key")]
    MissingKey { hint: String },

    #[error("record {hint:?}: {message}")]
    Invalid { hint: String, message: String },
}

impl TransformError {
    pub fn missing_key(hint: impl Into<String>) -> Self {
        TransformError::MissingKey { hint: hint.into() }
    }

    pub fn invalid(hint: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::Invalid {
            hint: hint.into(),
            message: message.into(),
        }
    }

    /// Best-effort identifier of the offending record, for failure reports.
    #[must_use]
    pub fn hint(&self) -> &str {
        match self {
            TransformError::MissingKey { hint } | TransformError::Invalid { hint, .. } => hint,
        }
    }
}

/// Backend-scoped failure. Always fatal to the run.
///
/// Per-document rejections are not `BackendError`s; adapters report those
/// inside the chunk's outcome list so the rest of the chunk is unaffected.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The target cannot be reached or a commit cannot proceed.
    Unavailable,
    /// The target does not exist and could not be created.
    TargetMissing,
    /// The backend refused the whole request.
    Rejected,
    InternalError,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    pub fn target_missing(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::TargetMissing, message)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Top-level failure of an ingest run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parse failure: {0}")]
    Parse(#[from] ParseError),

    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("worker pool failure: {0}")]
    Pool(String),
}
