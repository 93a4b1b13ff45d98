//! Input discovery and structural parsers.
//!
//! Everything upstream of normalization lives here: glob-based discovery of
//! dataset files, transparent decompression ([`compression`]), and the
//! structural parsers. [`markup`] extracts depth-tagged XML records,
//! [`delimited`] groups key-sorted column files, and [`archive`] recurses
//! into zip containers wrapping either.
//!
//! All parsers yield `Result<Record, ParseError>` lazily; the consumer, not
//! the parser, decides how fast to pull.

pub mod compression;
pub mod delimited;

#[cfg(feature = "archive-zip")]
pub mod archive;
#[cfg(feature = "format-xml")]
pub mod markup;

use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Expand a glob pattern into a sorted list of input files.
///
/// Multi-file datasets enumerate identically across runs: matches are
/// filtered to plain files and sorted lexicographically.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched path cannot be
/// read. Zero matches is an empty vector, not an error.
pub fn discover_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths =
        glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.with_context(|| format!("read glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Stricter [`discover_inputs`] that treats zero matches as an error.
///
/// # Errors
///
/// Returns an error if the pattern is invalid, a matched path cannot be
/// read, or nothing matches.
pub fn discover_inputs_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let files = discover_inputs(pattern)?;
    if files.is_empty() {
        bail!("no input files match pattern: {pattern}");
    }
    Ok(files)
}

/// Open an input file, wrapping it with the matching decompression codec.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a matched codec fails
/// to construct its decoder.
pub fn open_input(path: impl AsRef<Path>) -> Result<BufReader<Box<dyn Read>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open input {}", path.display()))?;
    let reader = compression::decompress_reader(file, path)?;
    Ok(BufReader::new(reader))
}

/// Structural format guessed from a file or archive entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Markup,
    Delimited,
}

/// Guess the structural format from a name, after stripping any codec
/// extension. Unknown extensions yield `None`; callers decide whether to
/// skip or fail.
#[must_use]
pub fn sniff_format(name: &str) -> Option<SourceFormat> {
    let stripped = compression::strip_codec_extension(name);
    let ext = Path::new(stripped).extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "xml" => Some(SourceFormat::Markup),
        "csv" | "tsv" | "tab" | "txt" | "dat" => Some(SourceFormat::Delimited),
        _ => None,
    }
}
