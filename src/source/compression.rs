//! Pluggable decompression for ingest inputs.
//!
//! Reference datasets arrive whole-file compressed (`dataset.xml.gz`) and as
//! archives whose entries are individually compressed. This module keeps the
//! rest of the source layer codec-agnostic: every input reader passes through
//! [`decompress_reader`], which wraps it with the matching codec or hands it
//! back untouched.
//!
//! ## Built-in codecs
//!
//! Enabled per feature flag:
//! - **Gzip** (`.gz`) via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) via `xz2` (feature: `compression-xz`)
//!
//! ## Detection
//!
//! The file name is checked first; when no extension matches, the first bytes
//! of the stream are compared against codec magic signatures. Name-first
//! keeps the common case free of header peeking, and magic-byte fallback
//! covers inputs that lost their extension in transit (a real occurrence in
//! mirrored dataset dumps).
//!
//! Custom codecs implement [`CompressionCodec`] and register via
//! [`register_codec`]; registered codecs participate in both detection paths
//! and in archive entry-name stripping ([`strip_codec_extension`]).

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Global codec registry.
static CODEC_REGISTRY: RwLock<Option<Vec<Arc<dyn CompressionCodec>>>> = RwLock::new(None);

fn builtin_codecs() -> Vec<Arc<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Arc::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Arc::new(XzCodec),
    ]
}

fn registry() -> Vec<Arc<dyn CompressionCodec>> {
    let mut lock = CODEC_REGISTRY.write().unwrap();
    lock.get_or_insert_with(builtin_codecs).clone()
}

/// Register a custom decompression codec globally.
///
/// Registered codecs are consulted by [`decompress_reader`] and
/// [`strip_codec_extension`] alongside the built-ins.
pub fn register_codec(codec: Arc<dyn CompressionCodec>) {
    let mut lock = CODEC_REGISTRY.write().unwrap();
    lock.get_or_insert_with(builtin_codecs).push(codec);
}

/// A decompression algorithm the source layer can detect and apply.
///
/// Implementations must be `Send + Sync`; they live in a global registry and
/// may be used from parser worker threads.
pub trait CompressionCodec: Send + Sync {
    /// Codec name used in error context (e.g. "gzip").
    fn name(&self) -> &str;

    /// File extensions for this codec, lowercase with the leading dot.
    fn extensions(&self) -> &[&str];

    /// Magic byte signature at stream start, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a raw reader with streaming decompression.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be constructed over the stream.
    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

fn detect_from_name(name: &str) -> Option<Arc<dyn CompressionCodec>> {
    let lower = name.to_lowercase();
    for codec in registry() {
        for ext in codec.extensions() {
            if lower.ends_with(ext) {
                return Some(codec);
            }
        }
    }
    None
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Arc<dyn CompressionCodec>> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    for codec in registry() {
        if let Some(magic) = codec.magic_bytes()
            && buf.len() >= magic.len()
            && buf.starts_with(magic)
        {
            return Some(codec);
        }
    }
    None
}

/// Strip one recognized codec extension from an entry or file name.
///
/// `data.xml.gz` becomes `data.xml`; names without a codec suffix pass
/// through unchanged. Used to choose the inner format of per-entry
/// compressed archive members.
#[must_use]
pub fn strip_codec_extension(name: &str) -> &str {
    let bytes = name.as_bytes();
    for codec in registry() {
        for ext in codec.extensions() {
            // Extensions are ASCII, so a case-insensitive byte match keeps
            // the cut on a char boundary.
            if bytes.len() >= ext.len()
                && bytes[bytes.len() - ext.len()..].eq_ignore_ascii_case(ext.as_bytes())
            {
                return &name[..name.len() - ext.len()];
            }
        }
    }
    name
}

/// Wrap a reader with the codec matching its name or content.
///
/// Detection order: name extension, then magic bytes, then pass-through.
/// With no compression features enabled this is a plain pass-through.
///
/// # Errors
///
/// Returns an error if a matched codec fails to construct its decoder.
pub fn decompress_reader<R: Read + 'static>(
    reader: R,
    name_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    let hint = name_hint.as_ref().to_string_lossy();
    if let Some(codec) = detect_from_name(&hint) {
        return codec
            .wrap_reader(Box::new(reader))
            .with_context(|| format!("wrap {hint:?} with {} decoder", codec.name()));
    }

    let mut buffered = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buffered) {
        return codec
            .wrap_reader(Box::new(buffered))
            .with_context(|| format!("wrap {hint:?} with {} decoder", codec.name()));
    }

    Ok(Box::new(buffered))
}

// ============================================================================
// Built-in codecs
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::GzDecoder;
        Ok(Box::new(GzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x42, 0x5a])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use bzip2::read::BzDecoder;
        Ok(Box::new(BzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use xz2::read::XzDecoder;
        Ok(Box::new(XzDecoder::new(reader)))
    }
}
