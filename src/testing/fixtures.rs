//! Fixture writers and small sample payloads with known shapes.

use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(feature = "format-xml")]
use crate::document::Document;
#[cfg(feature = "format-xml")]
use crate::error::TransformError;
#[cfg(feature = "format-xml")]
use crate::source::markup::MarkupNode;
#[cfg(feature = "format-xml")]
use crate::xref::CrossReferenceIndex;

/// Write raw bytes to `dir/name` and return the path.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
///
/// # Example
///
/// ```
/// use ironsilo::testing::write_fixture;
///
/// let dir = tempfile::tempdir()?;
/// let path = write_fixture(dir.path(), "rows.tsv", b"a\tb\n")?;
/// assert!(path.ends_with("rows.tsv"));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut file = File::create(&path)?;
    file.write_all(bytes)?;
    Ok(path)
}

/// Write gzip-compressed bytes to `dir/name` and return the path.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
#[cfg(feature = "compression-gzip")]
pub fn write_gzip_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let path = dir.join(name);
    let file = File::create(&path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(path)
}

/// Write a zip archive to `dir/name` and return the path.
///
/// Entry names ending in `/` become directory entries.
///
/// # Errors
///
/// Returns an error if the archive cannot be created or written.
#[cfg(feature = "archive-zip")]
pub fn write_zip_fixture(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> Result<PathBuf> {
    use zip::write::{FileOptions, ZipWriter};

    let path = dir.join(name);
    let file = File::create(&path)?;
    let mut writer = ZipWriter::new(file);
    for (entry_name, bytes) in entries {
        if entry_name.ends_with('/') {
            writer.add_directory(entry_name.trim_end_matches('/'), FileOptions::default())?;
        } else {
            writer.start_file(*entry_name, FileOptions::default())?;
            writer.write_all(bytes)?;
        }
    }
    writer.finish()?;
    Ok(path)
}

/// A three-entry catalog in nested markup; records live at depth 2.
#[must_use]
pub fn sample_catalog_markup() -> &'static str {
    r#"<catalog>
  <entry revision="3">
    <accession>C001</accession>
    <name>alpha</name>
    <tag>soluble</tag>
    <tag>reviewed</tag>
  </entry>
  <entry revision="1">
    <accession>C002</accession>
    <name>beta</name>
    <tag>reviewed</tag>
  </entry>
  <entry revision="2">
    <accession>C003</accession>
    <name>gamma</name>
  </entry>
</catalog>
"#
}

/// Column-delimited rows for the same catalog, pre-grouped by accession:
/// two rows for C001, one for C002, three for C003.
#[must_use]
pub fn sample_sequence_rows() -> &'static str {
    "C001\twidth\t12\n\
     C001\theight\t7\n\
     C002\twidth\t30\n\
     C003\twidth\t5\n\
     C003\theight\t9\n\
     C003\tdepth\t2\n"
}

/// Cross-reference rows: C001 has two namespaced keys, C002 one key with
/// no namespace separator.
#[must_use]
pub fn sample_xref_rows() -> &'static str {
    "pdb:1ABC\tC001\tstructure\txray\n\
     kegg:K00001\tC001\n\
     LEGACY-7\tC002\timported\n"
}

/// Transformer for [`sample_catalog_markup`] records.
///
/// The accession is the identifier; `revision` is coerced to an integer
/// and dropped when malformed; `tags` is always a list; `xrefs` is
/// attached when an index is supplied.
#[cfg(feature = "format-xml")]
pub fn catalog_transformer()
-> impl Fn(MarkupNode, Option<&CrossReferenceIndex>) -> Result<Document, TransformError>
+ Send
+ Sync {
    |node: MarkupNode, xrefs: Option<&CrossReferenceIndex>| {
        let accession = node
            .child_text("accession")
            .ok_or_else(|| TransformError::missing_key(node.name.clone()))?
            .to_string();
        let tags: Vec<serde_json::Value> = node
            .children_named("tag")
            .map(|tag| serde_json::Value::from(tag.text.trim()))
            .collect();
        let revision = node
            .attribute("revision")
            .and_then(|raw| crate::transform::coerce_integer("revision", raw));
        let document = crate::document::DocumentBuilder::new(accession.as_str())
            .opt_field("name", node.child_text("name"))
            .opt_field("revision", revision)
            .field("tags", tags)
            .opt_field("xrefs", xrefs.map(|index| index.lookup_value(&accession)))
            .build();
        Ok(document)
    }
}
