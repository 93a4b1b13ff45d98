//! Recursion into zip archives.
//!
//! Multi-file datasets arrive as one archive wrapping many markup or
//! delimited members, each optionally compressed again on its own
//! (`entries/part-07.xml.gz`). [`ArchiveRecords`] walks entries in archive
//! order, skips directory-only entries, and flattens every member's records
//! into one lazy stream.
//!
//! A zip member only exposes a reader borrowed from the open archive, so
//! each entry is spooled to an anonymous temp file before parsing. The inner
//! parser then owns its reader, and memory stays bounded no matter how large
//! a single member inflates.

use crate::error::ParseError;
use crate::source::compression::{decompress_reader, strip_codec_extension};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use zip::ZipArchive;

/// One non-directory archive member, spooled and ready to read.
#[derive(Debug)]
pub struct ArchiveEntry {
    name: String,
    spool: File,
}

impl ArchiveEntry {
    /// Full entry name as stored in the archive.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry name with a recognized codec extension stripped, the name to
    /// sniff the inner format from.
    #[must_use]
    pub fn inner_name(&self) -> &str {
        strip_codec_extension(&self.name)
    }

    /// Consume the entry, applying per-entry decompression.
    ///
    /// # Errors
    ///
    /// Returns an error if a matched codec fails to wrap the spooled bytes.
    pub fn into_reader(self) -> Result<BufReader<Box<dyn Read>>, ParseError> {
        let name = self.name;
        let reader = decompress_reader(self.spool, &name).map_err(|e| ParseError::Archive {
            entry: name,
            message: format!("{e:#}"),
        })?;
        Ok(BufReader::new(reader))
    }
}

/// Iterator over an archive's non-directory entries, in archive order.
pub struct ArchiveEntries {
    archive: ZipArchive<File>,
    index: usize,
}

impl ArchiveEntries {
    /// Open an archive file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a readable
    /// archive.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("open archive {}", path.display()))?;
        let archive = ZipArchive::new(file)
            .with_context(|| format!("read archive directory of {}", path.display()))?;
        Ok(ArchiveEntries { archive, index: 0 })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, ParseError> {
        while self.index < self.archive.len() {
            let i = self.index;
            self.index += 1;
            let mut member = self.archive.by_index(i).map_err(|e| ParseError::Archive {
                entry: format!("#{i}"),
                message: e.to_string(),
            })?;
            if member.is_dir() {
                continue;
            }
            let name = member.name().to_string();
            let mut spool = tempfile::tempfile().map_err(|e| ParseError::Archive {
                entry: name.clone(),
                message: format!("spool temp file: {e}"),
            })?;
            io::copy(&mut member, &mut spool).map_err(|e| ParseError::Archive {
                entry: name.clone(),
                message: format!("spool entry: {e}"),
            })?;
            spool.seek(SeekFrom::Start(0)).map_err(|e| ParseError::Archive {
                entry: name.clone(),
                message: format!("rewind spool: {e}"),
            })?;
            return Ok(Some(ArchiveEntry { name, spool }));
        }
        Ok(None)
    }
}

impl Iterator for ArchiveEntries {
    type Item = Result<ArchiveEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// Boxed record iterator produced for one archive entry.
pub type EntryRecords<T> = Box<dyn Iterator<Item = Result<T, ParseError>>>;

/// Lazy stream of records across every matching entry of an archive.
///
/// `open_entry` receives each member's codec-stripped name and its
/// decompressed reader, and returns the record iterator for that member, or
/// `None` to skip it (manifests, readme files). A fatal error in any member
/// aborts the remainder of the archive.
pub struct ArchiveRecords<T, F>
where
    F: FnMut(&str, BufReader<Box<dyn Read>>) -> Option<EntryRecords<T>>,
{
    entries: ArchiveEntries,
    open_entry: F,
    current: Option<EntryRecords<T>>,
    done: bool,
}

impl<T, F> ArchiveRecords<T, F>
where
    F: FnMut(&str, BufReader<Box<dyn Read>>) -> Option<EntryRecords<T>>,
{
    #[must_use]
    pub fn new(entries: ArchiveEntries, open_entry: F) -> Self {
        ArchiveRecords {
            entries,
            open_entry,
            current: None,
            done: false,
        }
    }
}

impl<T, F> Iterator for ArchiveRecords<T, F>
where
    F: FnMut(&str, BufReader<Box<dyn Read>>) -> Option<EntryRecords<T>>,
{
    type Item = Result<T, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(current) = &mut self.current {
                match current.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }
            match self.entries.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(entry)) => {
                    let inner_name = entry.inner_name().to_string();
                    let reader = match entry.into_reader() {
                        Ok(reader) => reader,
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    };
                    self.current = (self.open_entry)(&inner_name, reader);
                }
            }
        }
    }
}

/// Open an archive and flatten records across its entries.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened.
pub fn open_archive<T, F>(
    path: impl AsRef<Path>,
    open_entry: F,
) -> anyhow::Result<ArchiveRecords<T, F>>
where
    F: FnMut(&str, BufReader<Box<dyn Read>>) -> Option<EntryRecords<T>>,
{
    Ok(ArchiveRecords::new(ArchiveEntries::open(path)?, open_entry))
}
