//! Group-by-adjacent-key extraction from delimited text.
//!
//! Delimited reference files are pre-sorted by a key column; one logical
//! record spans every contiguous row sharing that key. [`RowGroups`] yields
//! one [`RowGroup`] per maximal run, holding only the run currently being
//! assembled. This is group-by-adjacent-key, not group-by-all-matching-key:
//! unsorted input produces multiple groups for the same logical key, which
//! is a caller error the parser does not correct.
//!
//! A row whose field count disagrees with the first row is a fatal
//! [`ParseError`]. Partial grouping after a structural violation cannot be
//! trusted, so the stream is abandoned rather than resynchronized.

use crate::error::ParseError;
use std::io::{BufReader, Read};
use std::path::Path;

/// Options for delimited extraction.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedOptions {
    /// Field delimiter. Reference dumps are tab-separated more often than
    /// comma-separated, so tab is the default.
    pub delimiter: u8,
    /// Zero-based index of the grouping key column.
    pub key_column: usize,
    /// Skip a header row before grouping starts.
    pub has_headers: bool,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        DelimitedOptions {
            delimiter: b'\t',
            key_column: 0,
            has_headers: false,
        }
    }
}

/// Maximal run of contiguous rows sharing the grouping key.
///
/// Rows keep all their columns, key column included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub key: String,
    pub rows: Vec<Vec<String>>,
}

impl RowGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column across the group's rows, in input order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }
}

/// Lazy sequence of [`RowGroup`]s from key-sorted delimited input.
pub struct RowGroups<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    key_column: usize,
    pending: Option<(String, Vec<String>)>,
    row: u64,
    done: bool,
}

impl<R: Read> RowGroups<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DelimitedOptions::default())
    }

    #[must_use]
    pub fn with_options(reader: R, options: DelimitedOptions) -> Self {
        let records = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_headers)
            .from_reader(reader)
            .into_records();
        RowGroups {
            records,
            key_column: options.key_column,
            pending: None,
            row: 0,
            done: false,
        }
    }

    fn read_row(&mut self) -> Result<Option<(String, Vec<String>)>, ParseError> {
        let Some(result) = self.records.next() else {
            return Ok(None);
        };
        let record = result?;
        self.row += 1;
        let Some(key) = record.get(self.key_column) else {
            return Err(ParseError::Delimited {
                row: self.row,
                message: format!("key column {} out of range", self.key_column),
            });
        };
        let key = key.to_string();
        let row = record.iter().map(str::to_string).collect();
        Ok(Some((key, row)))
    }
}

impl<R: Read> Iterator for RowGroups<R> {
    type Item = Result<RowGroup, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (key, first) = match self.pending.take() {
            Some(row) => row,
            None => match self.read_row() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            },
        };

        let mut rows = vec![first];
        loop {
            match self.read_row() {
                Ok(Some((next_key, row))) => {
                    if next_key == key {
                        rows.push(row);
                    } else {
                        // Key change closes the current group.
                        self.pending = Some((next_key, row));
                        break;
                    }
                }
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        Some(Ok(RowGroup { key, rows }))
    }
}

/// Open a delimited file with default options, decompressing transparently.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_delimited(
    path: impl AsRef<Path>,
) -> anyhow::Result<RowGroups<BufReader<Box<dyn Read>>>> {
    open_delimited_with(path, DelimitedOptions::default())
}

/// Open a delimited file with explicit options, decompressing transparently.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_delimited_with(
    path: impl AsRef<Path>,
    options: DelimitedOptions,
) -> anyhow::Result<RowGroups<BufReader<Box<dyn Read>>>> {
    let reader = crate::source::open_input(path)?;
    Ok(RowGroups::with_options(reader, options))
}
