//! Depth-based record extraction from markup streams.
//!
//! Reference datasets ship as one enormous XML document whose interesting
//! records sit at a fixed nesting depth (`<database><entry>...</entry>` puts
//! records at depth 2). [`MarkupRecords`] walks the stream with a pull-based
//! event reader and materializes exactly one record subtree at a time:
//! ancestors contribute only a depth counter, siblings are never buffered,
//! and the whole document is never in memory.
//!
//! Depth counts open elements, so the root element is depth 1 and its
//! children are depth 2.

use crate::error::ParseError;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// One element subtree extracted at the record depth.
///
/// Text is the concatenation of the element's non-blank character data;
/// whitespace-only runs between child elements are not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    /// First child with the given element name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&MarkupNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given element name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MarkupNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with the given name, if any.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim()).filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Lazy sequence of [`MarkupNode`] records found at a fixed depth.
///
/// Forward-only; restart by re-opening the source. Any structural error is
/// fatal: the iterator yields the error once and then terminates.
pub struct MarkupRecords<R: BufRead> {
    reader: Reader<R>,
    record_depth: usize,
    depth: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> MarkupRecords<R> {
    /// # Panics
    ///
    /// Panics if `record_depth` is zero; depth 1 is the root element.
    #[must_use]
    pub fn new(reader: R, record_depth: usize) -> Self {
        assert!(record_depth > 0, "record_depth must be at least 1");
        MarkupRecords {
            reader: Reader::from_reader(reader),
            record_depth,
            depth: 0,
            buf: Vec::with_capacity(8192),
            done: false,
        }
    }

    fn markup_err(&self, e: impl std::fmt::Display) -> ParseError {
        Self::markup_err_at(self.reader.buffer_position(), e)
    }

    fn markup_err_at(pos: u64, e: impl std::fmt::Display) -> ParseError {
        ParseError::Markup(format!("{e} near byte {pos}"))
    }

    fn start_node(
        pos: u64,
        e: &quick_xml::events::BytesStart<'_>,
    ) -> Result<MarkupNode, ParseError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Self::markup_err_at(pos, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Self::markup_err_at(pos, e))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(MarkupNode {
            name,
            attributes,
            ..MarkupNode::default()
        })
    }

    /// Collect the subtree of the record element just opened.
    fn collect_record(&mut self, root: MarkupNode) -> Result<MarkupNode, ParseError> {
        let mut stack = vec![root];
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| Self::markup_err_at(self.reader.buffer_position(), e))?;
            match event {
                Event::Start(ref e) => {
                    let node = Self::start_node(self.reader.buffer_position(), e)?;
                    stack.push(node);
                }
                Event::Empty(ref e) => {
                    let node = Self::start_node(self.reader.buffer_position(), e)?;
                    if let Some(top) = stack.last_mut() {
                        top.children.push(node);
                    }
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Self::markup_err_at(self.reader.buffer_position(), e))?;
                    if !text.trim().is_empty()
                        && let Some(top) = stack.last_mut()
                    {
                        top.text.push_str(&text);
                    }
                }
                Event::CData(ref e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Event::End(_) => {
                    let node = stack.pop().ok_or_else(|| {
                        self.markup_err("unbalanced close tag inside record")
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => {
                            // Record element closed.
                            self.depth -= 1;
                            return Ok(node);
                        }
                    }
                }
                Event::Eof => {
                    return Err(self.markup_err("stream ended inside a record"));
                }
                _ => {}
            }
        }
    }

    fn next_record(&mut self) -> Result<Option<MarkupNode>, ParseError> {
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| Self::markup_err_at(self.reader.buffer_position(), e))?;
            match event {
                Event::Start(ref e) => {
                    self.depth += 1;
                    if self.depth == self.record_depth {
                        let root = Self::start_node(self.reader.buffer_position(), e)?;
                        return Ok(Some(self.collect_record(root)?));
                    }
                }
                Event::Empty(ref e) => {
                    // Self-closing element opening at depth + 1.
                    if self.depth + 1 == self.record_depth {
                        return Ok(Some(Self::start_node(self.reader.buffer_position(), e)?));
                    }
                }
                Event::End(_) => {
                    if self.depth == 0 {
                        return Err(self.markup_err("unbalanced close tag"));
                    }
                    self.depth -= 1;
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for MarkupRecords<R> {
    type Item = Result<MarkupNode, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(node)) => Some(Ok(node)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open a markup file, decompressing transparently, and iterate records at
/// `record_depth`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_markup(
    path: impl AsRef<Path>,
    record_depth: usize,
) -> anyhow::Result<MarkupRecords<BufReader<Box<dyn Read>>>> {
    let reader = crate::source::open_input(path)?;
    Ok(MarkupRecords::new(reader, record_depth))
}
