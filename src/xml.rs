//! Pull-based streaming over the elements of an XML document.
//!
//! [`ElementStream`] walks a document one parser event at a time and only
//! materializes the subtrees of elements whose local name is in its tag set.
//! Everything outside those subtrees is discarded as it is read, and each
//! captured [`Element`] is owned by the caller, so it is freed as soon as the
//! caller drops it. Memory use is bounded by the largest captured subtree, not
//! by the document.
use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ExtractError;

/// A captured element subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Text appearing before the first child element.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Text of the first descendant matching the slash-separated `path`.
    /// Candidates are considered in document order at every level, so
    /// `dkim/domain` finds the first `<dkim>` that has a `<domain>`.
    /// Returns `Some("")` for a present element without text.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        let mut current: Vec<&Element> = vec![self];
        for segment in path.split('/') {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(move |c| c.name == segment))
                .collect();
            if current.is_empty() {
                return None;
            }
        }
        current.first().map(|e| e.text.as_str())
    }

    /// Like [`Element::find_text`], falling back to `default` when absent.
    pub fn find_text_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.find_text(path).unwrap_or(default)
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Owned summary of one parser event, so the read buffer can be reused
/// before the event is acted upon.
enum Step {
    Open(String),
    Leaf(String),
    Text(String),
    Close,
    Eof,
    Skip,
}

/// Iterator over the top-most elements whose local name is one of `tags`.
/// Nested matches are returned as part of their enclosing element.
///
/// Reaching the end of input before any element was seen, or while an
/// element outside a captured subtree is still open, is an
/// [`ExtractError::Xml`].
pub struct ElementStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    tags: &'static [&'static str],
    path: PathBuf,
    /// Open elements outside captured subtrees.
    depth: usize,
    seen_root: bool,
    finished: bool,
}

impl<R: BufRead> ElementStream<R> {
    pub fn new<P: AsRef<Path>>(source: R, path: P, tags: &'static [&'static str]) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            tags,
            path: path.as_ref().to_path_buf(),
            depth: 0,
            seen_root: false,
            finished: false,
        }
    }

    fn malformed(&self, message: impl std::fmt::Display) -> ExtractError {
        ExtractError::Xml {
            path: self.path.clone(),
            message: format!("{} (at byte {})", message, self.reader.buffer_position()),
        }
    }

    fn step(&mut self) -> Result<Step, ExtractError> {
        self.buf.clear();
        let decoder = self.reader.decoder();
        let step = match self.reader.read_event_into(&mut self.buf) {
            Ok(Event::Start(start)) => Ok(Step::Open(local_name(&start))),
            Ok(Event::Empty(start)) => Ok(Step::Leaf(local_name(&start))),
            Ok(Event::Text(text)) => text
                .unescape()
                .map(|decoded| Step::Text(decoded.into_owned()))
                .map_err(|e| e.to_string()),
            Ok(Event::CData(data)) => decoder
                .decode(&data)
                .map(|decoded| Step::Text(decoded.into_owned()))
                .map_err(|e| e.to_string()),
            Ok(Event::End(_)) => Ok(Step::Close),
            Ok(Event::Eof) => Ok(Step::Eof),
            Ok(_) => Ok(Step::Skip),
            Err(e) => Err(e.to_string()),
        };
        step.map_err(|message| self.malformed(message))
    }

    /// Read events until the element opened as `name` is closed.
    fn capture(&mut self, name: String) -> Result<Element, ExtractError> {
        let mut stack = vec![Element::new(name)];
        loop {
            match self.step()? {
                Step::Open(child) => stack.push(Element::new(child)),
                Step::Leaf(child) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Element::new(child));
                    }
                }
                Step::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        if current.children.is_empty() {
                            current.text.push_str(&text);
                        }
                    }
                }
                Step::Close => {
                    let Some(done) = stack.pop() else {
                        return Err(self.malformed("unbalanced end tag"));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => return Ok(done),
                    }
                }
                Step::Eof => return Err(self.malformed("unexpected end of document")),
                Step::Skip => {}
            }
        }
    }

    fn next_element(&mut self) -> Result<Option<Element>, ExtractError> {
        loop {
            match self.step()? {
                Step::Open(name) => {
                    self.seen_root = true;
                    if self.tags.contains(&name.as_str()) {
                        return self.capture(name).map(Some);
                    }
                    self.depth += 1;
                }
                Step::Leaf(name) => {
                    self.seen_root = true;
                    if self.tags.contains(&name.as_str()) {
                        return Ok(Some(Element::new(name)));
                    }
                }
                Step::Close => match self.depth.checked_sub(1) {
                    Some(depth) => self.depth = depth,
                    None => return Err(self.malformed("unbalanced end tag")),
                },
                Step::Eof if !self.seen_root => {
                    return Err(self.malformed("no root element found"));
                }
                Step::Eof if self.depth > 0 => {
                    return Err(self.malformed("unexpected end of document"));
                }
                Step::Eof => return Ok(None),
                Step::Text(_) | Step::Skip => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for ElementStream<R> {
    type Item = Result<Element, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
