//! Streams the `record` blocks of a report as flattened rows joined with the
//! file's metadata row.
use std::io::BufRead;

use crate::error::ExtractError;
use crate::fields::{FieldNameCache, RECORD_FIELDS, Row};
use crate::metadata::read_fields;
use crate::xml::ElementStream;

pub const RECORD_TAG: &str = "record";
pub const RECORD_TAGS: &[&str] = &[RECORD_TAG];

/// Lazy iterator of detail rows, one per `record` element in document order.
/// Each record subtree is dropped as soon as its row has been built.
pub struct RecordStream<'a, R: BufRead> {
    elements: ElementStream<R>,
    cache: &'a mut FieldNameCache,
    meta: &'a Row,
}

impl<'a, R: BufRead> RecordStream<'a, R> {
    pub fn new(elements: ElementStream<R>, cache: &'a mut FieldNameCache, meta: &'a Row) -> Self {
        Self {
            elements,
            cache,
            meta,
        }
    }
}

impl<R: BufRead> Iterator for RecordStream<'_, R> {
    type Item = Result<Row, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        let element = match self.elements.next()? {
            Ok(element) => element,
            Err(e) => return Some(Err(e)),
        };
        let mut row = read_fields(&element, RECORD_FIELDS, self.cache);
        // metadata wins on collision
        row.extend(self.meta.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(Ok(row))
    }
}
