//! Lazy sequential views over a document buffer.
//!
//! Both iterators hold only a cursor into the borrowed buffer; each
//! `next()` decodes exactly one element. Iteration never mutates the
//! document, so re-issuing `iter()` restarts from the first element.

use bson_buffers::Reader;

use super::{decode, scan};
use crate::value::{Bson, ElementType};

/// Iterator over `(key, value)` pairs in storage order.
pub struct Iter<'a> {
    reader: Reader<'a>,
    done: bool,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            reader: Reader::at(buf, 4),
            done: buf.len() < 5,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, Bson);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode::decode_element(&mut self.reader) {
            Ok(Some(pair)) => Some(pair),
            _ => {
                self.done = true;
                None
            }
        }
    }
}

/// Iterator over keys in storage order. Values are skipped by their
/// length rule, never decoded.
pub struct Keys<'a> {
    reader: Reader<'a>,
    done: bool,
}

impl<'a> Keys<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            reader: Reader::at(buf, 4),
            done: buf.len() < 5,
        }
    }
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tag = match self.reader.try_u8() {
            Ok(tag) if tag != 0 => tag,
            _ => {
                self.done = true;
                return None;
            }
        };
        let Some(ty) = ElementType::from_u8(tag) else {
            self.done = true;
            return None;
        };
        let Ok(key) = self.reader.try_cstr() else {
            self.done = true;
            return None;
        };
        if scan::skip_value(&mut self.reader, ty).is_err() {
            self.done = true;
            return None;
        }
        Some(key)
    }
}
