//! The ordered key/value document, stored as its exact BSON wire
//! encoding.
//!
//! A [`Document`] owns a byte buffer that is a structurally valid BSON
//! document at every externally observable point: 4-byte little-endian
//! total length, element records, trailing `0x00`. Lookups scan the
//! buffer lazily and decode only the matched element; iteration decodes
//! one element per step.
//!
//! Documents are ordinary owned values. Concurrent reads of an unmodified
//! document are safe; concurrent mutation needs external synchronization,
//! exactly as for any `&mut` access.

mod decode;
mod encode;
mod error;
mod iter;
pub mod scan;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use bson_buffers::Reader;

pub use error::DecodeError;
pub use iter::{Iter, Keys};

use crate::value::Bson;

/// An ordered mapping from string keys to BSON values, backed by the raw
/// wire encoding.
///
/// Keys are unique with last-write-wins semantics and keep insertion
/// order on iteration, with one documented exception: overwriting a key
/// with a value of a different encoded length re-appends that key at the
/// end (see [`Document::set`]).
#[derive(Clone)]
pub struct Document {
    buf: Vec<u8>,
}

impl Document {
    /// Creates an empty document (the 5-byte minimal encoding).
    pub fn new() -> Self {
        Self {
            buf: vec![5, 0, 0, 0, 0],
        }
    }

    /// Constructs a document from its raw encoding after validating the
    /// whole buffer: length prefix, every element (recursively), all
    /// string payloads, terminator. Malformed input fails without
    /// producing a partial document.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self, DecodeError> {
        scan::validate(&buf)?;
        Ok(Self { buf })
    }

    /// The raw wire encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the document, returning its raw wire encoding.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// The byte span of `key`'s full element record, or `None` when the
    /// key is absent. The buffer invariant makes scanning infallible
    /// here; use [`scan::element_range`] for untrusted buffers.
    pub fn element_range(&self, key: &str) -> Option<Range<usize>> {
        scan::element_range(&self.buf, key).ok().flatten()
    }

    /// Looks up `key` and decodes only that element's value.
    pub fn get(&self, key: &str) -> Option<Bson> {
        let range = self.element_range(key)?;
        let mut reader = Reader::at(&self.buf, range.start);
        match decode::decode_element(&mut reader) {
            Ok(Some((_, value))) => Some(value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.element_range(key).is_some()
    }

    /// Number of elements. O(n): counts by scanning.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() <= 5
    }

    /// Lazy iterator over `(key, value)` pairs in storage order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.buf)
    }

    /// Lazy iterator over keys in storage order; values are skipped,
    /// not decoded.
    pub fn keys(&self) -> Keys<'_> {
        Keys::new(&self.buf)
    }

    /// Inserts or overwrites `key`. `set(key, None)` deletes the key.
    ///
    /// An overwrite whose new encoding has the same byte length as the
    /// old one happens in place and keeps the key's position. Any other
    /// overwrite removes the old element and appends the new one at the
    /// end, so the key moves to the end of iteration order. Surviving
    /// keys keep their relative order either way.
    ///
    /// # Panics
    ///
    /// Keys, regex patterns, and regex options are stored as
    /// null-terminated strings, so an embedded NUL byte has no encoding;
    /// passing one panics instead of corrupting the buffer.
    pub fn set(&mut self, key: &str, value: Option<Bson>) {
        assert!(
            !key.as_bytes().contains(&0),
            "document key contains a NUL byte"
        );
        if let Some(value) = &value {
            assert_cstr_safe(value);
        }
        let existing = self.element_range(key);
        match (existing, value) {
            (None, None) => {}
            (Some(range), None) => self.remove_range(range),
            (existing, Some(value)) => {
                let element = encode::element_bytes(key, &value);
                match existing {
                    Some(range) if range.len() == element.len() => {
                        self.buf[range].copy_from_slice(&element);
                    }
                    Some(range) => {
                        self.remove_range(range);
                        self.append_element(&element);
                    }
                    None => self.append_element(&element),
                }
            }
        }
    }

    /// Inserts or overwrites `key` with any value convertible to
    /// [`Bson`].
    pub fn insert(&mut self, key: &str, value: impl Into<Bson>) {
        self.set(key, Some(value.into()));
    }

    /// Deletes `key`, returning the value it held.
    pub fn remove(&mut self, key: &str) -> Option<Bson> {
        let old = self.get(key)?;
        self.set(key, None);
        Some(old)
    }

    /// Derives a new document keeping only the entries the predicate
    /// accepts. The receiver is untouched.
    pub fn filtered(&self, mut pred: impl FnMut(&str, &Bson) -> bool) -> Document {
        let mut out = Document::new();
        for (key, value) in self.iter() {
            if pred(key, &value) {
                out.set(key, Some(value));
            }
        }
        out
    }

    /// Derives a new document with every value replaced by `f`'s result.
    /// The receiver is untouched.
    pub fn map_values(&self, mut f: impl FnMut(&str, Bson) -> Bson) -> Document {
        let mut out = Document::new();
        for (key, value) in self.iter() {
            let value = f(key, value);
            out.set(key, Some(value));
        }
        out
    }

    /// Recursive comparison that ignores key order in documents (at
    /// every nesting level) while arrays stay order-sensitive. Distinct
    /// from `==`, which is order-sensitive for documents too.
    pub fn equals_ignore_key_order(&self, other: &Document) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(key, value)| match other.get(key) {
            Some(other_value) => value_eq_ignore_key_order(&value, &other_value),
            None => false,
        })
    }

    fn remove_range(&mut self, range: Range<usize>) {
        self.buf.drain(range);
        self.refresh_len();
    }

    fn append_element(&mut self, element: &[u8]) {
        let terminator = self.buf.len() - 1;
        self.buf.splice(terminator..terminator, element.iter().copied());
        self.refresh_len();
    }

    fn refresh_len(&mut self) {
        let len = self.buf.len() as i32;
        self.buf[..4].copy_from_slice(&len.to_le_bytes());
    }
}

// Nested documents are already valid buffers, so only the cstr-encoded
// payloads need checking: regex fields, at any array nesting depth.
fn assert_cstr_safe(value: &Bson) {
    match value {
        Bson::Regex(v) => assert!(
            !v.pattern.as_bytes().contains(&0) && !v.options.as_bytes().contains(&0),
            "regex pattern or options contain a NUL byte"
        ),
        Bson::Array(items) => {
            for item in items {
                assert_cstr_safe(item);
            }
        }
        _ => {}
    }
}

fn value_eq_ignore_key_order(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Document(x), Bson::Document(y)) => x.equals_ignore_key_order(y),
        (Bson::Array(x), Bson::Array(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(a, b)| value_eq_ignore_key_order(a, b))
        }
        _ => a == b,
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Order-sensitive element-wise equality; numeric values compare across
/// variants, so differently-encoded but equal documents are equal.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (key, value) in self.iter() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a str, Bson);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Regex, Timestamp};

    #[test]
    fn empty_document_encoding() {
        let doc = Document::new();
        assert_eq!(doc.as_bytes(), &[5, 0, 0, 0, 0]);
        assert!(doc.is_empty());
        assert_eq!(doc.len(), 0);
    }

    #[test]
    fn insert_and_get() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", "two");
        doc.insert("c", 3.5f64);
        assert_eq!(doc.get("a"), Some(Bson::Int32(1)));
        assert_eq!(doc.get("b"), Some(Bson::String("two".into())));
        assert_eq!(doc.get("c"), Some(Bson::Double(3.5)));
        assert_eq!(doc.get("d"), None);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn last_write_wins() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("a", 2i32);
        assert_eq!(doc.get("a"), Some(Bson::Int32(2)));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn same_length_overwrite_keeps_position() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", 2i32);
        doc.insert("a", 9i32);
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(doc.get("a"), Some(Bson::Int32(9)));
    }

    #[test]
    fn different_length_overwrite_moves_key_to_end() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", 2i32);
        doc.insert("a", 9i64);
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(doc.get("a"), Some(Bson::Int64(9)));
        assert_eq!(doc.get("b"), Some(Bson::Int32(2)));
    }

    #[test]
    fn set_none_deletes() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", 2i32);
        doc.set("a", None);
        assert_eq!(doc.get("a"), None);
        assert_eq!(doc.len(), 1);
        // Deleting an absent key is a no-op.
        let before = doc.as_bytes().to_vec();
        doc.set("missing", None);
        assert_eq!(doc.as_bytes(), &before[..]);
    }

    #[test]
    fn remove_returns_old_value() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        assert_eq!(doc.remove("a"), Some(Bson::Int32(1)));
        assert_eq!(doc.remove("a"), None);
    }

    #[test]
    fn roundtrip_through_bytes() {
        let mut inner = Document::new();
        inner.insert("x", 1i32);
        let mut doc = Document::new();
        doc.insert("int", 42i32);
        doc.insert("long", 42i64);
        doc.insert("str", "hello");
        doc.insert("bool", true);
        doc.insert("null", Bson::Null);
        doc.insert("doc", inner);
        doc.insert(
            "arr",
            vec![Bson::Int32(1), Bson::String("two".into()), Bson::Null],
        );
        doc.insert("ts", Timestamp { time: 7, increment: 3 });

        let bytes = doc.clone().into_bytes();
        let back = Document::from_bytes(bytes).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn iteration_is_reentrant() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", 2i32);
        let first: Vec<_> = doc.iter().collect();
        let second: Vec<_> = doc.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first[0].0, "a");
        assert_eq!(first[1].0, "b");
    }

    #[test]
    fn filtered_keeps_matching_entries_only() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", "two");
        doc.insert("c", 3i32);
        let ints = doc.filtered(|_, value| matches!(value, Bson::Int32(_)));
        assert_eq!(ints.keys().collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn map_values_derives_without_mutating() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("b", 2i32);
        let doubled = doc.map_values(|_, value| match value {
            Bson::Int32(v) => Bson::Int32(v * 2),
            other => other,
        });
        assert_eq!(doubled.get("a"), Some(Bson::Int32(2)));
        assert_eq!(doubled.get("b"), Some(Bson::Int32(4)));
        assert_eq!(doc.get("a"), Some(Bson::Int32(1)));
    }

    #[test]
    fn default_equality_is_order_sensitive() {
        let mut ab = Document::new();
        ab.insert("a", 1i32);
        ab.insert("b", 2i32);
        let mut ba = Document::new();
        ba.insert("b", 2i32);
        ba.insert("a", 1i32);
        assert_ne!(ab, ba);
        assert!(ab.equals_ignore_key_order(&ba));
    }

    #[test]
    fn equals_ignore_key_order_recurses_into_documents() {
        let mut inner_ab = Document::new();
        inner_ab.insert("a", 1i32);
        inner_ab.insert("b", 2i32);
        let mut inner_ba = Document::new();
        inner_ba.insert("b", 2i32);
        inner_ba.insert("a", 1i32);

        let mut left = Document::new();
        left.insert("doc", inner_ab);
        let mut right = Document::new();
        right.insert("doc", inner_ba);
        assert!(left.equals_ignore_key_order(&right));
        assert_ne!(left, right);

        // Arrays stay order-sensitive.
        let mut x = Document::new();
        x.insert("arr", vec![Bson::Int32(1), Bson::Int32(2)]);
        let mut y = Document::new();
        y.insert("arr", vec![Bson::Int32(2), Bson::Int32(1)]);
        assert!(!x.equals_ignore_key_order(&y));
    }

    #[test]
    fn equality_spans_numeric_encodings() {
        let mut a = Document::new();
        a.insert("n", 5i32);
        let mut b = Document::new();
        b.insert("n", 5i64);
        assert_eq!(a, b);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn from_bytes_rejects_truncated_input() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        let mut bytes = doc.into_bytes();
        bytes.pop();
        assert!(Document::from_bytes(bytes).is_err());
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert_eq!(
            Document::from_bytes(vec![]),
            Err(DecodeError::UnexpectedEof)
        );
        assert_eq!(
            Document::from_bytes(vec![4, 0, 0, 0]),
            Err(DecodeError::InvalidLength(4))
        );
    }

    #[test]
    #[should_panic(expected = "NUL")]
    fn nul_in_key_is_rejected() {
        let mut doc = Document::new();
        doc.insert("a\0b", 1i32);
    }

    #[test]
    #[should_panic(expected = "NUL")]
    fn nul_in_regex_is_rejected() {
        let mut doc = Document::new();
        doc.insert("r", Regex::new("a\0b", ""));
    }

    #[test]
    #[should_panic(expected = "NUL")]
    fn nul_in_array_nested_regex_is_rejected() {
        let mut doc = Document::new();
        doc.insert("r", vec![Bson::Regex(Regex::new("a", "x\0"))]);
    }

    #[test]
    fn length_prefix_tracks_mutation() {
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        let len = doc.as_bytes().len();
        assert_eq!(
            i32::from_le_bytes(doc.as_bytes()[..4].try_into().unwrap()) as usize,
            len
        );
        doc.set("a", None);
        assert_eq!(doc.as_bytes(), &[5, 0, 0, 0, 0]);
    }
}
