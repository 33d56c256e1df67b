//! The byte-range scanner: locates and validates element records in a raw
//! document buffer without decoding value payloads.
//!
//! Lookup is a sequential scan, O(number of preceding elements). That is a
//! deliberate trade against an auxiliary index: the buffer stays the only
//! source of truth and no side structure has to be kept in sync.

use std::ops::Range;

use bson_buffers::Reader;

use super::error::DecodeError;
use crate::value::ElementType;

/// Returns the half-open byte range of `key`'s full element record (type
/// byte, key bytes, null terminator, value bytes) inside a raw document
/// buffer, or `None` when the key is absent.
///
/// Only the type tag and key of each preceding element are examined; value
/// payloads are skipped by their type-specific length rule.
pub fn element_range(buf: &[u8], key: &str) -> Result<Option<Range<usize>>, DecodeError> {
    let mut reader = Reader::new(buf);
    let declared = read_declared_len(&mut reader, buf)?;
    loop {
        let start = reader.x;
        let tag = reader.try_u8()?;
        if tag == 0 {
            if reader.x != declared {
                return Err(DecodeError::LengthMismatch {
                    declared,
                    actual: reader.x,
                });
            }
            return Ok(None);
        }
        let ty = ElementType::from_u8(tag).ok_or(DecodeError::UnknownType(tag))?;
        let name = reader.try_cstr_bytes()?;
        let matched = name == key.as_bytes();
        skip_value(&mut reader, ty)?;
        if matched {
            return Ok(Some(start..reader.x));
        }
    }
}

/// Validates that `buf` is a structurally well-formed document: length
/// prefix matching the buffer, every element well-formed (recursing into
/// nested documents and arrays), all strings valid UTF-8, terminator in
/// place.
///
/// A buffer that passes guarantees every later decode of any contained
/// element succeeds.
pub fn validate(buf: &[u8]) -> Result<(), DecodeError> {
    let mut reader = Reader::new(buf);
    let declared = read_declared_len(&mut reader, buf)?;
    loop {
        let tag = reader.try_u8()?;
        if tag == 0 {
            if reader.x != declared {
                return Err(DecodeError::LengthMismatch {
                    declared,
                    actual: reader.x,
                });
            }
            return Ok(());
        }
        let ty = ElementType::from_u8(tag).ok_or(DecodeError::UnknownType(tag))?;
        reader.try_cstr()?;
        validate_value(&mut reader, ty)?;
    }
}

fn read_declared_len(reader: &mut Reader<'_>, buf: &[u8]) -> Result<usize, DecodeError> {
    let raw = reader.try_i32()?;
    let declared = usize::try_from(raw)
        .ok()
        .filter(|&len| len >= 5)
        .ok_or(DecodeError::InvalidLength(raw))?;
    if declared != buf.len() {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: buf.len(),
        });
    }
    Ok(declared)
}

/// Advances the reader past one value of the given type using the
/// per-type length rule, without touching the payload.
pub(crate) fn skip_value(reader: &mut Reader<'_>, ty: ElementType) -> Result<(), DecodeError> {
    match ty {
        ElementType::Double
        | ElementType::DateTime
        | ElementType::Int64
        | ElementType::Timestamp => reader.try_skip(8)?,
        ElementType::Int32 => reader.try_skip(4)?,
        ElementType::Decimal128 => reader.try_skip(16)?,
        ElementType::ObjectId => reader.try_skip(12)?,
        ElementType::Boolean => reader.try_skip(1)?,
        ElementType::Undefined
        | ElementType::Null
        | ElementType::MinKey
        | ElementType::MaxKey => {}
        ElementType::String | ElementType::JavaScriptCode | ElementType::Symbol => {
            let len = read_size(reader)?;
            reader.try_skip(len)?;
        }
        ElementType::EmbeddedDocument
        | ElementType::Array
        | ElementType::JavaScriptCodeWithScope => {
            let len = read_size(reader)?;
            if len < 4 {
                return Err(DecodeError::InvalidLength(len as i32));
            }
            reader.try_skip(len - 4)?;
        }
        ElementType::Binary => {
            let len = read_size(reader)?;
            reader.try_skip(len + 1)?;
        }
        ElementType::RegularExpression => {
            reader.try_cstr_bytes()?;
            reader.try_cstr_bytes()?;
        }
        ElementType::DbPointer => {
            let len = read_size(reader)?;
            reader.try_skip(len)?;
            reader.try_skip(12)?;
        }
    }
    Ok(())
}

fn validate_value(reader: &mut Reader<'_>, ty: ElementType) -> Result<(), DecodeError> {
    match ty {
        ElementType::String | ElementType::JavaScriptCode | ElementType::Symbol => {
            validate_string(reader)
        }
        ElementType::EmbeddedDocument | ElementType::Array => {
            let bytes = doc_slice(reader)?;
            validate(bytes)
        }
        ElementType::JavaScriptCodeWithScope => {
            let start = reader.x;
            let raw = reader.try_i32()?;
            let total = usize::try_from(raw)
                .ok()
                .filter(|&len| len >= 14)
                .ok_or(DecodeError::InvalidLength(raw))?;
            validate_string(reader)?;
            let scope = doc_slice(reader)?;
            validate(scope)?;
            if reader.x - start != total {
                return Err(DecodeError::LengthMismatch {
                    declared: total,
                    actual: reader.x - start,
                });
            }
            Ok(())
        }
        ElementType::RegularExpression => {
            reader.try_cstr()?;
            reader.try_cstr()?;
            Ok(())
        }
        ElementType::DbPointer => {
            validate_string(reader)?;
            reader.try_skip(12)?;
            Ok(())
        }
        _ => skip_value(reader, ty),
    }
}

fn validate_string(reader: &mut Reader<'_>) -> Result<(), DecodeError> {
    let raw = reader.try_i32()?;
    let len = usize::try_from(raw)
        .ok()
        .filter(|&len| len >= 1)
        .ok_or(DecodeError::InvalidLength(raw))?;
    reader.try_utf8(len - 1)?;
    if reader.try_u8()? != 0 {
        return Err(DecodeError::MissingTerminator);
    }
    Ok(())
}

/// Returns the full byte slice of an embedded document (length prefix
/// included) and advances past it.
pub(crate) fn doc_slice<'a>(reader: &mut Reader<'a>) -> Result<&'a [u8], DecodeError> {
    let start = reader.x;
    let raw = reader.try_i32()?;
    let len = usize::try_from(raw)
        .ok()
        .filter(|&len| len >= 5)
        .ok_or(DecodeError::InvalidLength(raw))?;
    reader.x = start;
    Ok(reader.try_buf(len)?)
}

fn read_size(reader: &mut Reader<'_>) -> Result<usize, DecodeError> {
    let raw = reader.try_i32()?;
    usize::try_from(raw).map_err(|_| DecodeError::InvalidLength(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    // { "item0": int32 32, "item1": int32 32 }
    fn two_ints() -> Vec<u8> {
        vec![
            0x1b, 0x00, 0x00, 0x00, // total length 27
            0x10, b'i', b't', b'e', b'm', b'0', 0x00, 0x20, 0x00, 0x00, 0x00,
            0x10, b'i', b't', b'e', b'm', b'1', 0x00, 0x20, 0x00, 0x00, 0x00,
            0x00,
        ]
    }

    #[test]
    fn finds_element_byte_range() {
        let buf = two_ints();
        assert_eq!(element_range(&buf, "item0").unwrap(), Some(4..15));
        assert_eq!(element_range(&buf, "item1").unwrap(), Some(15..26));
        assert_eq!(element_range(&buf, "item2").unwrap(), None);
    }

    #[test]
    fn range_covers_the_full_element_record() {
        let buf = two_ints();
        let range = element_range(&buf, "item1").unwrap().unwrap();
        assert_eq!(range.len(), 11);
        assert_eq!(
            &buf[range],
            &[0x10, b'i', b't', b'e', b'm', b'1', 0x00, 0x20, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn rejects_unknown_type_tag() {
        let mut buf = two_ints();
        buf[4] = 0x20;
        assert_eq!(
            element_range(&buf, "item1"),
            Err(DecodeError::UnknownType(0x20))
        );
        assert_eq!(validate(&buf), Err(DecodeError::UnknownType(0x20)));
    }

    #[test]
    fn rejects_truncated_buffer() {
        let buf = two_ints();
        assert!(matches!(
            validate(&buf[..buf.len() - 3]),
            Err(DecodeError::LengthMismatch { .. })
        ));
        assert_eq!(validate(&buf[..3]), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn rejects_length_prefix_mismatch() {
        let mut buf = two_ints();
        buf[0] = 0x1c;
        assert_eq!(
            validate(&buf),
            Err(DecodeError::LengthMismatch {
                declared: 28,
                actual: 27
            })
        );
    }

    #[test]
    fn rejects_early_terminator() {
        let mut buf = two_ints();
        buf[15] = 0x00;
        assert_eq!(
            validate(&buf),
            Err(DecodeError::LengthMismatch {
                declared: 27,
                actual: 16
            })
        );
    }

    #[test]
    fn rejects_negative_length() {
        let buf = vec![0xff, 0xff, 0xff, 0xff, 0x00];
        assert_eq!(validate(&buf), Err(DecodeError::InvalidLength(-1)));
    }

    #[test]
    fn rejects_invalid_utf8_string() {
        // { "a": string <invalid utf8> }
        let buf = vec![
            0x0f, 0x00, 0x00, 0x00, //
            0x02, b'a', 0x00, //
            0x03, 0x00, 0x00, 0x00, 0xff, 0xfe, 0x00, //
            0x00,
        ];
        assert_eq!(validate(&buf), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn validates_nested_documents() {
        // { "d": { "a": int32 1 } }
        let buf = vec![
            0x14, 0x00, 0x00, 0x00, //
            0x03, b'd', 0x00, //
            0x0c, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, //
            0x00,
        ];
        assert_eq!(validate(&buf), Ok(()));
        let mut bad = buf.clone();
        bad[11] = 0x20;
        assert_eq!(validate(&bad), Err(DecodeError::UnknownType(0x20)));
    }

    #[test]
    fn empty_document_is_valid() {
        assert_eq!(validate(&[5, 0, 0, 0, 0]), Ok(()));
    }
}
