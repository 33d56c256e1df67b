//! Sequential element decoding from a raw document buffer.

use bson_buffers::Reader;

use super::error::DecodeError;
use super::scan;
use super::Document;
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::oid::ObjectId;
use crate::value::{
    Binary, Bson, CodeWithScope, DbPointer, ElementType, Regex, Timestamp,
};

/// Decodes the element record at the reader's position. Returns `None`
/// on the document terminator.
pub(crate) fn decode_element<'a>(
    reader: &mut Reader<'a>,
) -> Result<Option<(&'a str, Bson)>, DecodeError> {
    let tag = reader.try_u8()?;
    if tag == 0 {
        return Ok(None);
    }
    let ty = ElementType::from_u8(tag).ok_or(DecodeError::UnknownType(tag))?;
    let key = reader.try_cstr()?;
    let value = decode_value(reader, ty)?;
    Ok(Some((key, value)))
}

/// Decodes one value of the given type at the reader's position.
pub(crate) fn decode_value(
    reader: &mut Reader<'_>,
    ty: ElementType,
) -> Result<Bson, DecodeError> {
    Ok(match ty {
        ElementType::Double => Bson::Double(reader.try_f64()?),
        ElementType::String => Bson::String(read_string(reader)?),
        ElementType::EmbeddedDocument => {
            let bytes = scan::doc_slice(reader)?;
            Bson::Document(Document::from_bytes(bytes.to_vec())?)
        }
        ElementType::Array => {
            let bytes = scan::doc_slice(reader)?;
            let mut inner = Reader::at(bytes, 4);
            let mut items = Vec::new();
            while let Some((_, value)) = decode_element(&mut inner)? {
                items.push(value);
            }
            Bson::Array(items)
        }
        ElementType::Binary => {
            let raw = reader.try_i32()?;
            let len = usize::try_from(raw).map_err(|_| DecodeError::InvalidLength(raw))?;
            let subtype = reader.try_u8()?;
            let bytes = reader.try_buf(len)?.to_vec();
            Bson::Binary(Binary { subtype, bytes })
        }
        ElementType::Undefined => Bson::Undefined,
        ElementType::ObjectId => Bson::ObjectId(read_object_id(reader)?),
        ElementType::Boolean => Bson::Boolean(reader.try_u8()? != 0),
        ElementType::DateTime => Bson::DateTime(DateTime::from_millis(reader.try_i64()?)),
        ElementType::Null => Bson::Null,
        ElementType::RegularExpression => {
            let pattern = reader.try_cstr()?.to_owned();
            let options = reader.try_cstr()?.to_owned();
            Bson::Regex(Regex { pattern, options })
        }
        ElementType::DbPointer => {
            let namespace = read_string(reader)?;
            let id = read_object_id(reader)?;
            Bson::DbPointer(DbPointer { namespace, id })
        }
        ElementType::JavaScriptCode => Bson::JavaScriptCode(read_string(reader)?),
        ElementType::Symbol => Bson::Symbol(read_string(reader)?),
        ElementType::JavaScriptCodeWithScope => {
            reader.try_i32()?;
            let code = read_string(reader)?;
            let scope_bytes = scan::doc_slice(reader)?;
            let scope = Document::from_bytes(scope_bytes.to_vec())?;
            Bson::JavaScriptCodeWithScope(CodeWithScope { code, scope })
        }
        ElementType::Int32 => Bson::Int32(reader.try_i32()?),
        ElementType::Timestamp => {
            let increment = reader.try_u32()?;
            let time = reader.try_u32()?;
            Bson::Timestamp(Timestamp { time, increment })
        }
        ElementType::Int64 => Bson::Int64(reader.try_i64()?),
        ElementType::Decimal128 => {
            let bytes = reader.try_buf(16)?;
            let bytes: [u8; 16] = bytes.try_into().map_err(|_| DecodeError::UnexpectedEof)?;
            Bson::Decimal128(Decimal128::from_bytes(bytes))
        }
        ElementType::MinKey => Bson::MinKey,
        ElementType::MaxKey => Bson::MaxKey,
    })
}

fn read_string(reader: &mut Reader<'_>) -> Result<String, DecodeError> {
    let raw = reader.try_i32()?;
    let len = usize::try_from(raw)
        .ok()
        .filter(|&len| len >= 1)
        .ok_or(DecodeError::InvalidLength(raw))?;
    let value = reader.try_utf8(len - 1)?.to_owned();
    if reader.try_u8()? != 0 {
        return Err(DecodeError::MissingTerminator);
    }
    Ok(value)
}

fn read_object_id(reader: &mut Reader<'_>) -> Result<ObjectId, DecodeError> {
    let bytes = reader.try_buf(12)?;
    let bytes: [u8; 12] = bytes.try_into().map_err(|_| DecodeError::UnexpectedEof)?;
    Ok(ObjectId::from_bytes(bytes))
}
