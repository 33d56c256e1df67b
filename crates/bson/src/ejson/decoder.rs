//! Extended JSON to BSON decoding.
//!
//! Accepts both canonical and relaxed forms. Type wrappers are checked
//! strictly: wrong inner shape, extra keys, or out-of-domain payloads
//! (bad hex, bad base64, bad ISO dates) are errors rather than being
//! passed through as plain objects.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};

use super::error::EjsonDecodeError;
use super::iso;
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::oid::ObjectId;
use crate::value::{Binary, Bson, CodeWithScope, DbPointer, Regex, Timestamp};

/// Decodes Extended JSON text or trees into BSON values.
#[derive(Debug, Clone, Default)]
pub struct EjsonDecoder;

impl EjsonDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Parses Extended JSON text and decodes it.
    pub fn decode_str(&self, input: &str) -> Result<Bson, EjsonDecodeError> {
        let value: Value =
            serde_json::from_str(input).map_err(|err| EjsonDecodeError::InvalidJson(err.column()))?;
        self.decode(&value)
    }

    /// Decodes a JSON tree into a BSON value.
    pub fn decode(&self, value: &Value) -> Result<Bson, EjsonDecodeError> {
        Ok(match value {
            Value::Null => Bson::Null,
            Value::Bool(v) => Bson::Boolean(*v),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Bson::Int32(small),
                        Err(_) => Bson::Int64(i),
                    }
                } else {
                    Bson::Double(n.as_f64().ok_or(EjsonDecodeError::InvalidDouble)?)
                }
            }
            Value::String(v) => Bson::String(v.clone()),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.decode(item)?);
                }
                Bson::Array(out)
            }
            Value::Object(map) => self.decode_object(map)?,
        })
    }

    /// Decodes a JSON tree that must be a document at the top level.
    pub fn decode_document(&self, value: &Value) -> Result<Document, EjsonDecodeError> {
        match self.decode(value)? {
            Bson::Document(doc) => Ok(doc),
            _ => Err(EjsonDecodeError::NotADocument),
        }
    }

    fn decode_object(&self, map: &Map<String, Value>) -> Result<Bson, EjsonDecodeError> {
        if let Some(value) = map.get("$oid") {
            require_len(map, 1, "ObjectId")?;
            let hex = value.as_str().ok_or(EjsonDecodeError::InvalidObjectId)?;
            let id = ObjectId::parse_str(hex).map_err(|_| EjsonDecodeError::InvalidObjectId)?;
            return Ok(Bson::ObjectId(id));
        }
        if let Some(value) = map.get("$numberInt") {
            require_len(map, 1, "Int32")?;
            let text = value.as_str().ok_or(EjsonDecodeError::InvalidInt32)?;
            let v = text.parse().map_err(|_| EjsonDecodeError::InvalidInt32)?;
            return Ok(Bson::Int32(v));
        }
        if let Some(value) = map.get("$numberLong") {
            require_len(map, 1, "Int64")?;
            let text = value.as_str().ok_or(EjsonDecodeError::InvalidInt64)?;
            let v = text.parse().map_err(|_| EjsonDecodeError::InvalidInt64)?;
            return Ok(Bson::Int64(v));
        }
        if let Some(value) = map.get("$numberDouble") {
            require_len(map, 1, "Double")?;
            let text = value.as_str().ok_or(EjsonDecodeError::InvalidDouble)?;
            return Ok(Bson::Double(parse_double(text)?));
        }
        if let Some(value) = map.get("$numberDecimal") {
            require_len(map, 1, "Decimal128")?;
            let text = value.as_str().ok_or(EjsonDecodeError::InvalidDecimal128)?;
            let v: Decimal128 = text
                .parse()
                .map_err(|_| EjsonDecodeError::InvalidDecimal128)?;
            return Ok(Bson::Decimal128(v));
        }
        if let Some(value) = map.get("$binary") {
            require_len(map, 1, "Binary")?;
            return self.decode_binary(value);
        }
        if let Some(value) = map.get("$uuid") {
            require_len(map, 1, "UUID")?;
            let text = value.as_str().ok_or(EjsonDecodeError::InvalidUuid)?;
            return Ok(Bson::Binary(parse_uuid(text)?));
        }
        if let Some(value) = map.get("$code") {
            let code = value
                .as_str()
                .ok_or(EjsonDecodeError::InvalidCode)?
                .to_owned();
            return match map.len() {
                1 => Ok(Bson::JavaScriptCode(code)),
                2 => {
                    let scope_value = map
                        .get("$scope")
                        .ok_or(EjsonDecodeError::ExtraKeys("Code"))?;
                    let scope_map = scope_value
                        .as_object()
                        .ok_or(EjsonDecodeError::InvalidCodeWithScope)?;
                    let scope = self.decode_plain_document(scope_map)?;
                    Ok(Bson::JavaScriptCodeWithScope(CodeWithScope { code, scope }))
                }
                _ => Err(EjsonDecodeError::ExtraKeys("Code")),
            };
        }
        if let Some(value) = map.get("$symbol") {
            require_len(map, 1, "Symbol")?;
            let text = value.as_str().ok_or(EjsonDecodeError::InvalidSymbol)?;
            return Ok(Bson::Symbol(text.to_owned()));
        }
        if let Some(value) = map.get("$timestamp") {
            require_len(map, 1, "Timestamp")?;
            return decode_timestamp(value);
        }
        if let Some(value) = map.get("$regularExpression") {
            require_len(map, 1, "RegularExpression")?;
            return decode_regex(value);
        }
        if let Some(value) = map.get("$dbPointer") {
            require_len(map, 1, "DBPointer")?;
            return self.decode_db_pointer(value);
        }
        if let Some(value) = map.get("$date") {
            require_len(map, 1, "Date")?;
            return self.decode_date(value);
        }
        if let Some(value) = map.get("$minKey") {
            require_len(map, 1, "MinKey")?;
            if value.as_i64() != Some(1) {
                return Err(EjsonDecodeError::InvalidMinKey);
            }
            return Ok(Bson::MinKey);
        }
        if let Some(value) = map.get("$maxKey") {
            require_len(map, 1, "MaxKey")?;
            if value.as_i64() != Some(1) {
                return Err(EjsonDecodeError::InvalidMaxKey);
            }
            return Ok(Bson::MaxKey);
        }
        if let Some(value) = map.get("$undefined") {
            require_len(map, 1, "Undefined")?;
            if value.as_bool() != Some(true) {
                return Err(EjsonDecodeError::InvalidUndefined);
            }
            return Ok(Bson::Undefined);
        }
        Ok(Bson::Document(self.decode_plain_document(map)?))
    }

    fn decode_plain_document(
        &self,
        map: &Map<String, Value>,
    ) -> Result<Document, EjsonDecodeError> {
        let mut doc = Document::new();
        for (key, value) in map {
            if key.as_bytes().contains(&0) {
                return Err(EjsonDecodeError::InvalidKey);
            }
            doc.set(key, Some(self.decode(value)?));
        }
        Ok(doc)
    }

    fn decode_binary(&self, value: &Value) -> Result<Bson, EjsonDecodeError> {
        let inner = value.as_object().ok_or(EjsonDecodeError::InvalidBinary)?;
        if inner.len() != 2 {
            return Err(EjsonDecodeError::InvalidBinary);
        }
        let base64 = inner
            .get("base64")
            .and_then(Value::as_str)
            .ok_or(EjsonDecodeError::InvalidBinary)?;
        let subtype = inner
            .get("subType")
            .and_then(Value::as_str)
            .ok_or(EjsonDecodeError::InvalidBinary)?;
        let bytes = BASE64
            .decode(base64)
            .map_err(|_| EjsonDecodeError::InvalidBinary)?;
        let subtype =
            u8::from_str_radix(subtype, 16).map_err(|_| EjsonDecodeError::InvalidBinary)?;
        let binary = Binary::new(subtype, bytes).map_err(|_| EjsonDecodeError::InvalidBinary)?;
        Ok(Bson::Binary(binary))
    }

    fn decode_db_pointer(&self, value: &Value) -> Result<Bson, EjsonDecodeError> {
        let inner = value.as_object().ok_or(EjsonDecodeError::InvalidDbPointer)?;
        if inner.len() != 2 {
            return Err(EjsonDecodeError::InvalidDbPointer);
        }
        let namespace = inner
            .get("$ref")
            .and_then(Value::as_str)
            .ok_or(EjsonDecodeError::InvalidDbPointer)?
            .to_owned();
        let id = match inner.get("$id").map(|id| self.decode(id)) {
            Some(Ok(Bson::ObjectId(id))) => id,
            _ => return Err(EjsonDecodeError::InvalidDbPointer),
        };
        Ok(Bson::DbPointer(DbPointer { namespace, id }))
    }

    fn decode_date(&self, value: &Value) -> Result<Bson, EjsonDecodeError> {
        let millis = match value {
            Value::String(text) => iso::parse_iso(text).ok_or(EjsonDecodeError::InvalidDate)?,
            Value::Object(_) => match self.decode(value)? {
                Bson::Int64(millis) => millis,
                _ => return Err(EjsonDecodeError::InvalidDate),
            },
            _ => return Err(EjsonDecodeError::InvalidDate),
        };
        Ok(Bson::DateTime(DateTime::from_millis(millis)))
    }
}

fn require_len(
    map: &Map<String, Value>,
    expected: usize,
    kind: &'static str,
) -> Result<(), EjsonDecodeError> {
    if map.len() != expected {
        return Err(EjsonDecodeError::ExtraKeys(kind));
    }
    Ok(())
}

fn parse_double(text: &str) -> Result<f64, EjsonDecodeError> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => text.parse().map_err(|_| EjsonDecodeError::InvalidDouble),
    }
}

fn parse_uuid(text: &str) -> Result<Binary, EjsonDecodeError> {
    // 8-4-4-4-12 hyphenated lowercase/uppercase hex.
    let hyphens = [8, 13, 18, 23];
    if text.len() != 36 {
        return Err(EjsonDecodeError::InvalidUuid);
    }
    let mut bytes = Vec::with_capacity(16);
    let mut digits = text.char_indices().filter_map(|(i, c)| {
        if hyphens.contains(&i) {
            if c != '-' {
                return Some(Err(EjsonDecodeError::InvalidUuid));
            }
            None
        } else {
            Some(c.to_digit(16).map(|d| d as u8).ok_or(EjsonDecodeError::InvalidUuid))
        }
    });
    while let (Some(hi), Some(lo)) = (digits.next().transpose()?, digits.next().transpose()?) {
        bytes.push((hi << 4) | lo);
    }
    if bytes.len() != 16 {
        return Err(EjsonDecodeError::InvalidUuid);
    }
    Binary::new(Binary::SUBTYPE_UUID, bytes).map_err(|_| EjsonDecodeError::InvalidUuid)
}

fn decode_timestamp(value: &Value) -> Result<Bson, EjsonDecodeError> {
    let inner = value.as_object().ok_or(EjsonDecodeError::InvalidTimestamp)?;
    if inner.len() != 2 {
        return Err(EjsonDecodeError::InvalidTimestamp);
    }
    let field = |name: &str| -> Result<u32, EjsonDecodeError> {
        inner
            .get(name)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(EjsonDecodeError::InvalidTimestamp)
    };
    Ok(Bson::Timestamp(Timestamp {
        time: field("t")?,
        increment: field("i")?,
    }))
}

fn decode_regex(value: &Value) -> Result<Bson, EjsonDecodeError> {
    let inner = value
        .as_object()
        .ok_or(EjsonDecodeError::InvalidRegularExpression)?;
    if inner.len() != 2 {
        return Err(EjsonDecodeError::InvalidRegularExpression);
    }
    let field = |name: &str| -> Result<String, EjsonDecodeError> {
        inner
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(EjsonDecodeError::InvalidRegularExpression)
    };
    let pattern = field("pattern")?;
    let options = field("options")?;
    // Both fields are null-terminated on the wire.
    if pattern.as_bytes().contains(&0) || options.as_bytes().contains(&0) {
        return Err(EjsonDecodeError::InvalidRegularExpression);
    }
    Ok(Bson::Regex(Regex { pattern, options }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> Result<Bson, EjsonDecodeError> {
        EjsonDecoder::new().decode_str(input)
    }

    #[test]
    fn scalars_map_directly() {
        assert_eq!(decode("null").unwrap(), Bson::Null);
        assert_eq!(decode("true").unwrap(), Bson::Boolean(true));
        assert_eq!(decode("42").unwrap(), Bson::Int32(42));
        assert_eq!(decode("2147483648").unwrap(), Bson::Int64(2_147_483_648));
        assert_eq!(decode("1.5").unwrap(), Bson::Double(1.5));
        assert_eq!(decode("\"hi\"").unwrap(), Bson::String("hi".into()));
    }

    #[test]
    fn wrappers_decode() {
        assert_eq!(
            decode("{\"$numberInt\":\"42\"}").unwrap(),
            Bson::Int32(42)
        );
        assert_eq!(
            decode("{\"$numberDouble\":\"NaN\"}").unwrap(),
            Bson::Double(f64::NAN)
        );
        assert_eq!(
            decode("{\"$oid\":\"507f1f77bcf86cd799439011\"}").unwrap(),
            Bson::ObjectId(ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap())
        );
        assert_eq!(
            decode("{\"$timestamp\":{\"t\":7,\"i\":3}}").unwrap(),
            Bson::Timestamp(Timestamp { time: 7, increment: 3 })
        );
        assert_eq!(decode("{\"$minKey\":1}").unwrap(), Bson::MinKey);
        assert_eq!(decode("{\"$undefined\":true}").unwrap(), Bson::Undefined);
    }

    #[test]
    fn both_date_forms_decode() {
        let expected = Bson::DateTime(DateTime::from_millis(1_672_531_200_000));
        assert_eq!(
            decode("{\"$date\":\"2023-01-01T00:00:00Z\"}").unwrap(),
            expected
        );
        assert_eq!(
            decode("{\"$date\":{\"$numberLong\":\"1672531200000\"}}").unwrap(),
            expected
        );
        assert_eq!(
            decode("{\"$date\":\"not-a-date\"}"),
            Err(EjsonDecodeError::InvalidDate)
        );
    }

    #[test]
    fn uuid_decodes_to_subtype_four_binary() {
        let decoded = decode("{\"$uuid\":\"00112233-4455-6677-8899-aabbccddeeff\"}").unwrap();
        let Bson::Binary(binary) = decoded else {
            panic!("expected binary")
        };
        assert_eq!(binary.subtype, Binary::SUBTYPE_UUID);
        assert_eq!(binary.bytes.len(), 16);
        assert_eq!(binary.bytes[0], 0x00);
        assert_eq!(binary.bytes[15], 0xff);
        assert_eq!(
            decode("{\"$uuid\":\"0011223344556677\"}"),
            Err(EjsonDecodeError::InvalidUuid)
        );
    }

    #[test]
    fn extra_keys_are_rejected() {
        assert_eq!(
            decode("{\"$oid\":\"507f1f77bcf86cd799439011\",\"x\":1}"),
            Err(EjsonDecodeError::ExtraKeys("ObjectId"))
        );
        assert_eq!(
            decode("{\"$code\":\"f()\",\"x\":1}"),
            Err(EjsonDecodeError::ExtraKeys("Code"))
        );
    }

    #[test]
    fn malformed_wrappers_are_rejected() {
        assert_eq!(
            decode("{\"$oid\":\"zz\"}"),
            Err(EjsonDecodeError::InvalidObjectId)
        );
        assert_eq!(
            decode("{\"$numberInt\":\"abc\"}"),
            Err(EjsonDecodeError::InvalidInt32)
        );
        assert_eq!(
            decode("{\"$numberDecimal\":\"123.4.5\"}"),
            Err(EjsonDecodeError::InvalidDecimal128)
        );
        assert_eq!(
            decode("{\"$binary\":{\"base64\":\"!!\",\"subType\":\"00\"}}"),
            Err(EjsonDecodeError::InvalidBinary)
        );
        assert_eq!(
            decode("{\"$timestamp\":{\"t\":7}}"),
            Err(EjsonDecodeError::InvalidTimestamp)
        );
        assert_eq!(
            decode("{\"$minKey\":2}"),
            Err(EjsonDecodeError::InvalidMinKey)
        );
    }

    #[test]
    fn nul_bytes_in_cstring_positions_are_rejected() {
        assert_eq!(
            decode("{\"a\\u0000b\":1}"),
            Err(EjsonDecodeError::InvalidKey)
        );
        assert_eq!(
            decode("{\"$regularExpression\":{\"pattern\":\"a\\u0000\",\"options\":\"\"}}"),
            Err(EjsonDecodeError::InvalidRegularExpression)
        );
    }

    #[test]
    fn plain_objects_become_documents() {
        let decoded = decode("{\"a\":1,\"b\":{\"c\":true}}").unwrap();
        let Bson::Document(doc) = decoded else {
            panic!("expected document")
        };
        assert_eq!(doc.get("a"), Some(Bson::Int32(1)));
        let inner = doc.get("b").and_then(|v| v.as_document().cloned()).unwrap();
        assert_eq!(inner.get("c"), Some(Bson::Boolean(true)));
    }

    #[test]
    fn invalid_json_reports_position() {
        assert!(matches!(
            decode("{\"a\":"),
            Err(EjsonDecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn top_level_must_be_document_for_decode_document() {
        let decoder = EjsonDecoder::new();
        let value: Value = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(
            decoder.decode_document(&value),
            Err(EjsonDecodeError::NotADocument)
        );
    }
}
