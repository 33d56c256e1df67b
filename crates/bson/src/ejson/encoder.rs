//! BSON to Extended JSON encoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};

use super::iso;
use crate::document::Document;
use crate::value::Bson;

/// Options for [`EjsonEncoder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EjsonEncoderOptions {
    /// Canonical mode wraps every BSON-typed value in its `$`-keyed
    /// wrapper; relaxed mode (the default) uses native JSON numbers for
    /// finite int32/int64/double and ISO-8601 dates where representable.
    pub canonical: bool,
}

/// Encodes BSON values into the Extended JSON tree.
///
/// Encoding is total: every BSON value has an Extended JSON form, and the
/// canonical form round-trips exactly through [`EjsonDecoder`].
///
/// [`EjsonDecoder`]: super::EjsonDecoder
#[derive(Debug, Clone, Default)]
pub struct EjsonEncoder {
    canonical: bool,
}

impl EjsonEncoder {
    /// Creates a relaxed-mode encoder.
    pub fn new() -> Self {
        Self { canonical: false }
    }

    pub fn with_options(options: EjsonEncoderOptions) -> Self {
        Self {
            canonical: options.canonical,
        }
    }

    /// Encodes a document as a JSON object.
    pub fn encode_document(&self, doc: &Document) -> Value {
        let mut map = Map::new();
        for (key, value) in doc.iter() {
            map.insert(key.to_owned(), self.encode(&value));
        }
        Value::Object(map)
    }

    /// Encodes one value as its Extended JSON tree.
    pub fn encode(&self, value: &Bson) -> Value {
        match value {
            Bson::Double(v) => self.encode_double(*v),
            Bson::String(v) => Value::String(v.clone()),
            Bson::Document(v) => self.encode_document(v),
            Bson::Array(items) => {
                Value::Array(items.iter().map(|item| self.encode(item)).collect())
            }
            Bson::Binary(v) => json!({
                "$binary": {
                    "base64": BASE64.encode(&v.bytes),
                    "subType": format!("{:02x}", v.subtype),
                }
            }),
            Bson::Undefined => json!({ "$undefined": true }),
            Bson::ObjectId(v) => json!({ "$oid": v.to_hex() }),
            Bson::Boolean(v) => Value::Bool(*v),
            Bson::DateTime(v) => self.encode_datetime(v.millis()),
            Bson::Null => Value::Null,
            Bson::Regex(v) => json!({
                "$regularExpression": { "pattern": &v.pattern, "options": &v.options }
            }),
            Bson::DbPointer(v) => json!({
                "$dbPointer": { "$ref": &v.namespace, "$id": { "$oid": v.id.to_hex() } }
            }),
            Bson::JavaScriptCode(v) => json!({ "$code": v }),
            Bson::Symbol(v) => json!({ "$symbol": v }),
            Bson::JavaScriptCodeWithScope(v) => json!({
                "$code": &v.code,
                "$scope": self.encode_document(&v.scope),
            }),
            Bson::Int32(v) => {
                if self.canonical {
                    json!({ "$numberInt": v.to_string() })
                } else {
                    Value::from(*v)
                }
            }
            Bson::Timestamp(v) => json!({
                "$timestamp": { "t": v.time, "i": v.increment }
            }),
            Bson::Int64(v) => {
                if self.canonical {
                    json!({ "$numberLong": v.to_string() })
                } else {
                    Value::from(*v)
                }
            }
            Bson::Decimal128(v) => json!({ "$numberDecimal": v.to_string() }),
            Bson::MinKey => json!({ "$minKey": 1 }),
            Bson::MaxKey => json!({ "$maxKey": 1 }),
        }
    }

    /// Encodes one value as Extended JSON text.
    pub fn encode_to_string(&self, value: &Bson) -> String {
        self.encode(value).to_string()
    }

    fn encode_double(&self, v: f64) -> Value {
        if !self.canonical {
            if let Some(number) = serde_json::Number::from_f64(v) {
                return Value::Number(number);
            }
        }
        json!({ "$numberDouble": double_string(v) })
    }

    fn encode_datetime(&self, millis: i64) -> Value {
        if !self.canonical {
            if let Some(iso) = iso::format_iso(millis) {
                return json!({ "$date": iso });
            }
        }
        json!({ "$date": { "$numberLong": millis.to_string() } })
    }
}

fn double_string(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v == f64::INFINITY {
        "Infinity".to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTime;
    use crate::oid::ObjectId;
    use crate::value::{Binary, Timestamp};

    fn canonical() -> EjsonEncoder {
        EjsonEncoder::with_options(EjsonEncoderOptions { canonical: true })
    }

    #[test]
    fn canonical_numbers_are_wrapped() {
        let enc = canonical();
        assert_eq!(
            enc.encode_to_string(&Bson::Int32(42)),
            "{\"$numberInt\":\"42\"}"
        );
        assert_eq!(
            enc.encode_to_string(&Bson::Int64(2_147_483_648)),
            "{\"$numberLong\":\"2147483648\"}"
        );
        assert_eq!(
            enc.encode_to_string(&Bson::Double(1.5)),
            "{\"$numberDouble\":\"1.5\"}"
        );
        assert_eq!(
            enc.encode_to_string(&Bson::Double(f64::NEG_INFINITY)),
            "{\"$numberDouble\":\"-Infinity\"}"
        );
    }

    #[test]
    fn relaxed_numbers_are_native() {
        let enc = EjsonEncoder::new();
        assert_eq!(enc.encode_to_string(&Bson::Int32(42)), "42");
        assert_eq!(enc.encode_to_string(&Bson::Int64(42)), "42");
        assert_eq!(enc.encode_to_string(&Bson::Double(1.5)), "1.5");
        // Non-finite doubles fall back to the wrapper.
        assert_eq!(
            enc.encode_to_string(&Bson::Double(f64::NAN)),
            "{\"$numberDouble\":\"NaN\"}"
        );
    }

    #[test]
    fn canonical_date_uses_number_long() {
        let enc = canonical();
        assert_eq!(
            enc.encode_to_string(&Bson::DateTime(DateTime::from_millis(1_672_531_200_000))),
            "{\"$date\":{\"$numberLong\":\"1672531200000\"}}"
        );
    }

    #[test]
    fn relaxed_date_uses_iso_in_range() {
        let enc = EjsonEncoder::new();
        assert_eq!(
            enc.encode_to_string(&Bson::DateTime(DateTime::from_millis(1_672_531_200_000))),
            "{\"$date\":\"2023-01-01T00:00:00.000Z\"}"
        );
        // Pre-epoch dates keep the canonical wrapper even in relaxed mode.
        assert_eq!(
            enc.encode_to_string(&Bson::DateTime(DateTime::from_millis(-1))),
            "{\"$date\":{\"$numberLong\":\"-1\"}}"
        );
    }

    #[test]
    fn wrapped_types() {
        let enc = canonical();
        let id = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(
            enc.encode_to_string(&Bson::ObjectId(id)),
            "{\"$oid\":\"507f1f77bcf86cd799439011\"}"
        );
        assert_eq!(
            enc.encode_to_string(&Bson::Binary(Binary::generic(vec![1, 2, 3]))),
            "{\"$binary\":{\"base64\":\"AQID\",\"subType\":\"00\"}}"
        );
        assert_eq!(
            enc.encode_to_string(&Bson::Timestamp(Timestamp { time: 7, increment: 3 })),
            "{\"$timestamp\":{\"t\":7,\"i\":3}}"
        );
        assert_eq!(enc.encode_to_string(&Bson::MinKey), "{\"$minKey\":1}");
        assert_eq!(
            enc.encode_to_string(&Bson::Undefined),
            "{\"$undefined\":true}"
        );
    }

    #[test]
    fn documents_preserve_key_order() {
        let mut doc = Document::new();
        doc.insert("z", 1i32);
        doc.insert("a", 2i32);
        let enc = canonical();
        assert_eq!(
            enc.encode_document(&doc).to_string(),
            "{\"z\":{\"$numberInt\":\"1\"},\"a\":{\"$numberInt\":\"2\"}}"
        );
    }
}
