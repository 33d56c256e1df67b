//! The BSON value model: every element type the wire format can carry.

use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::oid::ObjectId;

/// The one-byte type tag that precedes every element on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    EmbeddedDocument = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    RegularExpression = 0x0B,
    DbPointer = 0x0C,
    JavaScriptCode = 0x0D,
    Symbol = 0x0E,
    JavaScriptCodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl ElementType {
    /// Maps a wire tag byte to its element type, `None` for unassigned
    /// tags.
    pub fn from_u8(tag: u8) -> Option<ElementType> {
        Some(match tag {
            0x01 => ElementType::Double,
            0x02 => ElementType::String,
            0x03 => ElementType::EmbeddedDocument,
            0x04 => ElementType::Array,
            0x05 => ElementType::Binary,
            0x06 => ElementType::Undefined,
            0x07 => ElementType::ObjectId,
            0x08 => ElementType::Boolean,
            0x09 => ElementType::DateTime,
            0x0A => ElementType::Null,
            0x0B => ElementType::RegularExpression,
            0x0C => ElementType::DbPointer,
            0x0D => ElementType::JavaScriptCode,
            0x0E => ElementType::Symbol,
            0x0F => ElementType::JavaScriptCodeWithScope,
            0x10 => ElementType::Int32,
            0x11 => ElementType::Timestamp,
            0x12 => ElementType::Int64,
            0x13 => ElementType::Decimal128,
            0x7F => ElementType::MaxKey,
            0xFF => ElementType::MinKey,
            _ => return None,
        })
    }
}

/// Error type for binary payload construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinaryError {
    #[error("UUID binary subtype {subtype:#04x} requires 16 bytes, got {len}")]
    InvalidUuidLength { subtype: u8, len: usize },
}

/// A binary payload with its one-byte subtype.
///
/// The fields are not public: construction goes through [`Binary::new`]
/// or [`Binary::generic`], so the UUID length rule always holds for
/// values built in user code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub(crate) subtype: u8,
    pub(crate) bytes: Vec<u8>,
}

impl Binary {
    pub const SUBTYPE_GENERIC: u8 = 0x00;
    pub const SUBTYPE_UUID_OLD: u8 = 0x03;
    pub const SUBTYPE_UUID: u8 = 0x04;
    pub const SUBTYPE_MD5: u8 = 0x05;

    /// Constructs a binary payload, rejecting UUID subtypes whose payload
    /// is not exactly 16 bytes.
    pub fn new(subtype: u8, bytes: Vec<u8>) -> Result<Self, BinaryError> {
        if (subtype == Self::SUBTYPE_UUID || subtype == Self::SUBTYPE_UUID_OLD)
            && bytes.len() != 16
        {
            return Err(BinaryError::InvalidUuidLength {
                subtype,
                len: bytes.len(),
            });
        }
        Ok(Self { subtype, bytes })
    }

    /// Constructs a generic (subtype 0) binary payload.
    pub fn generic(bytes: Vec<u8>) -> Self {
        Self {
            subtype: Self::SUBTYPE_GENERIC,
            bytes,
        }
    }

    /// The one-byte subtype tag.
    pub fn subtype(&self) -> u8 {
        self.subtype
    }

    /// The payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the payload, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A regular expression pattern with its option flags, both stored as the
/// raw strings carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl Regex {
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            options: options.into(),
        }
    }
}

/// The internal replication timestamp: a seconds value and an ordinal
/// within that second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// The deprecated DBPointer pairing a namespace with an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

/// JavaScript code bundled with a scope document of bound variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeWithScope {
    pub code: String,
    pub scope: Document,
}

/// Any BSON value.
///
/// Numeric variants compare by mathematical value across representations:
/// `Int32(5)`, `Int64(5)`, `Double(5.0)` and a decimal `5` are all equal.
/// Doubles use container semantics, so `NaN == NaN` and `0.0 == -0.0`.
/// The `Hash` implementation agrees with that equality.
#[derive(Debug, Clone)]
pub enum Bson {
    Double(f64),
    String(String),
    Document(Document),
    Array(Vec<Bson>),
    Binary(Binary),
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(DateTime),
    Null,
    Regex(Regex),
    DbPointer(DbPointer),
    JavaScriptCode(String),
    Symbol(String),
    JavaScriptCodeWithScope(CodeWithScope),
    Int32(i32),
    Timestamp(Timestamp),
    Int64(i64),
    Decimal128(Decimal128),
    MinKey,
    MaxKey,
}

impl Bson {
    /// The wire tag this value serializes under.
    pub fn element_type(&self) -> ElementType {
        match self {
            Bson::Double(_) => ElementType::Double,
            Bson::String(_) => ElementType::String,
            Bson::Document(_) => ElementType::EmbeddedDocument,
            Bson::Array(_) => ElementType::Array,
            Bson::Binary(_) => ElementType::Binary,
            Bson::Undefined => ElementType::Undefined,
            Bson::ObjectId(_) => ElementType::ObjectId,
            Bson::Boolean(_) => ElementType::Boolean,
            Bson::DateTime(_) => ElementType::DateTime,
            Bson::Null => ElementType::Null,
            Bson::Regex(_) => ElementType::RegularExpression,
            Bson::DbPointer(_) => ElementType::DbPointer,
            Bson::JavaScriptCode(_) => ElementType::JavaScriptCode,
            Bson::Symbol(_) => ElementType::Symbol,
            Bson::JavaScriptCodeWithScope(_) => ElementType::JavaScriptCodeWithScope,
            Bson::Int32(_) => ElementType::Int32,
            Bson::Timestamp(_) => ElementType::Timestamp,
            Bson::Int64(_) => ElementType::Int64,
            Bson::Decimal128(_) => ElementType::Decimal128,
            Bson::MinKey => ElementType::MinKey,
            Bson::MaxKey => ElementType::MaxKey,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Bson]> {
        match self {
            Bson::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Bson::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Bson::ObjectId(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bson::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Bson::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Bson::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Bson::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal128(&self) -> Option<Decimal128> {
        match self {
            Bson::Decimal128(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Bson::Null)
    }

    /// Lossless coercion from any numeric variant, `None` when the value
    /// is not numeric or would lose information.
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(v) => Some(*v),
            Bson::Int64(v) => i32::try_from(*v).ok(),
            Bson::Double(d) => double_to_i64_exact(*d).and_then(|i| i32::try_from(i).ok()),
            Bson::Decimal128(x) => x.to_i32(),
            _ => None,
        }
    }

    /// Lossless coercion from any numeric variant, `None` when the value
    /// is not numeric or would lose information.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Bson::Int32(v) => Some(i64::from(*v)),
            Bson::Int64(v) => Some(*v),
            Bson::Double(d) => double_to_i64_exact(*d),
            Bson::Decimal128(x) => x.to_i64(),
            _ => None,
        }
    }

    /// Lossless coercion from any numeric variant, `None` when the value
    /// is not numeric or would lose information.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(d) => Some(*d),
            Bson::Int32(v) => Some(f64::from(*v)),
            Bson::Int64(v) => i64_to_f64_exact(*v),
            Bson::Decimal128(x) => x.to_f64(),
            _ => None,
        }
    }

    /// Lossless coercion from any numeric variant, `None` when the value
    /// is not numeric.
    pub fn to_decimal128(&self) -> Option<Decimal128> {
        match self {
            Bson::Decimal128(x) => Some(*x),
            Bson::Int32(v) => Some(Decimal128::from_i32(*v)),
            Bson::Int64(v) => Some(Decimal128::from_i64(*v)),
            Bson::Double(d) => Some(Decimal128::from_f64(*d)),
            _ => None,
        }
    }
}

fn double_to_i64_exact(d: f64) -> Option<i64> {
    if !d.is_finite() || d.fract() != 0.0 {
        return None;
    }
    // 2^63 itself rounds into range under `as`, so an exclusive upper
    // bound is required.
    if d < -9_223_372_036_854_775_808.0 || d >= 9_223_372_036_854_775_808.0 {
        return None;
    }
    Some(d as i64)
}

fn i64_to_f64_exact(v: i64) -> Option<f64> {
    let d = v as f64;
    if d < 9_223_372_036_854_775_808.0 && d as i64 == v {
        Some(d)
    } else {
        None
    }
}

fn double_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn numeric_eq(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => x == y,
        (Bson::Int64(x), Bson::Int64(y)) => x == y,
        (Bson::Double(x), Bson::Double(y)) => double_eq(*x, *y),
        (Bson::Decimal128(x), Bson::Decimal128(y)) => x == y,
        (Bson::Int32(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Int32(x)) => {
            i64::from(*x) == *y
        }
        (Bson::Int32(i), Bson::Double(d)) | (Bson::Double(d), Bson::Int32(i)) => {
            double_to_i64_exact(*d) == Some(i64::from(*i))
        }
        (Bson::Int64(i), Bson::Double(d)) | (Bson::Double(d), Bson::Int64(i)) => {
            double_to_i64_exact(*d) == Some(*i)
        }
        (Bson::Int32(i), Bson::Decimal128(x)) | (Bson::Decimal128(x), Bson::Int32(i)) => {
            x.to_i64() == Some(i64::from(*i))
        }
        (Bson::Int64(i), Bson::Decimal128(x)) | (Bson::Decimal128(x), Bson::Int64(i)) => {
            x.to_i64() == Some(*i)
        }
        (Bson::Double(d), Bson::Decimal128(x)) | (Bson::Decimal128(x), Bson::Double(d)) => {
            if d.is_nan() || x.is_nan() {
                d.is_nan() && x.is_nan()
            } else {
                x.to_f64() == Some(*d)
            }
        }
        _ => false,
    }
}

impl PartialEq for Bson {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Bson::String(a), Bson::String(b)) => a == b,
            (Bson::Document(a), Bson::Document(b)) => a == b,
            (Bson::Array(a), Bson::Array(b)) => a == b,
            (Bson::Binary(a), Bson::Binary(b)) => a == b,
            (Bson::Undefined, Bson::Undefined)
            | (Bson::Null, Bson::Null)
            | (Bson::MinKey, Bson::MinKey)
            | (Bson::MaxKey, Bson::MaxKey) => true,
            (Bson::ObjectId(a), Bson::ObjectId(b)) => a == b,
            (Bson::Boolean(a), Bson::Boolean(b)) => a == b,
            (Bson::DateTime(a), Bson::DateTime(b)) => a == b,
            (Bson::Regex(a), Bson::Regex(b)) => a == b,
            (Bson::DbPointer(a), Bson::DbPointer(b)) => a == b,
            (Bson::JavaScriptCode(a), Bson::JavaScriptCode(b)) => a == b,
            (Bson::Symbol(a), Bson::Symbol(b)) => a == b,
            (Bson::JavaScriptCodeWithScope(a), Bson::JavaScriptCodeWithScope(b)) => a == b,
            (Bson::Timestamp(a), Bson::Timestamp(b)) => a == b,
            (
                Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_),
                Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_),
            ) => numeric_eq(self, other),
            _ => false,
        }
    }
}

impl Eq for Bson {}

impl Hash for Bson {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // Numerics share one leading tag so equal values land on the
            // same hash regardless of variant. The cascade prefers the
            // exact i64 image, then the exact f64 image, then the
            // normalized decimal.
            Bson::Int32(v) => {
                0u8.hash(state);
                0u8.hash(state);
                i64::from(*v).hash(state);
            }
            Bson::Int64(v) => {
                0u8.hash(state);
                0u8.hash(state);
                v.hash(state);
            }
            Bson::Double(d) => {
                0u8.hash(state);
                if d.is_nan() {
                    255u8.hash(state);
                } else if let Some(i) = double_to_i64_exact(*d) {
                    0u8.hash(state);
                    i.hash(state);
                } else {
                    1u8.hash(state);
                    d.to_bits().hash(state);
                }
            }
            Bson::Decimal128(x) => {
                0u8.hash(state);
                if x.is_nan() {
                    255u8.hash(state);
                } else if let Some(i) = x.to_i64() {
                    0u8.hash(state);
                    i.hash(state);
                } else if let Some(f) = x.to_f64() {
                    1u8.hash(state);
                    f.to_bits().hash(state);
                } else {
                    2u8.hash(state);
                    x.hash(state);
                }
            }
            Bson::String(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Bson::Document(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            Bson::Array(v) => {
                4u8.hash(state);
                v.hash(state);
            }
            Bson::Binary(v) => {
                5u8.hash(state);
                v.hash(state);
            }
            Bson::Undefined => 6u8.hash(state),
            Bson::ObjectId(v) => {
                7u8.hash(state);
                v.hash(state);
            }
            Bson::Boolean(v) => {
                8u8.hash(state);
                v.hash(state);
            }
            Bson::DateTime(v) => {
                9u8.hash(state);
                v.hash(state);
            }
            Bson::Null => 10u8.hash(state),
            Bson::Regex(v) => {
                11u8.hash(state);
                v.hash(state);
            }
            Bson::DbPointer(v) => {
                12u8.hash(state);
                v.hash(state);
            }
            Bson::JavaScriptCode(v) => {
                13u8.hash(state);
                v.hash(state);
            }
            Bson::Symbol(v) => {
                14u8.hash(state);
                v.hash(state);
            }
            Bson::JavaScriptCodeWithScope(v) => {
                15u8.hash(state);
                v.hash(state);
            }
            Bson::Timestamp(v) => {
                17u8.hash(state);
                v.hash(state);
            }
            Bson::MinKey => 20u8.hash(state),
            Bson::MaxKey => 21u8.hash(state),
        }
    }
}

impl From<f64> for Bson {
    fn from(value: f64) -> Self {
        Bson::Double(value)
    }
}

impl From<&str> for Bson {
    fn from(value: &str) -> Self {
        Bson::String(value.to_owned())
    }
}

impl From<String> for Bson {
    fn from(value: String) -> Self {
        Bson::String(value)
    }
}

impl From<Document> for Bson {
    fn from(value: Document) -> Self {
        Bson::Document(value)
    }
}

impl From<Vec<Bson>> for Bson {
    fn from(value: Vec<Bson>) -> Self {
        Bson::Array(value)
    }
}

impl From<Binary> for Bson {
    fn from(value: Binary) -> Self {
        Bson::Binary(value)
    }
}

impl From<ObjectId> for Bson {
    fn from(value: ObjectId) -> Self {
        Bson::ObjectId(value)
    }
}

impl From<bool> for Bson {
    fn from(value: bool) -> Self {
        Bson::Boolean(value)
    }
}

impl From<DateTime> for Bson {
    fn from(value: DateTime) -> Self {
        Bson::DateTime(value)
    }
}

impl From<Regex> for Bson {
    fn from(value: Regex) -> Self {
        Bson::Regex(value)
    }
}

impl From<DbPointer> for Bson {
    fn from(value: DbPointer) -> Self {
        Bson::DbPointer(value)
    }
}

impl From<CodeWithScope> for Bson {
    fn from(value: CodeWithScope) -> Self {
        Bson::JavaScriptCodeWithScope(value)
    }
}

impl From<i32> for Bson {
    fn from(value: i32) -> Self {
        Bson::Int32(value)
    }
}

impl From<Timestamp> for Bson {
    fn from(value: Timestamp) -> Self {
        Bson::Timestamp(value)
    }
}

impl From<i64> for Bson {
    fn from(value: i64) -> Self {
        Bson::Int64(value)
    }
}

impl From<Decimal128> for Bson {
    fn from(value: Decimal128) -> Self {
        Bson::Decimal128(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Bson) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn dec(s: &str) -> Bson {
        Bson::Decimal128(s.parse().unwrap())
    }

    #[test]
    fn tag_mapping_roundtrips() {
        for tag in 0x01..=0x13u8 {
            let ty = ElementType::from_u8(tag).unwrap();
            assert_eq!(ty as u8, tag);
        }
        assert_eq!(ElementType::from_u8(0x7F), Some(ElementType::MaxKey));
        assert_eq!(ElementType::from_u8(0xFF), Some(ElementType::MinKey));
        assert_eq!(ElementType::from_u8(0x14), None);
        assert_eq!(ElementType::from_u8(0x00), None);
    }

    #[test]
    fn numeric_equality_spans_variants() {
        assert_eq!(Bson::Int32(5), Bson::Int64(5));
        assert_eq!(Bson::Int32(5), Bson::Double(5.0));
        assert_eq!(Bson::Int64(5), Bson::Double(5.0));
        assert_eq!(Bson::Int32(5), dec("5"));
        assert_eq!(Bson::Int64(5), dec("5.0"));
        assert_eq!(Bson::Double(0.1), dec("0.1"));
        assert_ne!(Bson::Int32(5), Bson::Double(5.5));
        assert_ne!(Bson::Int64(5), dec("5.5"));
    }

    #[test]
    fn double_container_semantics() {
        assert_eq!(Bson::Double(f64::NAN), Bson::Double(f64::NAN));
        assert_eq!(Bson::Double(0.0), Bson::Double(-0.0));
        assert_eq!(Bson::Double(f64::NAN), dec("NaN"));
        assert_eq!(Bson::Double(f64::INFINITY), dec("Infinity"));
        assert_ne!(Bson::Double(f64::INFINITY), dec("-Infinity"));
    }

    #[test]
    fn numeric_hash_agrees_with_equality() {
        let groups = [
            vec![Bson::Int32(5), Bson::Int64(5), Bson::Double(5.0), dec("5")],
            vec![Bson::Double(0.1), dec("0.1")],
            vec![Bson::Double(f64::NAN), dec("NaN")],
            vec![Bson::Double(0.0), Bson::Double(-0.0), Bson::Int32(0), dec("-0")],
            vec![Bson::Double(f64::INFINITY), dec("Infinity")],
        ];
        for group in &groups {
            let first = hash_of(&group[0]);
            for value in group {
                assert_eq!(hash_of(value), first, "{value:?}");
            }
        }
    }

    #[test]
    fn coercions_are_lossless() {
        assert_eq!(Bson::Int64(5).to_i32(), Some(5));
        assert_eq!(Bson::Int64(i64::from(i32::MAX) + 1).to_i32(), None);
        assert_eq!(Bson::Double(5.0).to_i64(), Some(5));
        assert_eq!(Bson::Double(5.5).to_i64(), None);
        assert_eq!(Bson::Double(9_223_372_036_854_775_808.0).to_i64(), None);
        assert_eq!(Bson::Int32(7).to_f64(), Some(7.0));
        assert_eq!(Bson::Int64(1 << 53).to_f64(), Some(9_007_199_254_740_992.0));
        assert_eq!(Bson::Int64((1 << 53) + 1).to_f64(), None);
        assert_eq!(Bson::Int64(i64::MAX).to_f64(), None);
        assert_eq!(dec("42").to_i32(), Some(42));
        assert_eq!(Bson::String("5".into()).to_i32(), None);
        assert_eq!(
            Bson::Int64(12).to_decimal128(),
            Some("12".parse().unwrap())
        );
    }

    #[test]
    fn symbol_and_string_stay_distinct() {
        assert_ne!(Bson::Symbol("a".into()), Bson::String("a".into()));
    }

    #[test]
    fn uuid_binary_length_is_checked() {
        let uuid = Binary::new(Binary::SUBTYPE_UUID, vec![7; 16]).unwrap();
        assert_eq!(uuid.subtype(), Binary::SUBTYPE_UUID);
        assert_eq!(uuid.bytes(), &[7; 16]);
        assert_eq!(
            Binary::new(Binary::SUBTYPE_UUID, vec![0; 4]),
            Err(BinaryError::InvalidUuidLength {
                subtype: 0x04,
                len: 4
            })
        );
        assert!(Binary::new(Binary::SUBTYPE_GENERIC, vec![0; 4]).is_ok());
    }
}
