//! BSON document model and binary codec.
//!
//! BSON is a little-endian binary serialization format for ordered
//! key/value documents. This crate provides:
//!
//! - [`Bson`] - the tagged union covering every BSON value type
//! - [`Document`] - an ordered map backed by the raw BSON byte encoding,
//!   with lazy byte-range key lookup
//! - [`ObjectId`] - the 12-byte identifier with a process-wide generator
//! - [`Decimal128`] - the IEEE-754-2008 decimal floating point type
//! - [`EjsonEncoder`]/[`EjsonDecoder`] - the canonical/relaxed Extended
//!   JSON bridge
//!
//! # Example
//!
//! ```
//! use bson_rs::{Bson, Document};
//!
//! let mut doc = Document::new();
//! doc.insert("name", "Alice");
//! doc.insert("age", 30i32);
//!
//! assert_eq!(doc.get("age"), Some(Bson::Int32(30)));
//!
//! let bytes = doc.clone().into_bytes();
//! let back = Document::from_bytes(bytes).unwrap();
//! assert_eq!(back, doc);
//! ```

pub mod datetime;
pub mod decimal128;
pub mod document;
pub mod ejson;
pub mod oid;
pub mod value;

pub use datetime::{DateTime, DateTimeError};
pub use decimal128::{Decimal128, ParseDecimalError};
pub use document::{DecodeError, Document};
pub use ejson::{EjsonDecodeError, EjsonDecoder, EjsonEncoder, EjsonEncoderOptions};
pub use oid::{ObjectId, ObjectIdError};
pub use value::{
    Binary, BinaryError, Bson, CodeWithScope, DbPointer, ElementType, Regex, Timestamp,
};
