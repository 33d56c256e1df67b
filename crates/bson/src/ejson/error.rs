//! Error types for Extended JSON decoding.

use thiserror::Error;

/// Errors raised while decoding Extended JSON into BSON values.
///
/// Every variant is recoverable; the offending wrapper kind is named so
/// callers can surface it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EjsonDecodeError {
    /// Generic JSON parse error at the given column.
    #[error("invalid JSON at column {0}")]
    InvalidJson(usize),
    #[error("invalid ObjectId wrapper")]
    InvalidObjectId,
    #[error("invalid Int32 wrapper")]
    InvalidInt32,
    #[error("invalid Int64 wrapper")]
    InvalidInt64,
    #[error("invalid Double wrapper")]
    InvalidDouble,
    #[error("invalid Decimal128 wrapper")]
    InvalidDecimal128,
    #[error("invalid Binary wrapper")]
    InvalidBinary,
    #[error("invalid UUID wrapper")]
    InvalidUuid,
    #[error("invalid Code wrapper")]
    InvalidCode,
    #[error("invalid CodeWithScope wrapper")]
    InvalidCodeWithScope,
    #[error("invalid Symbol wrapper")]
    InvalidSymbol,
    #[error("invalid Timestamp wrapper")]
    InvalidTimestamp,
    #[error("invalid RegularExpression wrapper")]
    InvalidRegularExpression,
    #[error("invalid DBPointer wrapper")]
    InvalidDbPointer,
    #[error("invalid Date wrapper")]
    InvalidDate,
    #[error("invalid MinKey wrapper")]
    InvalidMinKey,
    #[error("invalid MaxKey wrapper")]
    InvalidMaxKey,
    #[error("invalid Undefined wrapper")]
    InvalidUndefined,
    /// Document keys are null-terminated on the BSON wire and cannot
    /// embed a NUL byte.
    #[error("invalid document key: embedded NUL byte")]
    InvalidKey,
    /// A single-key type wrapper carried additional keys.
    #[error("invalid {0} wrapper: extra keys not allowed")]
    ExtraKeys(&'static str),
    #[error("top-level value is not a document")]
    NotADocument,
}
