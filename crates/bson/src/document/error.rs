use bson_buffers::BufferError;
use thiserror::Error;

/// Error type for decoding raw BSON buffers.
///
/// Raised by document construction and the byte-range scanner. Decoding
/// never reads out of bounds and never exposes a partially-constructed
/// document; on error the input is simply rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    #[error("unknown element type tag {0:#04x}")]
    UnknownType(u8),
    #[error("missing null terminator")]
    MissingTerminator,
    #[error("declared length {declared} does not match {actual} actual bytes")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("invalid length prefix {0}")]
    InvalidLength(i32),
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
}

impl From<BufferError> for DecodeError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => DecodeError::UnexpectedEof,
            BufferError::InvalidUtf8 => DecodeError::InvalidUtf8,
            BufferError::UnexpectedNul => DecodeError::MissingTerminator,
        }
    }
}
