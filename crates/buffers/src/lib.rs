//! Little-endian binary buffer utilities for bson-rs.
//!
//! BSON is a little-endian format decoded from untrusted byte buffers, so
//! every read here is bounds-checked and returns a [`Result`] instead of
//! panicking.
//!
//! # Overview
//!
//! - [`Reader`] - Reads binary data from a byte slice with cursor tracking
//! - [`Writer`] - Writes binary data to an auto-growing buffer
//!
//! # Example
//!
//! ```
//! use bson_buffers::{Reader, Writer};
//!
//! // Write some data
//! let mut writer = Writer::new();
//! writer.u8(0x01);
//! writer.i32(0x0203);
//! writer.cstr("hello");
//! let data = writer.flush();
//!
//! // Read it back
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.try_u8().unwrap(), 0x01);
//! assert_eq!(reader.try_i32().unwrap(), 0x0203);
//! assert_eq!(reader.try_cstr().unwrap(), "hello");
//! ```

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    EndOfBuffer,
    /// Invalid UTF-8 sequence.
    InvalidUtf8,
    /// A null-terminated string was not terminated within the buffer.
    UnexpectedNul,
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::EndOfBuffer => write!(f, "end of buffer"),
            BufferError::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            BufferError::UnexpectedNul => write!(f, "missing null terminator"),
        }
    }
}

impl std::error::Error for BufferError {}
