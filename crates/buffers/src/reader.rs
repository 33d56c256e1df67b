//! Checked little-endian buffer reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A binary buffer reader that reads little-endian data from a byte slice.
///
/// The reader maintains a cursor position and provides checked read methods
/// that fail with [`BufferError`] instead of panicking when the buffer is
/// exhausted.
///
/// # Example
///
/// ```
/// use bson_buffers::Reader;
///
/// let data = [0x20, 0x00, 0x00, 0x00];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_i32().unwrap(), 32);
/// assert!(reader.try_u8().is_err());
/// ```
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub bytes: &'a [u8],
    /// Current cursor position.
    pub x: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given byte slice.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, x: 0 }
    }

    /// Creates a reader positioned at `x`.
    pub fn at(bytes: &'a [u8], x: usize) -> Self {
        Self { bytes, x }
    }

    /// Resets the reader with a new byte slice.
    pub fn reset(&mut self, bytes: &'a [u8]) {
        self.bytes = bytes;
        self.x = 0;
    }

    /// Returns the number of remaining bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.x
    }

    /// Returns true once the cursor has consumed the whole slice.
    pub fn is_empty(&self) -> bool {
        self.x >= self.bytes.len()
    }

    /// Peeks at the current byte without advancing the cursor.
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.x).copied()
    }

    /// Advances the cursor by `length` bytes.
    pub fn try_skip(&mut self, length: usize) -> Result<(), BufferError> {
        if self.remaining() < length {
            return Err(BufferError::EndOfBuffer);
        }
        self.x += length;
        Ok(())
    }

    /// Returns a subslice of the given size and advances the cursor.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        if self.remaining() < size {
            return Err(BufferError::EndOfBuffer);
        }
        let bin = &self.bytes[self.x..self.x + size];
        self.x += size;
        Ok(bin)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        let val = *self.bytes.get(self.x).ok_or(BufferError::EndOfBuffer)?;
        self.x += 1;
        Ok(val)
    }

    /// Reads a signed 32-bit integer (little-endian).
    #[inline]
    pub fn try_i32(&mut self) -> Result<i32, BufferError> {
        let bytes = self.try_buf(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn try_u32(&mut self) -> Result<u32, BufferError> {
        let bytes = self.try_buf(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a signed 64-bit integer (little-endian).
    #[inline]
    pub fn try_i64(&mut self) -> Result<i64, BufferError> {
        let bytes = self.try_buf(8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads an unsigned 64-bit integer (little-endian).
    #[inline]
    pub fn try_u64(&mut self) -> Result<u64, BufferError> {
        let bytes = self.try_buf(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads a 64-bit floating point number (little-endian).
    #[inline]
    pub fn try_f64(&mut self) -> Result<f64, BufferError> {
        let bytes = self.try_buf(8)?;
        Ok(f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads a UTF-8 string of the given byte size.
    pub fn try_utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        let bytes = self.try_buf(size)?;
        str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }

    /// Reads the raw bytes of a null-terminated string and consumes the
    /// terminator. The returned slice excludes the terminator.
    pub fn try_cstr_bytes(&mut self) -> Result<&'a [u8], BufferError> {
        let start = self.x;
        let rel = self.bytes[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(BufferError::UnexpectedNul)?;
        self.x = start + rel + 1;
        Ok(&self.bytes[start..start + rel])
    }

    /// Reads a null-terminated UTF-8 string and consumes the terminator.
    pub fn try_cstr(&mut self) -> Result<&'a str, BufferError> {
        let bytes = self.try_cstr_bytes()?;
        str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_u8().unwrap(), 0x01);
        assert_eq!(reader.try_u8().unwrap(), 0x02);
        assert_eq!(reader.try_u8().unwrap(), 0x03);
        assert_eq!(reader.try_u8(), Err(BufferError::EndOfBuffer));
    }

    #[test]
    fn test_i32_le() {
        let data = [0x20, 0x00, 0x00, 0x00];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_i32().unwrap(), 32);
    }

    #[test]
    fn test_i64_le() {
        let data = (-9_999_999_999i64).to_le_bytes();
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_i64().unwrap(), -9_999_999_999);
    }

    #[test]
    fn test_f64_le() {
        let data = 1.5f64.to_le_bytes();
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_skip() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = Reader::new(&data);
        reader.try_skip(2).unwrap();
        assert_eq!(reader.try_u8().unwrap(), 0x03);
        assert_eq!(reader.try_skip(2), Err(BufferError::EndOfBuffer));
    }

    #[test]
    fn test_cstr() {
        let data = b"hello\x00world\x00";
        let mut reader = Reader::new(data);
        assert_eq!(reader.try_cstr().unwrap(), "hello");
        assert_eq!(reader.try_cstr().unwrap(), "world");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_cstr_missing_terminator() {
        let data = b"hello";
        let mut reader = Reader::new(data);
        assert_eq!(reader.try_cstr(), Err(BufferError::UnexpectedNul));
    }

    #[test]
    fn test_cstr_invalid_utf8() {
        let data = [0xff, 0xfe, 0x00];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_cstr(), Err(BufferError::InvalidUtf8));
    }

    #[test]
    fn test_utf8() {
        let data = b"hello world";
        let mut reader = Reader::new(data);
        assert_eq!(reader.try_utf8(5).unwrap(), "hello");
        assert_eq!(reader.try_utf8(6).unwrap(), " world");
        assert!(reader.try_utf8(1).is_err());
    }

    #[test]
    fn test_buf_out_of_bounds() {
        let data = [0x01, 0x02];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_buf(3), Err(BufferError::EndOfBuffer));
        // Cursor must not move on failure.
        assert_eq!(reader.try_buf(2).unwrap(), &[0x01, 0x02]);
    }
}
