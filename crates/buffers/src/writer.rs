//! Little-endian binary buffer writer with auto-growing capacity.

/// A binary buffer writer that grows automatically as needed.
///
/// All multi-byte integers are written little-endian, matching the BSON
/// wire format.
///
/// # Example
///
/// ```
/// use bson_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x10);
/// writer.i32(32);
/// let data = writer.flush();
/// assert_eq!(data, [0x10, 0x20, 0x00, 0x00, 0x00]);
/// ```
pub struct Writer {
    /// The underlying byte buffer.
    pub bytes: Vec<u8>,
    /// Position where last flush happened.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with default allocation size (4KB).
    pub fn new() -> Self {
        Self::with_alloc_size(4 * 1024)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let bytes = vec![0u8; alloc_size];
        Self {
            bytes,
            x0: 0,
            x: 0,
            alloc_size,
        }
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let remaining = self.bytes.len() - self.x;
        if remaining < capacity {
            let total = self.bytes.len() - self.x0;
            let required = capacity - remaining;
            let total_required = total + required;
            let new_size = if total_required <= self.alloc_size {
                self.alloc_size
            } else {
                total_required * 2
            };
            self.grow(new_size);
        }
    }

    fn grow(&mut self, new_size: usize) {
        let x0 = self.x0;
        let x = self.x;
        let mut new_buf = vec![0u8; new_size];
        new_buf[..x - x0].copy_from_slice(&self.bytes[x0..x]);
        self.bytes = new_buf;
        self.x = x - x0;
        self.x0 = 0;
    }

    /// Returns the written data and advances the flush position.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.bytes[self.x0..self.x].to_vec();
        self.x0 = self.x;
        result
    }

    /// Number of bytes written since the last flush.
    pub fn written(&self) -> usize {
        self.x - self.x0
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.bytes[self.x] = val;
        self.x += 1;
    }

    /// Writes a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.ensure_capacity(4);
        self.bytes[self.x..self.x + 4].copy_from_slice(&val.to_le_bytes());
        self.x += 4;
    }

    /// Writes an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.ensure_capacity(4);
        self.bytes[self.x..self.x + 4].copy_from_slice(&val.to_le_bytes());
        self.x += 4;
    }

    /// Writes a signed 64-bit integer (little-endian).
    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.ensure_capacity(8);
        self.bytes[self.x..self.x + 8].copy_from_slice(&val.to_le_bytes());
        self.x += 8;
    }

    /// Writes an unsigned 64-bit integer (little-endian).
    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.ensure_capacity(8);
        self.bytes[self.x..self.x + 8].copy_from_slice(&val.to_le_bytes());
        self.x += 8;
    }

    /// Writes a 64-bit floating point number (little-endian).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.ensure_capacity(8);
        self.bytes[self.x..self.x + 8].copy_from_slice(&val.to_le_bytes());
        self.x += 8;
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.bytes[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        let bytes = s.as_bytes();
        self.buf(bytes);
        bytes.len()
    }

    /// Writes a null-terminated UTF-8 string.
    pub fn cstr(&mut self, s: &str) {
        self.utf8(s);
        self.u8(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_i32_le() {
        let mut writer = Writer::new();
        writer.i32(32);
        assert_eq!(writer.flush(), [0x20, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_i64_roundtrip() {
        let mut writer = Writer::new();
        writer.i64(-9_999_999_999i64);
        let data = writer.flush();
        assert_eq!(data.len(), 8);
        assert_eq!(
            i64::from_le_bytes(data.try_into().unwrap()),
            -9_999_999_999i64
        );
    }

    #[test]
    fn test_cstr() {
        let mut writer = Writer::new();
        writer.cstr("abc");
        assert_eq!(writer.flush(), [b'a', b'b', b'c', 0x00]);
    }

    #[test]
    fn test_flush_multiple() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x02]);
    }

    #[test]
    fn test_grow_past_alloc_size() {
        let mut writer = Writer::with_alloc_size(4);
        writer.buf(&[0xab; 64]);
        let data = writer.flush();
        assert_eq!(data.len(), 64);
        assert!(data.iter().all(|&b| b == 0xab));
    }
}
