//! Binary buffer writer with auto-growing capacity.

use crate::{BufferError, MAX_INT_WIDTH};

/// A binary buffer writer that grows automatically as needed.
///
/// All multi-byte quantities are written big-endian. [`Writer::x`] is the
/// number of bytes written since the last [`Writer::flush`], which is what
/// offset tables are built from.
///
/// # Example
///
/// ```
/// use plist_pack_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// assert_eq!(writer.x(), 3);
/// let data = writer.flush();
/// assert_eq!(data, [0x01, 0x02, 0x03]);
/// ```
#[derive(Debug, Clone)]
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Capacity reserved on creation and after each flush.
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with default allocation size (64KB).
    pub fn new() -> Self {
        Self::with_alloc_size(64 * 1024)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(alloc_size),
            alloc_size,
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn x(&self) -> usize {
        self.uint8.len()
    }

    /// Discards everything written since the last flush.
    pub fn reset(&mut self) {
        self.uint8.clear();
    }

    /// Returns the written bytes and starts a fresh buffer.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.uint8, Vec::with_capacity(self.alloc_size))
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    /// Writes an unsigned 16-bit integer.
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes an unsigned 32-bit integer.
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes an unsigned 64-bit integer.
    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a signed 64-bit integer.
    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a 32-bit floating point number.
    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a 64-bit floating point number.
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a u8 followed by a f64.
    pub fn u8f64(&mut self, u8_val: u8, f64_val: f64) {
        self.u8(u8_val);
        self.f64(f64_val);
    }

    /// Writes the low `width` bytes of `val`, big-endian.
    ///
    /// Bits above `width * 8` are dropped; callers pick a width that holds
    /// the value.
    pub fn uint_be(&mut self, width: usize, val: u128) -> Result<(), BufferError> {
        check_width(width)?;
        self.uint8
            .extend_from_slice(&val.to_be_bytes()[MAX_INT_WIDTH - width..]);
        Ok(())
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.uint8.extend_from_slice(s.as_bytes());
        s.len()
    }

    /// Writes a string as UTF-16 big-endian code units. Returns the number of
    /// code units written.
    pub fn utf16_be(&mut self, s: &str) -> usize {
        let mut count = 0;
        for unit in s.encode_utf16() {
            self.u16(unit);
            count += 1;
        }
        count
    }
}

fn check_width(width: usize) -> Result<(), BufferError> {
    if width == 0 || width > MAX_INT_WIDTH {
        Err(BufferError::InvalidWidth(width))
    } else {
        Ok(())
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
    fn test_flush_multiple() {
        let mut writer = Writer::with_alloc_size(1);
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u32(0x0203_0405);
        assert_eq!(writer.x(), 4);
        assert_eq!(writer.flush(), [0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    fn test_uint_be_truncates_to_width() {
        let mut writer = Writer::new();
        writer.uint_be(2, 0x0001_0203).unwrap();
        writer.uint_be(1, 0xff).unwrap();
        assert_eq!(writer.flush(), [0x02, 0x03, 0xff]);
    }

    #[test]
    fn test_invalid_width() {
        let mut writer = Writer::new();
        assert_eq!(writer.uint_be(0, 1), Err(BufferError::InvalidWidth(0)));
        assert_eq!(writer.uint_be(17, 1), Err(BufferError::InvalidWidth(17)));
        assert_eq!(writer.x(), 0);
    }

    #[test]
    fn test_utf16_be() {
        let mut writer = Writer::new();
        assert_eq!(writer.utf16_be("h\u{e9}\u{1f600}"), 4);
        assert_eq!(
            writer.flush(),
            [0x00, 0x68, 0x00, 0xe9, 0xd8, 0x3d, 0xde, 0x00]
        );
    }
}
