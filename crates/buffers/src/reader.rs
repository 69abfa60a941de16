//! Bounds-checked binary buffer reader with cursor tracking.

use crate::{BufferError, MAX_INT_WIDTH};

/// A binary buffer reader over a byte slice.
///
/// The reader keeps a cursor `x` and never reads past `uint8.len()`: every
/// read method checks the remaining length first and returns
/// [`BufferError::EndOfBuffer`] instead of panicking.
///
/// # Example
///
/// ```
/// use plist_pack_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03, 0x04];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_u8(), Ok(0x01));
/// assert_eq!(reader.try_u16(), Ok(0x0203));
/// assert_eq!(reader.size(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader positioned at the start of `uint8`.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self { uint8, x: 0 }
    }

    /// Creates a reader positioned at `x`.
    pub fn at(uint8: &'a [u8], x: usize) -> Self {
        Self { uint8, x }
    }

    /// Returns the number of bytes left after the cursor.
    pub fn size(&self) -> usize {
        self.uint8.len().saturating_sub(self.x)
    }

    /// Checks that `n` more bytes are available from the current cursor.
    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        match self.x.checked_add(n) {
            Some(end) if end <= self.uint8.len() => Ok(()),
            _ => Err(BufferError::EndOfBuffer),
        }
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.uint8[self.x..self.x + N]);
        self.x += N;
        Ok(out)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    /// Reads an unsigned 16-bit big-endian integer.
    #[inline]
    pub fn try_u16(&mut self) -> Result<u16, BufferError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Reads an unsigned 64-bit big-endian integer.
    #[inline]
    pub fn try_u64(&mut self) -> Result<u64, BufferError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Reads a 32-bit big-endian float.
    #[inline]
    pub fn try_f32(&mut self) -> Result<f32, BufferError> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    /// Reads a 64-bit big-endian float.
    #[inline]
    pub fn try_f64(&mut self) -> Result<f64, BufferError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    /// Reads an unsigned big-endian integer of `width` bytes (1 to 16).
    pub fn try_uint_be(&mut self, width: usize) -> Result<u128, BufferError> {
        let bytes = self.int_bytes(width)?;
        Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
    }

    /// Reads a two's complement big-endian integer of `width` bytes (1 to 16),
    /// sign-extending from the top bit of the first byte.
    pub fn try_int_be(&mut self, width: usize) -> Result<i128, BufferError> {
        let raw = self.try_uint_be(width)?;
        let shift = (MAX_INT_WIDTH - width) * 8;
        Ok(((raw << shift) as i128) >> shift)
    }

    fn int_bytes(&mut self, width: usize) -> Result<&'a [u8], BufferError> {
        if width == 0 || width > MAX_INT_WIDTH {
            return Err(BufferError::InvalidWidth(width));
        }
        self.try_buf(width)
    }

    /// Reads `size` raw bytes and advances the cursor.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let x = self.x;
        let end = x + size;
        let bin = &self.uint8[x..end];
        self.x = end;
        Ok(bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_u8(), Ok(0x01));
        assert_eq!(reader.try_u8(), Ok(0x02));
        assert_eq!(reader.try_u8(), Ok(0x03));
        assert_eq!(reader.try_u8(), Err(BufferError::EndOfBuffer));
    }

    #[test]
    fn test_short_read_keeps_cursor() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_u64(), Err(BufferError::EndOfBuffer));
        assert_eq!(reader.x, 0);
        assert_eq!(reader.try_uint_be(3), Ok(0x010203));
    }

    #[test]
    fn test_int_be_sign_extension() {
        let data = [0xff, 0xff, 0xfe];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_int_be(3), Ok(-2));
        let data = [0xff; 16];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_int_be(16), Ok(-1));
    }

    #[test]
    fn test_invalid_width() {
        let data = [0u8; 32];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_uint_be(0), Err(BufferError::InvalidWidth(0)));
        assert_eq!(reader.try_uint_be(17), Err(BufferError::InvalidWidth(17)));
    }

    #[test]
    fn test_cursor_past_end() {
        let data = [0x01];
        let mut reader = Reader::at(&data, usize::MAX);
        assert_eq!(reader.size(), 0);
        assert_eq!(reader.try_buf(1), Err(BufferError::EndOfBuffer));
        let mut reader = Reader::at(&data, 0);
        assert_eq!(reader.try_buf(1), Ok(&[0x01][..]));
    }
}
