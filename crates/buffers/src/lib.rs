//! Binary buffer utilities for plist-pack.
//!
//! This crate provides the byte-level primitives the binary plist codec is
//! built on: a bounds-checked cursor over a byte slice and an auto-growing
//! output buffer. Every read reports running out of input as
//! [`BufferError::EndOfBuffer`], so callers can tell truncation apart from
//! other failures.
//!
//! # Overview
//!
//! - [`Reader`] - Reads big-endian data from a byte slice with cursor tracking
//! - [`Writer`] - Writes big-endian data to an auto-growing buffer
//! - [`print_octets`] - Hex formatting for diagnostics
//!
//! # Example
//!
//! ```
//! use plist_pack_buffers::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.u8(0x01);
//! writer.u16(0x0203);
//! writer.uint_be(3, 0x0a0b0c).unwrap();
//! let data = writer.flush();
//!
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.try_u8(), Ok(0x01));
//! assert_eq!(reader.try_u16(), Ok(0x0203));
//! assert_eq!(reader.try_uint_be(3), Ok(0x0a0b0c));
//! assert!(reader.try_u8().is_err());
//! ```

mod print_octets;
mod reader;
mod writer;

pub use print_octets::print_octets;
pub use reader::Reader;
pub use writer::Writer;

/// Largest integer width, in bytes, supported by the arbitrary-width
/// read/write methods.
pub const MAX_INT_WIDTH: usize = 16;

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    EndOfBuffer,
    /// Integer width outside `1..=16` bytes.
    InvalidWidth(usize),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::EndOfBuffer => write!(f, "insufficient bytes"),
            BufferError::InvalidWidth(width) => write!(f, "invalid integer width {}", width),
        }
    }
}

impl std::error::Error for BufferError {}
