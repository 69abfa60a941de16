//! Binary plist encoder/decoder error type.

use plist_pack_buffers::BufferError;
use thiserror::Error;

/// Error type for binary plist encoding and decoding.
///
/// Every failure is final: the codec never returns partial results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BplistError {
    #[error("binary plist is too small: {0} bytes")]
    TooSmall(usize),
    #[error("invalid binary plist magic: {0}")]
    InvalidMagic(String),
    #[error("{field} value is too large: {value}")]
    ValueTooLarge { field: &'static str, value: u128 },
    #[error("too many objects: {count} exceeds the limit of {max}")]
    TooManyObjects { count: usize, max: usize },
    #[error("invalid int size {size} at offset {offset}")]
    InvalidIntSize { size: usize, offset: usize },
    #[error("{what} at offset {offset} with length {len} is out of bounds")]
    OutOfBounds {
        what: &'static str,
        offset: usize,
        len: usize,
    },
    #[error("object {0} not found")]
    ObjectNotFound(usize),
    #[error("invalid type 0x{marker:02x} at offset {offset}")]
    InvalidType { marker: u8, offset: usize },
    #[error("invalid key of type {kind} at offset {offset}")]
    InvalidKey { kind: &'static str, offset: usize },
    #[error("invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),
    #[error("invalid UTF-16 string at offset {0}")]
    InvalidUtf16(usize),
    #[error("invalid date {0}")]
    InvalidDate(f64),
    #[error("negative length {value} at offset {offset}")]
    NegativeLength { value: i128, offset: usize },
    #[error("object {0} references itself")]
    CyclicReference(usize),
    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("string is not ASCII: {0:?}")]
    NotAscii(String),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
