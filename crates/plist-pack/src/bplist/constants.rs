//! Binary plist layout constants.
//!
//! References: CoreFoundation `CFBinaryPList.c`.

/// Bytes that must open every binary plist.
pub const MAGIC: &[u8; 6] = b"bplist";

/// Magic plus format version, as written by the encoder.
pub const HEADER: &[u8; 8] = b"bplist00";

/// Size of the fixed footer.
pub const TRAILER_SIZE: usize = 32;

/// Smallest buffer that can hold the magic and a trailer.
pub const MIN_SIZE: usize = MAGIC.len() + TRAILER_SIZE;

pub const DEFAULT_MAX_OBJECT_COUNT: usize = 1 << 20;

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decoded nodes allowed per table object. Shared references are decoded
/// once per reference, so this bounds the size of the expanded tree.
pub const NODES_PER_OBJECT: usize = 4;

/// Low nibble of a length-carrying marker that announces a trailing
/// integer object holding the real length.
pub const LENGTH_FOLLOWS: u8 = 0x0f;

/// Type markers (high nibble, or full byte for singletons).
pub mod marker {
    pub const NULL: u8 = 0x00;
    pub const FALSE: u8 = 0x08;
    pub const TRUE: u8 = 0x09;
    pub const FILL: u8 = 0x0f;
    pub const INT: u8 = 0x10;
    pub const REAL: u8 = 0x20;
    pub const REAL32: u8 = 0x22;
    pub const REAL64: u8 = 0x23;
    pub const DATE: u8 = 0x33;
    pub const DATA: u8 = 0x40;
    pub const ASCII: u8 = 0x50;
    pub const UTF16: u8 = 0x60;
    pub const UTF8: u8 = 0x70;
    pub const UID: u8 = 0x80;
    pub const ARRAY: u8 = 0xa0;
    pub const SET: u8 = 0xb0;
    pub const DICT: u8 = 0xd0;
}
