//! Shared convenience wrappers for binary plist encode/decode.

use crate::PlistValue;

use super::{BplistDecoder, BplistEncoder, BplistError};

/// Encode a [`PlistValue`] into binary plist bytes with default options.
pub fn encode(value: &PlistValue) -> Result<Vec<u8>, BplistError> {
    let mut encoder = BplistEncoder::new();
    encoder.encode(value)
}

/// Decode binary plist bytes into a [`PlistValue`] with default options.
pub fn decode(blob: &[u8]) -> Result<PlistValue, BplistError> {
    let decoder = BplistDecoder::new();
    decoder.decode(blob)
}
