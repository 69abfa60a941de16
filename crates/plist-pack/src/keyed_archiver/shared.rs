//! Shared convenience wrappers for keyed archiving.

use crate::bplist::{BplistDecoder, BplistEncoder};
use crate::{PlistError, PlistValue};

use super::{ArchiveValue, KeyedArchiveError, KeyedArchiver, KeyedUnarchiver};

/// Archive an object graph with default options.
pub fn archive(value: &ArchiveValue) -> Result<PlistValue, KeyedArchiveError> {
    KeyedArchiver::new().archive(value)
}

/// Unarchive a keyed archive dictionary with default options.
pub fn unarchive(archive: &PlistValue) -> Result<ArchiveValue, KeyedArchiveError> {
    KeyedUnarchiver::new().unarchive(archive)
}

/// Archive an object graph straight into binary plist bytes.
pub fn archive_to_bytes(value: &ArchiveValue) -> Result<Vec<u8>, PlistError> {
    let archive = KeyedArchiver::new().archive(value)?;
    Ok(BplistEncoder::new().encode(&archive)?)
}

/// Unarchive an object graph from binary plist bytes.
pub fn unarchive_from_bytes(data: &[u8]) -> Result<ArchiveValue, PlistError> {
    let archive = BplistDecoder::new().decode(data)?;
    Ok(KeyedUnarchiver::new().unarchive(&archive)?)
}
