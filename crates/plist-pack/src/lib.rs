//! Apple property lists: the binary `bplist00` codec and the NSKeyedArchiver
//! object graph format layered on top of it.
//!
//! ```text
//! bytes ─ bplist::decode ─▶ PlistValue ─ keyed_archiver::unarchive ─▶ ArchiveValue
//! bytes ◀─ bplist::encode ─ PlistValue ◀─ keyed_archiver::archive ─── ArchiveValue
//! ```

mod convert;
mod date;
mod error;
mod plist_value;

pub mod bplist;
pub mod keyed_archiver;

pub use convert::{json_to_plist, plist_to_json, UID_KEY};
pub use date::{from_core_data_seconds, to_core_data_seconds, CORE_DATA_EPOCH_MS};
pub use error::PlistError;
pub use plist_value::{PlistDict, PlistKey, PlistValue, TypedValue};

pub use bplist::{BplistDecoder, BplistEncoder, BplistError, DecoderOptions, EncoderOptions};
pub use keyed_archiver::{
    ArchiveValue, ClassHeader, KeyedArchiveError, KeyedArchiver, KeyedArchiverValue,
    KeyedUnarchiver, UnarchiveOptions,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_to_graph_and_back() {
        let value = ArchiveValue::dict([
            ("title", ArchiveValue::from("notes")),
            ("tags", ArchiveValue::set(vec!["a".into(), "b".into()])),
        ]);
        let bytes = keyed_archiver::archive_to_bytes(&value).unwrap();
        assert!(bytes.starts_with(b"bplist00"));
        let back = keyed_archiver::unarchive_from_bytes(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn byte_level_errors_are_tagged() {
        assert_eq!(
            keyed_archiver::unarchive_from_bytes(&[0; 3]),
            Err(PlistError::Bplist(BplistError::TooSmall(3)))
        );
        let not_an_archive =
            bplist::encode(&PlistValue::dict([("a", PlistValue::Integer(1))])).unwrap();
        assert!(matches!(
            keyed_archiver::unarchive_from_bytes(&not_an_archive),
            Err(PlistError::KeyedArchive(KeyedArchiveError::MissingField { .. }))
        ));
    }
}
