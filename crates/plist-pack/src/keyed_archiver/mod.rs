//! NSKeyedArchiver object graph (de)serialization.
//!
//! An archive is an ordinary plist dictionary (`$version`, `$archiver`,
//! `$top`, `$objects`), so this layer works on [`PlistValue`](crate::PlistValue)
//! trees and is independent of the binary codec.

pub mod constants;
mod archiver;
mod error;
mod shared;
mod unarchiver;
mod value;

pub use archiver::KeyedArchiver;
pub use error::KeyedArchiveError;
pub use shared::{archive, archive_to_bytes, unarchive, unarchive_from_bytes};
pub use unarchiver::{ClassDecoder, ClassHandler, KeyedUnarchiver, UnarchiveOptions};
pub use value::{shared, ArchiveDict, ArchiveValue, ClassHeader, KeyedArchiverValue, Shared};
