//! Errors of the byte-level helpers that span both layers.

use thiserror::Error;

use crate::bplist::BplistError;
use crate::keyed_archiver::KeyedArchiveError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlistError {
    #[error(transparent)]
    Bplist(#[from] BplistError),
    #[error(transparent)]
    KeyedArchive(#[from] KeyedArchiveError),
}
