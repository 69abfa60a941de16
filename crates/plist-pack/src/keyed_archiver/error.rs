//! NSKeyedArchiver schema errors.

use thiserror::Error;

/// A structurally valid plist that does not follow the NSKeyedArchiver
/// layout, or an object graph that cannot be archived.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyedArchiveError {
    #[error("archive must be a dictionary, got {0}")]
    InvalidRoot(&'static str),
    #[error("missing field {field}")]
    MissingField { field: String },
    #[error("unsupported archive version {0}")]
    InvalidVersion(i128),
    #[error("unsupported archiver {0:?}")]
    InvalidArchiver(String),
    #[error("field {field} must be {expected}, got {found}")]
    InvalidField {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("UID {uid} is out of range for {len} objects")]
    UidOutOfRange { uid: u64, len: usize },
    #[error("NS.keys has {keys} entries but NS.objects has {objects}")]
    LengthMismatch { keys: usize, objects: usize },
    #[error("invalid dictionary key of type {0}")]
    InvalidKey(&'static str),
    #[error("top object is not an object: {0}")]
    TopNotObject(&'static str),
    #[error("invalid $top key {0:?}")]
    InvalidTopKey(String),
    #[error("cannot archive {kind} as {class}")]
    Unsupported { kind: &'static str, class: String },
    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("{class} handler failed: {message}")]
    Handler { class: String, message: String },
}

impl KeyedArchiveError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(
        field: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
            found,
        }
    }
}
