//! [`PlistValue`], the generic value tree shared by the binary codec and
//! the keyed archiver.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Dictionary payload; keeps keys in the order they were read or inserted.
pub type PlistDict = IndexMap<PlistKey, PlistValue>;

/// A value decoded from, or to be encoded into, a property list.
///
/// Integers read with a width of up to 8 bytes become [`PlistValue::Integer`];
/// 16-byte integers become [`PlistValue::BigInt`]. When the exact encoding
/// choice matters (float width, string flavour, explicit UID) the value is
/// wrapped in [`PlistValue::Typed`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Null,
    /// The `0x0F` fill byte.
    Undefined,
    Bool(bool),
    Integer(i64),
    BigInt(i128),
    Float(f64),
    Date(DateTime<Utc>),
    Data(Vec<u8>),
    Str(String),
    Uid(u64),
    Array(Vec<PlistValue>),
    /// Unordered collection; equal scalars collapse on decode.
    Set(Vec<PlistValue>),
    Dict(PlistDict),
    Typed(TypedValue),
}

/// A dictionary key: either a string or a number.
#[derive(Debug, Clone)]
pub enum PlistKey {
    Str(String),
    Int(i64),
    Float(f64),
}

impl PartialEq for PlistKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PlistKey::Str(a), PlistKey::Str(b)) => a == b,
            (PlistKey::Int(a), PlistKey::Int(b)) => a == b,
            (PlistKey::Float(a), PlistKey::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for PlistKey {}

impl Hash for PlistKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            PlistKey::Str(s) => s.hash(state),
            PlistKey::Int(i) => i.hash(state),
            PlistKey::Float(f) => f.to_bits().hash(state),
        }
    }
}

impl PlistKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistKey::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlistKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlistKey::Str(s) => f.write_str(s),
            PlistKey::Int(i) => write!(f, "{}", i),
            PlistKey::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for PlistKey {
    fn from(s: &str) -> Self {
        PlistKey::Str(s.to_owned())
    }
}

impl From<String> for PlistKey {
    fn from(s: String) -> Self {
        PlistKey::Str(s)
    }
}

impl From<i64> for PlistKey {
    fn from(i: i64) -> Self {
        PlistKey::Int(i)
    }
}

/// A scalar together with the on-disk encoding it was (or must be) written
/// with.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int(i128),
    Float32(f32),
    Float64(f64),
    Uid(u64),
    Ascii(String),
    Utf16(String),
    Utf8(String),
}

impl TypedValue {
    /// Drops the encoding choice and returns the plain value.
    pub fn into_value(self) -> PlistValue {
        match self {
            TypedValue::Int(i) => match i64::try_from(i) {
                Ok(i) => PlistValue::Integer(i),
                Err(_) => PlistValue::BigInt(i),
            },
            TypedValue::Float32(f) => PlistValue::Float(f as f64),
            TypedValue::Float64(f) => PlistValue::Float(f),
            TypedValue::Uid(u) => PlistValue::Uid(u),
            TypedValue::Ascii(s) | TypedValue::Utf16(s) | TypedValue::Utf8(s) => PlistValue::Str(s),
        }
    }
}

impl PlistValue {
    /// Builds a dictionary value from `(key, value)` pairs.
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<PlistKey>,
        I: IntoIterator<Item = (K, PlistValue)>,
    {
        PlistValue::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Strips [`PlistValue::Typed`] wrappers at this level.
    pub fn untyped(&self) -> std::borrow::Cow<'_, PlistValue> {
        match self {
            PlistValue::Typed(t) => std::borrow::Cow::Owned(t.clone().into_value()),
            other => std::borrow::Cow::Borrowed(other),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::Str(s) => Some(s),
            PlistValue::Typed(
                TypedValue::Ascii(s) | TypedValue::Utf16(s) | TypedValue::Utf8(s),
            ) => Some(s),
            _ => None,
        }
    }

    /// Integer value, whatever width it was stored with.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            PlistValue::Integer(i) => Some(*i as i128),
            PlistValue::BigInt(i) => Some(*i),
            PlistValue::Typed(TypedValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PlistValue::Float(f) => Some(*f),
            PlistValue::Integer(i) => Some(*i as f64),
            PlistValue::Typed(TypedValue::Float64(f)) => Some(*f),
            PlistValue::Typed(TypedValue::Float32(f)) => Some(*f as f64),
            PlistValue::Typed(TypedValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_uid(&self) -> Option<u64> {
        match self {
            PlistValue::Uid(u) | PlistValue::Typed(TypedValue::Uid(u)) => Some(*u),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PlistDict> {
        match self {
            PlistValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Looks up a string key in a dictionary value.
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.as_dict()?.get(&PlistKey::Str(key.to_owned()))
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PlistValue::Null => "null",
            PlistValue::Undefined => "undefined",
            PlistValue::Bool(_) => "bool",
            PlistValue::Integer(_) | PlistValue::BigInt(_) => "integer",
            PlistValue::Float(_) => "float",
            PlistValue::Date(_) => "date",
            PlistValue::Data(_) => "data",
            PlistValue::Str(_) => "string",
            PlistValue::Uid(_) => "uid",
            PlistValue::Array(_) => "array",
            PlistValue::Set(_) => "set",
            PlistValue::Dict(_) => "dict",
            PlistValue::Typed(t) => match t {
                TypedValue::Int(_) => "integer",
                TypedValue::Float32(_) | TypedValue::Float64(_) => "float",
                TypedValue::Uid(_) => "uid",
                _ => "string",
            },
        }
    }

    /// `true` for values that are neither containers nor byte/date objects.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            PlistValue::Array(_)
                | PlistValue::Set(_)
                | PlistValue::Dict(_)
                | PlistValue::Data(_)
                | PlistValue::Date(_)
        )
    }
}

impl From<bool> for PlistValue {
    fn from(b: bool) -> Self {
        PlistValue::Bool(b)
    }
}

impl From<i64> for PlistValue {
    fn from(i: i64) -> Self {
        PlistValue::Integer(i)
    }
}

impl From<i128> for PlistValue {
    fn from(i: i128) -> Self {
        match i64::try_from(i) {
            Ok(i) => PlistValue::Integer(i),
            Err(_) => PlistValue::BigInt(i),
        }
    }
}

impl From<f64> for PlistValue {
    fn from(f: f64) -> Self {
        PlistValue::Float(f)
    }
}

impl From<&str> for PlistValue {
    fn from(s: &str) -> Self {
        PlistValue::Str(s.to_owned())
    }
}

impl From<String> for PlistValue {
    fn from(s: String) -> Self {
        PlistValue::Str(s)
    }
}

impl From<Vec<u8>> for PlistValue {
    fn from(b: Vec<u8>) -> Self {
        PlistValue::Data(b)
    }
}

impl From<DateTime<Utc>> for PlistValue {
    fn from(d: DateTime<Utc>) -> Self {
        PlistValue::Date(d)
    }
}

impl From<Vec<PlistValue>> for PlistValue {
    fn from(a: Vec<PlistValue>) -> Self {
        PlistValue::Array(a)
    }
}

impl From<TypedValue> for PlistValue {
    fn from(t: TypedValue) -> Self {
        PlistValue::Typed(t)
    }
}
