//! Object graphs exchanged with the keyed archiver.
//!
//! Containers are reference counted so that a graph can share sub-objects
//! and contain cycles. Two values are the same object when they point at the
//! same allocation, see [`ArchiveValue::ptr_eq`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::constants::{class, CLASSES_KEY, CLASSNAME_KEY};
use crate::{PlistKey, PlistValue};

/// A mutable, reference counted node of an object graph.
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

pub type ArchiveDict = IndexMap<PlistKey, ArchiveValue>;

/// `{$classname, $classes}` header of an archived object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassHeader {
    pub classname: String,
    /// Class hierarchy, most derived first.
    pub classes: Vec<String>,
}

impl ClassHeader {
    pub fn new(classname: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            classname: classname.into(),
            classes,
        }
    }

    /// Header of a direct `NSObject` subclass.
    pub fn builtin(classname: &str) -> Self {
        Self::new(
            classname,
            vec![classname.to_owned(), class::NS_OBJECT.to_owned()],
        )
    }

    pub fn is_kind_of(&self, name: &str) -> bool {
        self.classname == name || self.classes.iter().any(|c| c == name)
    }

    pub(crate) fn to_plist(&self) -> PlistValue {
        PlistValue::dict([
            (CLASSNAME_KEY, PlistValue::Str(self.classname.clone())),
            (
                CLASSES_KEY,
                PlistValue::Array(self.classes.iter().cloned().map(PlistValue::Str).collect()),
            ),
        ])
    }
}

/// A value together with the class header it was archived under.
///
/// Values of classes without a built-in mapping are unarchived into this
/// envelope, which lets them be archived again without losing the header.
#[derive(Debug, Clone)]
pub struct KeyedArchiverValue {
    pub value: ArchiveValue,
    pub header: ClassHeader,
}

#[derive(Clone)]
pub enum ArchiveValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers outside the `i64` range.
    BigInt(i128),
    Float(f64),
    Str(String),
    Data(Vec<u8>),
    Date(DateTime<Utc>),
    Array(Shared<Vec<ArchiveValue>>),
    Set(Shared<Vec<ArchiveValue>>),
    Dict(Shared<ArchiveDict>),
    Keyed(Shared<KeyedArchiverValue>),
}

impl ArchiveValue {
    pub fn array(items: Vec<ArchiveValue>) -> Self {
        Self::Array(shared(items))
    }

    pub fn set(items: Vec<ArchiveValue>) -> Self {
        Self::Set(shared(items))
    }

    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<PlistKey>,
        I: IntoIterator<Item = (K, ArchiveValue)>,
    {
        Self::Dict(shared(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn keyed(value: ArchiveValue, header: ClassHeader) -> Self {
        Self::Keyed(shared(KeyedArchiverValue { value, header }))
    }

    /// Address of the shared allocation behind a container.
    pub(crate) fn address(&self) -> Option<usize> {
        match self {
            Self::Array(items) | Self::Set(items) => Some(Rc::as_ptr(items) as *const () as usize),
            Self::Dict(dict) => Some(Rc::as_ptr(dict) as *const () as usize),
            Self::Keyed(keyed) => Some(Rc::as_ptr(keyed) as *const () as usize),
            _ => None,
        }
    }

    /// Whether both values are the same container object.
    pub fn ptr_eq(&self, other: &ArchiveValue) -> bool {
        match (self.address(), other.address()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::BigInt(_) => "bigint",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Data(_) => "data",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Set(_) => "set",
            Self::Dict(_) => "dict",
            Self::Keyed(_) => "keyed object",
        }
    }

    /// Containers, envelopes, dates and data.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Array(_)
                | Self::Set(_)
                | Self::Dict(_)
                | Self::Keyed(_)
                | Self::Date(_)
                | Self::Data(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Field lookup on a dictionary, or on the value inside an envelope.
    pub fn get(&self, key: &str) -> Option<ArchiveValue> {
        match self {
            Self::Dict(dict) => dict.borrow().get(&PlistKey::from(key)).cloned(),
            Self::Keyed(keyed) => keyed.borrow().value.get(key),
            _ => None,
        }
    }

    /// Element lookup on an array or set, or on the value inside an envelope.
    pub fn at(&self, index: usize) -> Option<ArchiveValue> {
        match self {
            Self::Array(items) | Self::Set(items) => items.borrow().get(index).cloned(),
            Self::Keyed(keyed) => keyed.borrow().value.at(index),
            _ => None,
        }
    }

    fn eq_in(&self, other: &ArchiveValue, seen: &mut HashSet<(usize, usize)>) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Array(a), Self::Array(b)) | (Self::Set(a), Self::Set(b)) => {
                shared_eq(a, b, seen, |a, b, seen| {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_in(y, seen))
                })
            }
            (Self::Dict(a), Self::Dict(b)) => shared_eq(a, b, seen, |a, b, seen| {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, x)| b.get(k).is_some_and(|y| x.eq_in(y, seen)))
            }),
            (Self::Keyed(a), Self::Keyed(b)) => shared_eq(a, b, seen, |a, b, seen| {
                a.header == b.header && a.value.eq_in(&b.value, seen)
            }),
            _ => false,
        }
    }
}

/// Compares two shared nodes, treating a pair already under comparison as
/// equal so that cyclic graphs terminate.
fn shared_eq<T>(
    a: &Shared<T>,
    b: &Shared<T>,
    seen: &mut HashSet<(usize, usize)>,
    eq: impl FnOnce(&T, &T, &mut HashSet<(usize, usize)>) -> bool,
) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let pair = (
        Rc::as_ptr(a) as *const () as usize,
        Rc::as_ptr(b) as *const () as usize,
    );
    if !seen.insert(pair) {
        return true;
    }
    eq(&a.borrow(), &b.borrow(), seen)
}

/// Structural equality. Cycles compare equal when both graphs have the same
/// shape; set elements are compared in order.
impl PartialEq for ArchiveValue {
    fn eq(&self, other: &Self) -> bool {
        self.eq_in(other, &mut HashSet::new())
    }
}

impl fmt::Debug for ArchiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = RefCell::new(Vec::new());
        GraphDebug { value: self, path: &path }.fmt(f)
    }
}

/// Debug printer that shows a back reference as `<cycle>`.
struct GraphDebug<'v> {
    value: &'v ArchiveValue,
    path: &'v RefCell<Vec<usize>>,
}

impl GraphDebug<'_> {
    fn child<'c>(&'c self, value: &'c ArchiveValue) -> GraphDebug<'c> {
        GraphDebug {
            value,
            path: self.path,
        }
    }
}

impl fmt::Debug for GraphDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = match self.value.address() {
            Some(address) => address,
            None => {
                return match self.value {
                    ArchiveValue::Null => f.write_str("Null"),
                    ArchiveValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
                    ArchiveValue::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
                    ArchiveValue::BigInt(i) => f.debug_tuple("BigInt").field(i).finish(),
                    ArchiveValue::Float(x) => f.debug_tuple("Float").field(x).finish(),
                    ArchiveValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
                    ArchiveValue::Data(d) => f.debug_tuple("Data").field(d).finish(),
                    ArchiveValue::Date(d) => f.debug_tuple("Date").field(d).finish(),
                    _ => Ok(()),
                };
            }
        };
        if self.path.borrow().contains(&address) {
            return f.write_str("<cycle>");
        }
        self.path.borrow_mut().push(address);
        let result = match self.value {
            ArchiveValue::Array(items) | ArchiveValue::Set(items) => {
                f.write_str(if matches!(self.value, ArchiveValue::Set(_)) {
                    "Set"
                } else {
                    "Array"
                })?;
                f.debug_list()
                    .entries(items.borrow().iter().map(|v| self.child(v)))
                    .finish()
            }
            ArchiveValue::Dict(dict) => {
                f.write_str("Dict")?;
                f.debug_map()
                    .entries(dict.borrow().iter().map(|(k, v)| (k, self.child(v))))
                    .finish()
            }
            ArchiveValue::Keyed(keyed) => {
                let keyed = keyed.borrow();
                f.debug_struct("Keyed")
                    .field("classname", &keyed.header.classname)
                    .field("value", &self.child(&keyed.value))
                    .finish()
            }
            _ => Ok(()),
        };
        self.path.borrow_mut().pop();
        result
    }
}

impl From<bool> for ArchiveValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArchiveValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i128> for ArchiveValue {
    fn from(value: i128) -> Self {
        match i64::try_from(value) {
            Ok(value) => Self::Integer(value),
            Err(_) => Self::BigInt(value),
        }
    }
}

impl From<f64> for ArchiveValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ArchiveValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ArchiveValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<u8>> for ArchiveValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Data(value)
    }
}

impl From<DateTime<Utc>> for ArchiveValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let a = ArchiveValue::array(vec![1i64.into()]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&ArchiveValue::array(vec![1i64.into()])));
        assert!(!ArchiveValue::Null.ptr_eq(&ArchiveValue::Null));
    }

    #[test]
    fn structural_equality() {
        let a = ArchiveValue::dict([("x", ArchiveValue::array(vec!["y".into()]))]);
        let b = ArchiveValue::dict([("x", ArchiveValue::array(vec!["y".into()]))]);
        assert_eq!(a, b);
        assert_ne!(a, ArchiveValue::dict([("x", ArchiveValue::Null)]));
    }

    #[test]
    fn cyclic_values_compare_and_print() {
        let make = || {
            let node = ArchiveValue::dict([("name", ArchiveValue::from("n"))]);
            if let ArchiveValue::Dict(dict) = &node {
                dict.borrow_mut().insert("self".into(), node.clone());
            }
            node
        };
        let a = make();
        let b = make();
        assert_eq!(a, b);
        let printed = format!("{a:?}");
        assert!(printed.contains("<cycle>"), "{printed}");
    }

    #[test]
    fn header_kind_of() {
        let header = ClassHeader::new(
            "NSMutableDictionary",
            vec!["NSMutableDictionary".into(), "NSDictionary".into(), "NSObject".into()],
        );
        assert!(header.is_kind_of("NSDictionary"));
        assert!(!header.is_kind_of("NSArray"));
        assert_eq!(ClassHeader::builtin("NSDate").classes, vec!["NSDate", "NSObject"]);
    }

    #[test]
    fn get_reads_through_envelopes() {
        let inner = ArchiveValue::dict([("k", ArchiveValue::from(1i64))]);
        let keyed = ArchiveValue::keyed(inner, ClassHeader::builtin("Thing"));
        assert_eq!(keyed.get("k"), Some(ArchiveValue::Integer(1)));
        assert_eq!(keyed.get("missing"), None);
    }
}
