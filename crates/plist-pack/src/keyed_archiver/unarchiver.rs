//! NSKeyedArchiver decoder.
//!
//! Objects are rebuilt by following UIDs through `$objects`. Each container
//! is recorded under its UID before its children are resolved, and stays
//! recorded, so a reference back to it (a cycle) or from elsewhere (sharing)
//! yields the same [`Shared`] node.

use std::collections::HashMap;
use std::fmt;

use super::constants::{
    class, ARCHIVER, ARCHIVER_KEY, ARCHIVER_VERSION, CLASSES_KEY, CLASSNAME_KEY, CLASS_KEY,
    DEFAULT_MAX_DEPTH, NS_DATA, NS_KEYS, NS_OBJECTS, NS_STRING, NS_TIME, OBJECTS_KEY, ROOT_KEY,
    TOP_KEY, VERSION_KEY,
};
use super::{shared, ArchiveDict, ArchiveValue, ClassHeader, KeyedArchiveError, Shared};
use crate::date::from_core_data_seconds;
use crate::{PlistDict, PlistKey, PlistValue, TypedValue};

/// Decodes an object of a registered class.
pub type ClassHandler =
    Box<dyn Fn(&mut ClassDecoder<'_, '_>) -> Result<ArchiveValue, KeyedArchiveError>>;

#[derive(Debug, Clone)]
pub struct UnarchiveOptions {
    /// Wrap every object that has a `$class` in a
    /// [`KeyedArchiverValue`](super::KeyedArchiverValue) envelope.
    pub preserve_type: bool,
    /// Upper bound on object nesting.
    pub max_depth: usize,
}

impl Default for UnarchiveOptions {
    fn default() -> Self {
        Self {
            preserve_type: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// NSKeyedArchiver decoder.
///
/// Objects of the built-in collection, date, string and data classes are
/// mapped to [`ArchiveValue`] variants. Any other class is returned as a
/// [`KeyedArchiverValue`](super::KeyedArchiverValue) holding its fields,
/// unless a handler is registered for one of its classes.
pub struct KeyedUnarchiver {
    pub options: UnarchiveOptions,
    handlers: HashMap<String, ClassHandler>,
}

impl Default for KeyedUnarchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyedUnarchiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedUnarchiver")
            .field("options", &self.options)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KeyedUnarchiver {
    pub fn new() -> Self {
        Self::with_options(UnarchiveOptions::default())
    }

    pub fn with_options(options: UnarchiveOptions) -> Self {
        Self {
            options,
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for objects whose class hierarchy includes
    /// `class`. Handlers take priority over the built-in mappings.
    pub fn with_handler<F>(mut self, class: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ClassDecoder<'_, '_>) -> Result<ArchiveValue, KeyedArchiveError> + 'static,
    {
        self.handlers.insert(class.into(), Box::new(handler));
        self
    }

    /// Rebuilds the object graph of a `{$version, $archiver, $top,
    /// $objects}` dictionary.
    ///
    /// With `$top.root`, returns that object. Otherwise `$top` must hold only
    /// `$0`, `$1`, ... keys and their objects are returned as an array.
    pub fn unarchive(&self, archive: &PlistValue) -> Result<ArchiveValue, KeyedArchiveError> {
        let dict = archive
            .as_dict()
            .ok_or(KeyedArchiveError::InvalidRoot(archive.kind()))?;
        let field = |name: &str| {
            dict.get(&PlistKey::from(name))
                .ok_or_else(|| KeyedArchiveError::missing(name))
        };

        let version = field(VERSION_KEY)?;
        match version.as_i128() {
            Some(v) if v == ARCHIVER_VERSION as i128 => {}
            Some(v) => return Err(KeyedArchiveError::InvalidVersion(v)),
            None => return Err(KeyedArchiveError::invalid(VERSION_KEY, "integer", version.kind())),
        }
        let archiver = field(ARCHIVER_KEY)?;
        match archiver.as_str() {
            Some(ARCHIVER) => {}
            Some(other) => return Err(KeyedArchiveError::InvalidArchiver(other.to_owned())),
            None => return Err(KeyedArchiveError::invalid(ARCHIVER_KEY, "string", archiver.kind())),
        }
        let top = field(TOP_KEY)?;
        let top = top
            .as_dict()
            .ok_or_else(|| KeyedArchiveError::invalid(TOP_KEY, "dict", top.kind()))?;
        let objects = field(OBJECTS_KEY)?;
        let objects = objects
            .as_array()
            .ok_or_else(|| KeyedArchiveError::invalid(OBJECTS_KEY, "array", objects.kind()))?;

        let mut resolver = Resolver {
            objects,
            resolved: HashMap::new(),
            headers: HashMap::new(),
            handlers: &self.handlers,
            options: &self.options,
        };
        let result = match top.get(&PlistKey::from(ROOT_KEY)) {
            Some(root) => {
                let value = resolver.value(root, 0)?;
                if !value.is_object() {
                    return Err(KeyedArchiveError::TopNotObject(value.kind()));
                }
                value
            }
            None => {
                let mut entries = Vec::with_capacity(top.len());
                for (key, value) in top {
                    let index = key
                        .as_str()
                        .and_then(|k| k.strip_prefix('$'))
                        .and_then(|n| n.parse::<u64>().ok())
                        .ok_or_else(|| KeyedArchiveError::InvalidTopKey(key.to_string()))?;
                    entries.push((index, value));
                }
                entries.sort_by_key(|(index, _)| *index);
                let items = entries
                    .into_iter()
                    .map(|(_, value)| resolver.value(value, 0))
                    .collect::<Result<Vec<_>, _>>()?;
                ArchiveValue::array(items)
            }
        };
        log::debug!(
            "keyed unarchive resolved {} of {} objects",
            resolver.resolved.len(),
            objects.len()
        );
        Ok(result)
    }
}

/// Per-call unarchiving state.
struct Resolver<'a> {
    objects: &'a [PlistValue],
    /// Objects by UID, recorded before their children are resolved.
    resolved: HashMap<u64, ArchiveValue>,
    headers: HashMap<u64, ClassHeader>,
    handlers: &'a HashMap<String, ClassHandler>,
    options: &'a UnarchiveOptions,
}

impl<'a> Resolver<'a> {
    fn slot(&self, uid: u64) -> Result<&'a PlistValue, KeyedArchiveError> {
        let objects = self.objects;
        usize::try_from(uid)
            .ok()
            .and_then(|index| objects.get(index))
            .ok_or(KeyedArchiveError::UidOutOfRange {
                uid,
                len: objects.len(),
            })
    }

    /// Resolves a field value: UIDs are followed, inline values converted.
    fn value(
        &mut self,
        value: &'a PlistValue,
        depth: usize,
    ) -> Result<ArchiveValue, KeyedArchiveError> {
        match value {
            PlistValue::Uid(uid) | PlistValue::Typed(TypedValue::Uid(uid)) => {
                self.uid(*uid, depth + 1)
            }
            PlistValue::Array(items) => Ok(ArchiveValue::array(self.values(items, depth)?)),
            PlistValue::Set(items) => Ok(ArchiveValue::set(self.values(items, depth)?)),
            PlistValue::Dict(dict) => {
                let mut entries = ArchiveDict::with_capacity(dict.len());
                for (key, value) in dict {
                    entries.insert(key.clone(), self.value(value, depth)?);
                }
                Ok(ArchiveValue::Dict(shared(entries)))
            }
            other => Ok(scalar(&other.untyped())),
        }
    }

    fn values(
        &mut self,
        items: &'a [PlistValue],
        depth: usize,
    ) -> Result<Vec<ArchiveValue>, KeyedArchiveError> {
        items.iter().map(|item| self.value(item, depth)).collect()
    }

    fn uid(&mut self, uid: u64, depth: usize) -> Result<ArchiveValue, KeyedArchiveError> {
        let slot = self.slot(uid)?;
        if uid == 0 {
            return Ok(ArchiveValue::Null);
        }
        if let Some(value) = self.resolved.get(&uid) {
            return Ok(value.clone());
        }
        if depth > self.options.max_depth {
            return Err(KeyedArchiveError::DepthExceeded(self.options.max_depth));
        }
        log::trace!("resolving object {uid}");
        match slot {
            PlistValue::Dict(fields) => match fields.get(&PlistKey::from(CLASS_KEY)) {
                Some(class) => self.class_object(uid, fields, class, depth),
                None => {
                    let dict = shared(ArchiveDict::new());
                    let value = ArchiveValue::Dict(dict.clone());
                    self.resolved.insert(uid, value.clone());
                    let mut entries = ArchiveDict::with_capacity(fields.len());
                    for (key, field) in fields {
                        entries.insert(key.clone(), self.value(field, depth)?);
                    }
                    *dict.borrow_mut() = entries;
                    Ok(value)
                }
            },
            PlistValue::Array(items) | PlistValue::Set(items) => {
                let list = shared(Vec::new());
                let value = match slot {
                    PlistValue::Set(_) => ArchiveValue::Set(list.clone()),
                    _ => ArchiveValue::Array(list.clone()),
                };
                self.resolved.insert(uid, value.clone());
                let resolved = self.values(items, depth)?;
                *list.borrow_mut() = resolved;
                Ok(value)
            }
            PlistValue::Uid(_) | PlistValue::Typed(TypedValue::Uid(_)) => Err(
                KeyedArchiveError::invalid(format!("{OBJECTS_KEY}[{uid}]"), "object", "uid"),
            ),
            other => Ok(scalar(&other.untyped())),
        }
    }

    fn header(&mut self, class: &'a PlistValue) -> Result<ClassHeader, KeyedArchiveError> {
        let uid = class
            .as_uid()
            .ok_or_else(|| KeyedArchiveError::invalid(CLASS_KEY, "uid", class.kind()))?;
        if let Some(header) = self.headers.get(&uid) {
            return Ok(header.clone());
        }
        let slot = self.slot(uid)?;
        let classname = slot
            .get(CLASSNAME_KEY)
            .ok_or_else(|| KeyedArchiveError::missing(CLASSNAME_KEY))?;
        let classname = classname.as_str().ok_or_else(|| {
            KeyedArchiveError::invalid(CLASSNAME_KEY, "string", classname.kind())
        })?;
        let classes = match slot.get(CLASSES_KEY) {
            Some(PlistValue::Array(classes)) => classes
                .iter()
                .map(|c| {
                    c.as_str().map(str::to_owned).ok_or_else(|| {
                        KeyedArchiveError::invalid(CLASSES_KEY, "string", c.kind())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(KeyedArchiveError::invalid(CLASSES_KEY, "array", other.kind()));
            }
            None => vec![classname.to_owned()],
        };
        let header = ClassHeader::new(classname, classes);
        self.headers.insert(uid, header.clone());
        Ok(header)
    }

    /// Records `value` under `uid`, in an envelope when types are preserved.
    fn register(&mut self, uid: u64, value: ArchiveValue, header: &ClassHeader) -> ArchiveValue {
        let value = if self.options.preserve_type {
            ArchiveValue::keyed(value, header.clone())
        } else {
            value
        };
        self.resolved.insert(uid, value.clone());
        value
    }

    fn class_object(
        &mut self,
        uid: u64,
        fields: &'a PlistDict,
        class: &'a PlistValue,
        depth: usize,
    ) -> Result<ArchiveValue, KeyedArchiveError> {
        let header = self.header(class)?;

        let handlers = self.handlers;
        let handler = std::iter::once(&header.classname)
            .chain(&header.classes)
            .find_map(|name| handlers.get(name));
        if let Some(handler) = handler {
            let mut decoder = ClassDecoder {
                resolver: self,
                fields,
                header: &header,
                depth,
            };
            let value = handler(&mut decoder)?;
            return Ok(self.register(uid, value, &header));
        }

        if header.is_kind_of(class::NS_DICTIONARY) {
            let dict = shared(ArchiveDict::new());
            let value = self.register(uid, ArchiveValue::Dict(dict.clone()), &header);
            let keys = list_field(fields, NS_KEYS)?;
            let objects = list_field(fields, NS_OBJECTS)?;
            if keys.len() != objects.len() {
                return Err(KeyedArchiveError::LengthMismatch {
                    keys: keys.len(),
                    objects: objects.len(),
                });
            }
            let mut entries = ArchiveDict::with_capacity(keys.len());
            for (key, object) in keys.iter().zip(objects) {
                let key = match self.value(key, depth)? {
                    ArchiveValue::Str(s) => PlistKey::Str(s),
                    ArchiveValue::Integer(i) => PlistKey::Int(i),
                    ArchiveValue::Float(f) => PlistKey::Float(f),
                    other => return Err(KeyedArchiveError::InvalidKey(other.kind())),
                };
                entries.insert(key, self.value(object, depth)?);
            }
            *dict.borrow_mut() = entries;
            return Ok(value);
        }

        if header.is_kind_of(class::NS_DATE) {
            let time = required(fields, NS_TIME)?;
            let date = time
                .as_f64()
                .and_then(from_core_data_seconds)
                .ok_or_else(|| KeyedArchiveError::invalid(NS_TIME, "date seconds", time.kind()))?;
            return Ok(self.register(uid, ArchiveValue::Date(date), &header));
        }

        let is_set = header.is_kind_of(class::NS_SET);
        if is_set || header.is_kind_of(class::NS_ARRAY) {
            let list: Shared<Vec<ArchiveValue>> = shared(Vec::new());
            let inner = if is_set {
                ArchiveValue::Set(list.clone())
            } else {
                ArchiveValue::Array(list.clone())
            };
            let value = self.register(uid, inner, &header);
            let items = self.values(list_field(fields, NS_OBJECTS)?, depth)?;
            *list.borrow_mut() = items;
            return Ok(value);
        }

        if header.is_kind_of(class::NS_STRING) {
            let s = match self.value(required(fields, NS_STRING)?, depth)? {
                ArchiveValue::Str(s) => s,
                other => return Err(KeyedArchiveError::invalid(NS_STRING, "string", other.kind())),
            };
            return Ok(self.register(uid, ArchiveValue::Str(s), &header));
        }

        if header.is_kind_of(class::NS_DATA) {
            let data = match self.value(required(fields, NS_DATA)?, depth)? {
                ArchiveValue::Data(d) => d,
                other => return Err(KeyedArchiveError::invalid(NS_DATA, "data", other.kind())),
            };
            return Ok(self.register(uid, ArchiveValue::Data(data), &header));
        }

        let dict = shared(ArchiveDict::new());
        let value = ArchiveValue::keyed(ArchiveValue::Dict(dict.clone()), header);
        self.resolved.insert(uid, value.clone());
        let mut entries = ArchiveDict::with_capacity(fields.len());
        for (key, field) in fields {
            if key.as_str() == Some(CLASS_KEY) {
                continue;
            }
            entries.insert(key.clone(), self.value(field, depth)?);
        }
        *dict.borrow_mut() = entries;
        Ok(value)
    }
}

fn required<'a>(fields: &'a PlistDict, key: &str) -> Result<&'a PlistValue, KeyedArchiveError> {
    fields
        .get(&PlistKey::from(key))
        .ok_or_else(|| KeyedArchiveError::missing(key))
}

fn list_field<'a>(fields: &'a PlistDict, key: &str) -> Result<&'a [PlistValue], KeyedArchiveError> {
    let value = required(fields, key)?;
    value
        .as_array()
        .ok_or_else(|| KeyedArchiveError::invalid(key, "array", value.kind()))
}

/// Converts a value that is neither a container nor a UID.
fn scalar(value: &PlistValue) -> ArchiveValue {
    match value {
        PlistValue::Bool(b) => ArchiveValue::Bool(*b),
        PlistValue::Integer(i) => ArchiveValue::Integer(*i),
        PlistValue::BigInt(i) => ArchiveValue::BigInt(*i),
        PlistValue::Float(f) => ArchiveValue::Float(*f),
        PlistValue::Str(s) => ArchiveValue::Str(s.clone()),
        PlistValue::Data(d) => ArchiveValue::Data(d.clone()),
        PlistValue::Date(d) => ArchiveValue::Date(*d),
        _ => ArchiveValue::Null,
    }
}

/// Access to the fields of an object being decoded by a [`ClassHandler`].
pub struct ClassDecoder<'r, 'a> {
    resolver: &'r mut Resolver<'a>,
    fields: &'a PlistDict,
    header: &'r ClassHeader,
    depth: usize,
}

impl<'a> ClassDecoder<'_, 'a> {
    pub fn header(&self) -> &ClassHeader {
        self.header
    }

    pub fn classname(&self) -> &str {
        &self.header.classname
    }

    /// Field names, without `$class`.
    pub fn keys(&self) -> impl Iterator<Item = &'a PlistKey> {
        let fields: &'a PlistDict = self.fields;
        fields
            .keys()
            .filter(|key| key.as_str() != Some(CLASS_KEY))
    }

    /// Raw field value as stored in the archive.
    pub fn field(&self, key: &str) -> Option<&'a PlistValue> {
        let fields: &'a PlistDict = self.fields;
        fields.get(&PlistKey::from(key))
    }

    /// Resolves a field, following UIDs. A missing field decodes as
    /// [`ArchiveValue::Null`].
    pub fn decode(&mut self, key: &str) -> Result<ArchiveValue, KeyedArchiveError> {
        match self.field(key) {
            Some(value) => self.resolver.value(value, self.depth),
            None => Ok(ArchiveValue::Null),
        }
    }

    /// Like [`decode`](Self::decode), but a missing field is an error.
    pub fn decode_required(&mut self, key: &str) -> Result<ArchiveValue, KeyedArchiveError> {
        let value = required(self.fields, key)?;
        self.resolver.value(value, self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(uid: u64) -> (&'static str, PlistValue) {
        ("$class", PlistValue::Uid(uid))
    }

    fn archive(top: PlistValue, objects: Vec<PlistValue>) -> PlistValue {
        PlistValue::dict([
            ("$version", PlistValue::Integer(100_000)),
            ("$archiver", "NSKeyedArchiver".into()),
            ("$top", top),
            ("$objects", PlistValue::Array(objects)),
        ])
    }

    fn class(name: &str) -> PlistValue {
        class_chain(&[name, "NSObject"])
    }

    fn class_chain(classes: &[&str]) -> PlistValue {
        PlistValue::dict([
            ("$classname", PlistValue::from(classes[0])),
            (
                "$classes",
                PlistValue::Array(classes.iter().map(|&c| c.into()).collect()),
            ),
        ])
    }

    fn root() -> PlistValue {
        PlistValue::dict([("root", PlistValue::Uid(1))])
    }

    #[test]
    fn validation_order() {
        let unarchiver = KeyedUnarchiver::new();
        let missing_archiver = PlistValue::dict([
            ("$version", PlistValue::Integer(100_000)),
            ("$top", PlistValue::dict::<&str, _>([])),
            ("$objects", PlistValue::Array(vec![])),
        ]);
        assert_eq!(
            unarchiver.unarchive(&missing_archiver).unwrap_err(),
            KeyedArchiveError::missing("$archiver")
        );

        let bad_version = PlistValue::dict([("$version", PlistValue::Integer(1))]);
        assert_eq!(
            unarchiver.unarchive(&bad_version).unwrap_err(),
            KeyedArchiveError::InvalidVersion(1)
        );

        let bad_objects = PlistValue::dict([
            ("$version", PlistValue::Integer(100_000)),
            ("$archiver", "NSKeyedArchiver".into()),
            ("$top", PlistValue::dict::<&str, _>([])),
            ("$objects", PlistValue::Null),
        ]);
        assert_eq!(
            unarchiver.unarchive(&bad_objects).unwrap_err(),
            KeyedArchiveError::invalid("$objects", "array", "null")
        );
        assert_eq!(
            unarchiver.unarchive(&PlistValue::Null).unwrap_err(),
            KeyedArchiveError::InvalidRoot("null")
        );
    }

    #[test]
    fn wrong_archiver_name() {
        let value = PlistValue::dict([
            ("$version", PlistValue::Integer(100_000)),
            ("$archiver", "NSArchiver".into()),
        ]);
        assert_eq!(
            KeyedUnarchiver::new().unarchive(&value).unwrap_err(),
            KeyedArchiveError::InvalidArchiver("NSArchiver".into())
        );
    }

    #[test]
    fn ns_dictionary() {
        let objects = vec![
            "$null".into(),
            PlistValue::dict([
                ("NS.keys", PlistValue::Array(vec![PlistValue::Uid(2)])),
                ("NS.objects", PlistValue::Array(vec![PlistValue::Uid(3)])),
                header(4),
            ]),
            "name".into(),
            "value".into(),
            class_chain(&["NSMutableDictionary", "NSDictionary", "NSObject"]),
        ];
        let value = KeyedUnarchiver::new()
            .unarchive(&archive(root(), objects))
            .unwrap();
        assert_eq!(value, ArchiveValue::dict([("name", ArchiveValue::from("value"))]));
    }

    #[test]
    fn key_length_mismatch() {
        let objects = vec![
            "$null".into(),
            PlistValue::dict([
                ("NS.keys", PlistValue::Array(vec![PlistValue::Uid(2)])),
                ("NS.objects", PlistValue::Array(vec![])),
                header(3),
            ]),
            "name".into(),
            class("NSDictionary"),
        ];
        assert_eq!(
            KeyedUnarchiver::new()
                .unarchive(&archive(root(), objects))
                .unwrap_err(),
            KeyedArchiveError::LengthMismatch { keys: 1, objects: 0 }
        );
    }

    #[test]
    fn invalid_key_kind() {
        let objects = vec![
            "$null".into(),
            PlistValue::dict([
                ("NS.keys", PlistValue::Array(vec![PlistValue::Uid(2)])),
                ("NS.objects", PlistValue::Array(vec![PlistValue::Uid(2)])),
                header(3),
            ]),
            PlistValue::Data(vec![1]),
            class("NSDictionary"),
        ];
        assert_eq!(
            KeyedUnarchiver::new()
                .unarchive(&archive(root(), objects))
                .unwrap_err(),
            KeyedArchiveError::InvalidKey("data")
        );
    }

    #[test]
    fn ns_date_and_string() {
        let objects = vec![
            "$null".into(),
            PlistValue::Array(vec![PlistValue::Uid(2), PlistValue::Uid(4)]),
            PlistValue::dict([("NS.time", PlistValue::Float(0.0)), header(3)]),
            class("NSDate"),
            PlistValue::dict([("NS.string", "text".into()), header(5)]),
            class_chain(&["NSMutableString", "NSString"]),
        ];
        let value = KeyedUnarchiver::new()
            .unarchive(&archive(root(), objects))
            .unwrap();
        let date = crate::date::from_core_data_seconds(0.0).unwrap();
        assert_eq!(
            value,
            ArchiveValue::array(vec![ArchiveValue::Date(date), "text".into()])
        );
    }

    #[test]
    fn uid_out_of_range() {
        let objects = vec![
            "$null".into(),
            PlistValue::Array(vec![PlistValue::Uid(9)]),
        ];
        assert_eq!(
            KeyedUnarchiver::new()
                .unarchive(&archive(root(), objects))
                .unwrap_err(),
            KeyedArchiveError::UidOutOfRange { uid: 9, len: 2 }
        );
    }

    #[test]
    fn root_must_be_object() {
        let objects = vec!["$null".into(), "text".into()];
        assert_eq!(
            KeyedUnarchiver::new()
                .unarchive(&archive(root(), objects))
                .unwrap_err(),
            KeyedArchiveError::TopNotObject("string")
        );
    }

    #[test]
    fn numbered_top_keys() {
        let top = PlistValue::dict([
            ("$1", PlistValue::Uid(2)),
            ("$0", PlistValue::Uid(1)),
        ]);
        let objects = vec!["$null".into(), "a".into(), "b".into()];
        let value = KeyedUnarchiver::new()
            .unarchive(&archive(top, objects))
            .unwrap();
        assert_eq!(value, ArchiveValue::array(vec!["a".into(), "b".into()]));

        let bad = PlistValue::dict([("first", PlistValue::Uid(1))]);
        assert_eq!(
            KeyedUnarchiver::new()
                .unarchive(&archive(bad, vec!["$null".into(), "a".into()]))
                .unwrap_err(),
            KeyedArchiveError::InvalidTopKey("first".into())
        );
    }

    #[test]
    fn unknown_class_keeps_header() {
        let objects = vec![
            "$null".into(),
            PlistValue::dict([("size", PlistValue::Integer(4)), header(2)]),
            class("Widget"),
        ];
        let value = KeyedUnarchiver::new()
            .unarchive(&archive(root(), objects))
            .unwrap();
        match &value {
            ArchiveValue::Keyed(keyed) => {
                let keyed = keyed.borrow();
                assert_eq!(keyed.header, ClassHeader::builtin("Widget"));
                assert_eq!(
                    keyed.value,
                    ArchiveValue::dict([("size", ArchiveValue::Integer(4))])
                );
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn handler_takes_priority() {
        let objects = vec![
            "$null".into(),
            PlistValue::dict([("NS.string", "abc".into()), header(2)]),
            class("NSString"),
        ];
        let unarchiver = KeyedUnarchiver::new().with_handler("NSString", |decoder| {
            let s = decoder.decode_required("NS.string")?;
            let upper = s.as_str().unwrap_or_default().to_uppercase();
            Ok(ArchiveValue::array(vec![upper.into()]))
        });
        let value = unarchiver.unarchive(&archive(root(), objects)).unwrap();
        assert_eq!(value, ArchiveValue::array(vec!["ABC".into()]));
    }

    #[test]
    fn preserve_type_wraps_builtins() {
        let objects = vec![
            "$null".into(),
            PlistValue::dict([("NS.objects", PlistValue::Array(vec![])), header(2)]),
            class("NSArray"),
        ];
        let unarchiver = KeyedUnarchiver::with_options(UnarchiveOptions {
            preserve_type: true,
            ..Default::default()
        });
        let value = unarchiver.unarchive(&archive(root(), objects)).unwrap();
        assert_eq!(
            value,
            ArchiveValue::keyed(ArchiveValue::array(vec![]), ClassHeader::builtin("NSArray"))
        );
    }

    #[test]
    fn nesting_depth_limit() {
        // Objects 1..=6 each point at the next one.
        let mut objects: Vec<PlistValue> = vec!["$null".into()];
        for uid in 1..6 {
            objects.push(PlistValue::dict([("next", PlistValue::Uid(uid + 1))]));
        }
        objects.push(PlistValue::dict([("end", PlistValue::Bool(true))]));
        let archived = archive(root(), objects);

        let shallow = KeyedUnarchiver::with_options(UnarchiveOptions {
            max_depth: 3,
            ..Default::default()
        });
        assert_eq!(
            shallow.unarchive(&archived).unwrap_err(),
            KeyedArchiveError::DepthExceeded(3)
        );

        let deep = KeyedUnarchiver::with_options(UnarchiveOptions {
            max_depth: 6,
            ..Default::default()
        });
        let mut value = deep.unarchive(&archived).unwrap();
        for _ in 1..6 {
            value = value.get("next").unwrap();
        }
        assert_eq!(value.get("end"), Some(ArchiveValue::Bool(true)));
    }
}
