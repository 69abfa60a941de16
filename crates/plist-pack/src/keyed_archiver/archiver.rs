//! NSKeyedArchiver encoder.
//!
//! Flattens an object graph into `$objects`, a table where objects refer to
//! each other by UID. A container gets its UID before its children are
//! visited, so a child that points back at it (a cycle) or a second path to
//! the same container (sharing) reuses that UID.

use std::collections::HashMap;

use super::constants::{
    class, ARCHIVER, ARCHIVER_KEY, ARCHIVER_VERSION, CLASS_KEY, DEFAULT_MAX_DEPTH, NS_DATA,
    NS_KEYS, NS_OBJECTS, NS_STRING, NS_TIME, NULL_OBJECT, OBJECTS_KEY, ROOT_KEY, TOP_KEY,
    VERSION_KEY,
};
use super::{ArchiveDict, ArchiveValue, ClassHeader, KeyedArchiveError};
use crate::date::to_core_data_seconds;
use crate::{PlistDict, PlistKey, PlistValue};

/// NSKeyedArchiver encoder.
#[derive(Debug, Clone)]
pub struct KeyedArchiver {
    /// Upper bound on object nesting.
    pub max_depth: usize,
}

impl Default for KeyedArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyedArchiver {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Archives `value` into a `{$version, $archiver, $top, $objects}`
    /// dictionary.
    ///
    /// An array at the top level is archived as `$top` keys `$0`, `$1`, ...
    /// in order; any other value becomes `$top.root`.
    pub fn archive(&self, value: &ArchiveValue) -> Result<PlistValue, KeyedArchiveError> {
        let mut archive = Archive {
            objects: vec![PlistValue::Str(NULL_OBJECT.to_owned())],
            uids: HashMap::new(),
            headers: HashMap::new(),
            strings: HashMap::new(),
            max_depth: self.max_depth,
        };

        let mut top = PlistDict::new();
        match value {
            ArchiveValue::Array(items) => {
                for (i, item) in items.borrow().iter().enumerate() {
                    let uid = archive.reference(item, 0)?;
                    top.insert(PlistKey::Str(format!("${i}")), PlistValue::Uid(uid));
                }
            }
            _ => {
                let uid = archive.reference(value, 0)?;
                top.insert(ROOT_KEY.into(), PlistValue::Uid(uid));
            }
        }
        log::debug!("keyed archive has {} objects", archive.objects.len());

        Ok(PlistValue::dict([
            (VERSION_KEY, PlistValue::Integer(ARCHIVER_VERSION)),
            (ARCHIVER_KEY, PlistValue::Str(ARCHIVER.to_owned())),
            (TOP_KEY, PlistValue::Dict(top)),
            (OBJECTS_KEY, PlistValue::Array(archive.objects)),
        ]))
    }
}

/// Per-call archiving state.
struct Archive {
    objects: Vec<PlistValue>,
    /// Container address to UID.
    uids: HashMap<usize, u64>,
    headers: HashMap<ClassHeader, u64>,
    strings: HashMap<String, u64>,
    max_depth: usize,
}

impl Archive {
    fn push(&mut self, value: PlistValue) -> u64 {
        let uid = self.objects.len() as u64;
        self.objects.push(value);
        uid
    }

    fn header(&mut self, header: &ClassHeader) -> u64 {
        if let Some(&uid) = self.headers.get(header) {
            return uid;
        }
        let uid = self.push(header.to_plist());
        self.headers.insert(header.clone(), uid);
        uid
    }

    fn string(&mut self, s: &str) -> u64 {
        if let Some(&uid) = self.strings.get(s) {
            return uid;
        }
        let uid = self.push(PlistValue::Str(s.to_owned()));
        self.strings.insert(s.to_owned(), uid);
        uid
    }

    /// Returns the UID under which `value` is stored, archiving it first if
    /// it has not been seen.
    fn reference(&mut self, value: &ArchiveValue, depth: usize) -> Result<u64, KeyedArchiveError> {
        let address = match value {
            ArchiveValue::Null => return Ok(0),
            ArchiveValue::Bool(b) => return Ok(self.push(PlistValue::Bool(*b))),
            ArchiveValue::Integer(i) => return Ok(self.push(PlistValue::Integer(*i))),
            ArchiveValue::BigInt(i) => return Ok(self.push(PlistValue::BigInt(*i))),
            ArchiveValue::Float(f) => return Ok(self.push(PlistValue::Float(*f))),
            ArchiveValue::Str(s) => return Ok(self.string(s)),
            ArchiveValue::Data(d) => return Ok(self.push(PlistValue::Data(d.clone()))),
            ArchiveValue::Date(date) => {
                let uid = self.push(PlistValue::Null);
                let object = self.object(
                    [(NS_TIME, PlistValue::Float(to_core_data_seconds(date)))],
                    &ClassHeader::builtin(class::NS_DATE),
                );
                self.objects[uid as usize] = object;
                return Ok(uid);
            }
            container => match container.address() {
                Some(address) => address,
                None => return Ok(0),
            },
        };
        if let Some(&uid) = self.uids.get(&address) {
            return Ok(uid);
        }
        if depth >= self.max_depth {
            return Err(KeyedArchiveError::DepthExceeded(self.max_depth));
        }
        let uid = self.push(PlistValue::Null);
        self.uids.insert(address, uid);

        let object = match value {
            ArchiveValue::Array(items) => {
                let header = ClassHeader::builtin(class::NS_ARRAY);
                self.collection(&items.borrow(), &header, depth)?
            }
            ArchiveValue::Set(items) => {
                let header = ClassHeader::builtin(class::NS_SET);
                self.collection(&items.borrow(), &header, depth)?
            }
            ArchiveValue::Dict(dict) => {
                let header = ClassHeader::builtin(class::NS_DICTIONARY);
                self.dictionary(&dict.borrow(), &header, depth)?
            }
            ArchiveValue::Keyed(keyed) => {
                let keyed = keyed.borrow();
                self.keyed(&keyed.value, &keyed.header, depth)?
            }
            _ => PlistValue::Null,
        };
        self.objects[uid as usize] = object;
        Ok(uid)
    }

    /// Builds an object slot from inline fields plus a `$class` reference.
    fn object<'k, I>(&mut self, fields: I, header: &ClassHeader) -> PlistValue
    where
        I: IntoIterator<Item = (&'k str, PlistValue)>,
    {
        let mut object: PlistDict = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        object.insert(CLASS_KEY.into(), PlistValue::Uid(self.header(header)));
        PlistValue::Dict(object)
    }

    fn references(
        &mut self,
        items: &[ArchiveValue],
        depth: usize,
    ) -> Result<PlistValue, KeyedArchiveError> {
        let uids = items
            .iter()
            .map(|item| self.reference(item, depth + 1).map(PlistValue::Uid))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlistValue::Array(uids))
    }

    fn collection(
        &mut self,
        items: &[ArchiveValue],
        header: &ClassHeader,
        depth: usize,
    ) -> Result<PlistValue, KeyedArchiveError> {
        let objects = self.references(items, depth)?;
        Ok(self.object([(NS_OBJECTS, objects)], header))
    }

    fn dictionary(
        &mut self,
        dict: &ArchiveDict,
        header: &ClassHeader,
        depth: usize,
    ) -> Result<PlistValue, KeyedArchiveError> {
        let keys = dict
            .keys()
            .map(|key| {
                PlistValue::Uid(match key {
                    PlistKey::Str(s) => self.string(s),
                    PlistKey::Int(i) => self.push(PlistValue::Integer(*i)),
                    PlistKey::Float(f) => self.push(PlistValue::Float(*f)),
                })
            })
            .collect();
        let values: Vec<ArchiveValue> = dict.values().cloned().collect();
        let objects = self.references(&values, depth)?;
        Ok(self.object(
            [(NS_KEYS, PlistValue::Array(keys)), (NS_OBJECTS, objects)],
            header,
        ))
    }

    /// Encodes the value inside an envelope according to its header.
    fn keyed(
        &mut self,
        value: &ArchiveValue,
        header: &ClassHeader,
        depth: usize,
    ) -> Result<PlistValue, KeyedArchiveError> {
        match value {
            ArchiveValue::Dict(dict) if header.is_kind_of(class::NS_DICTIONARY) => {
                self.dictionary(&dict.borrow(), header, depth)
            }
            ArchiveValue::Array(items) | ArchiveValue::Set(items)
                if header.is_kind_of(class::NS_ARRAY) || header.is_kind_of(class::NS_SET) =>
            {
                self.collection(&items.borrow(), header, depth)
            }
            ArchiveValue::Date(date) if header.is_kind_of(class::NS_DATE) => Ok(self.object(
                [(NS_TIME, PlistValue::Float(to_core_data_seconds(date)))],
                header,
            )),
            ArchiveValue::Str(s) if header.is_kind_of(class::NS_STRING) => {
                Ok(self.object([(NS_STRING, PlistValue::Str(s.clone()))], header))
            }
            ArchiveValue::Data(d) if header.is_kind_of(class::NS_DATA) => {
                Ok(self.object([(NS_DATA, PlistValue::Data(d.clone()))], header))
            }
            ArchiveValue::Dict(fields) => self.fields(&fields.borrow(), header, depth),
            other => Err(KeyedArchiveError::Unsupported {
                kind: other.kind(),
                class: header.classname.clone(),
            }),
        }
    }

    /// Generic object: numbers and booleans are stored inline, everything
    /// else by reference.
    fn fields(
        &mut self,
        fields: &ArchiveDict,
        header: &ClassHeader,
        depth: usize,
    ) -> Result<PlistValue, KeyedArchiveError> {
        let mut object = PlistDict::with_capacity(fields.len() + 1);
        for (key, value) in fields {
            let field = match value {
                ArchiveValue::Bool(b) => PlistValue::Bool(*b),
                ArchiveValue::Integer(i) => PlistValue::Integer(*i),
                ArchiveValue::BigInt(i) => PlistValue::BigInt(*i),
                ArchiveValue::Float(f) => PlistValue::Float(*f),
                other => PlistValue::Uid(self.reference(other, depth + 1)?),
            };
            object.insert(key.clone(), field);
        }
        object.insert(CLASS_KEY.into(), PlistValue::Uid(self.header(header)));
        Ok(PlistValue::Dict(object))
    }
}
