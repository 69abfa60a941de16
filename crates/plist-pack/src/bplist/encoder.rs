//! Binary plist encoder.
//!
//! Encoding runs in two passes. The planning pass flattens the value tree
//! into an object table, assigning ids in pre-order so the root is object 0
//! and sharing one id between equal scalars. The object count fixes the
//! width of object references. The writing pass then emits every object,
//! children before their parents, recording each object's offset; the width
//! of the offset table is only known once the body is complete.

use std::collections::HashMap;

use plist_pack_buffers::Writer;

use super::constants::{
    marker, DEFAULT_MAX_DEPTH, DEFAULT_MAX_OBJECT_COUNT, HEADER, LENGTH_FOLLOWS,
};
use super::BplistError;
use crate::date::to_core_data_seconds;
use crate::{PlistKey, PlistValue, TypedValue};

/// Options for [`BplistEncoder`].
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Upper bound on the number of objects in the output.
    pub max_object_count: usize,
    /// Upper bound on container nesting.
    pub max_depth: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            max_object_count: DEFAULT_MAX_OBJECT_COUNT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Binary plist encoder.
pub struct BplistEncoder {
    pub options: EncoderOptions,
    pub writer: Writer,
}

impl Default for BplistEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BplistEncoder {
    pub fn new() -> Self {
        Self::with_options(EncoderOptions::default())
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self {
            options,
            writer: Writer::new(),
        }
    }

    /// Encodes a value tree as a complete `bplist00` document.
    pub fn encode(&mut self, value: &PlistValue) -> Result<Vec<u8>, BplistError> {
        let mut plan = Plan {
            entries: Vec::new(),
            ids: HashMap::new(),
            options: &self.options,
        };
        let top = plan.add(value, 0)?;
        let num_objects = plan.entries.len();

        self.writer.reset();
        self.writer.buf(HEADER);
        let mut body = Body {
            entries: &plan.entries,
            offsets: vec![None; num_objects],
            ref_size: int_width(num_objects as u64),
            writer: &mut self.writer,
        };
        body.write_entry(top)?;
        let Body {
            offsets, ref_size, ..
        } = body;

        let offset_table_offset = self.writer.x();
        let offset_size = int_width(offset_table_offset as u64);
        for offset in offsets {
            // Every id is reachable from the root, so every slot is filled.
            let offset = offset.ok_or(BplistError::ObjectNotFound(top))?;
            self.writer.uint_be(offset_size, offset as u128)?;
        }
        self.writer.buf(&[0; 6]);
        self.writer.u8(offset_size as u8);
        self.writer.u8(ref_size as u8);
        self.writer.u64(num_objects as u64);
        self.writer.u64(top as u64);
        self.writer.u64(offset_table_offset as u64);

        log::debug!(
            "bplist encoded {} objects into {} bytes",
            num_objects,
            self.writer.x()
        );
        Ok(self.writer.flush())
    }
}

/// Smallest of 1, 2, 4 or 8 bytes that holds `value`.
fn int_width(value: u64) -> usize {
    if value <= 0xff {
        1
    } else if value <= 0xffff {
        2
    } else if value <= 0xffff_ffff {
        4
    } else {
        8
    }
}

/// One slot of the object table being planned.
enum Entry<'a> {
    Value(&'a PlistValue),
    Key(&'a PlistKey),
    Array(Vec<usize>),
    Set(Vec<usize>),
    Dict { keys: Vec<usize>, values: Vec<usize> },
}

/// Identity of a deduplicated scalar.
#[derive(Debug, PartialEq, Eq, Hash)]
enum ScalarKey<'a> {
    Null,
    Undefined,
    Bool(bool),
    Int(i128),
    Float(u64),
    Str(&'a str),
}

fn value_key(value: &PlistValue) -> Option<ScalarKey<'_>> {
    match value {
        PlistValue::Null => Some(ScalarKey::Null),
        PlistValue::Undefined => Some(ScalarKey::Undefined),
        PlistValue::Bool(b) => Some(ScalarKey::Bool(*b)),
        PlistValue::Integer(i) => Some(ScalarKey::Int(*i as i128)),
        PlistValue::BigInt(i) => Some(ScalarKey::Int(*i)),
        PlistValue::Float(f) => Some(ScalarKey::Float(f.to_bits())),
        PlistValue::Str(s) => Some(ScalarKey::Str(s)),
        _ => None,
    }
}

fn key_key(key: &PlistKey) -> ScalarKey<'_> {
    match key {
        PlistKey::Str(s) => ScalarKey::Str(s),
        PlistKey::Int(i) => ScalarKey::Int(*i as i128),
        PlistKey::Float(f) => ScalarKey::Float(f.to_bits()),
    }
}

struct Plan<'a> {
    entries: Vec<Entry<'a>>,
    ids: HashMap<ScalarKey<'a>, usize>,
    options: &'a EncoderOptions,
}

impl<'a> Plan<'a> {
    fn push(&mut self, entry: Entry<'a>) -> Result<usize, BplistError> {
        let id = self.entries.len();
        if id >= self.options.max_object_count {
            return Err(BplistError::TooManyObjects {
                count: id + 1,
                max: self.options.max_object_count,
            });
        }
        self.entries.push(entry);
        Ok(id)
    }

    fn scalar(&mut self, key: ScalarKey<'a>, entry: Entry<'a>) -> Result<usize, BplistError> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok(id);
        }
        let id = self.push(entry)?;
        self.ids.insert(key, id);
        Ok(id)
    }

    fn add(&mut self, value: &'a PlistValue, depth: usize) -> Result<usize, BplistError> {
        if let Some(key) = value_key(value) {
            return self.scalar(key, Entry::Value(value));
        }
        let (items, is_set) = match value {
            PlistValue::Array(items) => (items, false),
            PlistValue::Set(items) => (items, true),
            PlistValue::Dict(dict) => {
                let id = self.container(depth)?;
                let mut keys = Vec::with_capacity(dict.len());
                let mut values = Vec::with_capacity(dict.len());
                for (key, value) in dict {
                    keys.push(self.scalar(key_key(key), Entry::Key(key))?);
                    values.push(self.add(value, depth + 1)?);
                }
                self.entries[id] = Entry::Dict { keys, values };
                return Ok(id);
            }
            _ => return self.push(Entry::Value(value)),
        };
        let id = self.container(depth)?;
        let ids = items
            .iter()
            .map(|item| self.add(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        self.entries[id] = if is_set {
            Entry::Set(ids)
        } else {
            Entry::Array(ids)
        };
        Ok(id)
    }

    /// Reserves an id for a container before its children are planned.
    fn container(&mut self, depth: usize) -> Result<usize, BplistError> {
        if depth >= self.options.max_depth {
            return Err(BplistError::DepthExceeded(self.options.max_depth));
        }
        self.push(Entry::Array(Vec::new()))
    }
}

struct Body<'p, 'w> {
    entries: &'p [Entry<'p>],
    offsets: Vec<Option<usize>>,
    ref_size: usize,
    writer: &'w mut Writer,
}

impl Body<'_, '_> {
    fn write_entry(&mut self, id: usize) -> Result<(), BplistError> {
        if self.offsets[id].is_some() {
            return Ok(());
        }
        let entries = self.entries;
        match &entries[id] {
            Entry::Array(children) | Entry::Set(children) => {
                for &child in children {
                    self.write_entry(child)?;
                }
            }
            Entry::Dict { keys, values } => {
                for &child in keys.iter().chain(values) {
                    self.write_entry(child)?;
                }
            }
            Entry::Value(_) | Entry::Key(_) => {}
        }

        self.offsets[id] = Some(self.writer.x());
        match &entries[id] {
            Entry::Value(value) => self.write_value(value),
            Entry::Key(key) => {
                match key {
                    PlistKey::Str(s) => self.write_str(s),
                    PlistKey::Int(i) => self.write_int(*i as i128),
                    PlistKey::Float(f) => self.writer.u8f64(marker::REAL64, *f),
                }
                Ok(())
            }
            Entry::Array(children) => self.write_refs(marker::ARRAY, children),
            Entry::Set(children) => self.write_refs(marker::SET, children),
            Entry::Dict { keys, values } => {
                self.write_length(marker::DICT, keys.len());
                for &child in keys.iter().chain(values) {
                    self.writer.uint_be(self.ref_size, child as u128)?;
                }
                Ok(())
            }
        }
    }

    fn write_value(&mut self, value: &PlistValue) -> Result<(), BplistError> {
        match value {
            PlistValue::Null => self.writer.u8(marker::NULL),
            PlistValue::Undefined => self.writer.u8(marker::FILL),
            PlistValue::Bool(false) => self.writer.u8(marker::FALSE),
            PlistValue::Bool(true) => self.writer.u8(marker::TRUE),
            PlistValue::Integer(i) => self.write_int(*i as i128),
            PlistValue::BigInt(i) => self.write_int(*i),
            PlistValue::Float(f) => self.writer.u8f64(marker::REAL64, *f),
            PlistValue::Date(date) => self.writer.u8f64(marker::DATE, to_core_data_seconds(date)),
            PlistValue::Data(bytes) => {
                self.write_length(marker::DATA, bytes.len());
                self.writer.buf(bytes);
            }
            PlistValue::Str(s) => self.write_str(s),
            PlistValue::Uid(uid) => self.write_uid(*uid)?,
            PlistValue::Typed(typed) => match typed {
                TypedValue::Int(i) => self.write_int(*i),
                TypedValue::Float32(f) => {
                    self.writer.u8(marker::REAL32);
                    self.writer.f32(*f);
                }
                TypedValue::Float64(f) => self.writer.u8f64(marker::REAL64, *f),
                TypedValue::Uid(uid) => self.write_uid(*uid)?,
                TypedValue::Ascii(s) => {
                    if !s.is_ascii() {
                        return Err(BplistError::NotAscii(s.clone()));
                    }
                    self.write_length(marker::ASCII, s.len());
                    self.writer.utf8(s);
                }
                TypedValue::Utf16(s) => self.write_utf16(s),
                TypedValue::Utf8(s) => {
                    self.write_length(marker::UTF8, s.len());
                    self.writer.utf8(s);
                }
            },
            PlistValue::Array(_) | PlistValue::Set(_) | PlistValue::Dict(_) => {
                unreachable!("containers are planned as their own entries")
            }
        }
        Ok(())
    }

    /// Writes an integer object.
    ///
    /// 1, 2 and 4 byte integers are read back as unsigned, so negative values
    /// and values above `i32::MAX` take at least 8 bytes.
    fn write_int(&mut self, value: i128) {
        if (0..=0xff).contains(&value) {
            self.writer.u8(marker::INT);
            self.writer.u8(value as u8);
        } else if (0..=0xffff).contains(&value) {
            self.writer.u8(marker::INT | 1);
            self.writer.u16(value as u16);
        } else if (0..=i32::MAX as i128).contains(&value) {
            self.writer.u8(marker::INT | 2);
            self.writer.u32(value as u32);
        } else if let Ok(value) = i64::try_from(value) {
            self.writer.u8(marker::INT | 3);
            self.writer.i64(value);
        } else {
            self.writer.u8(marker::INT | 4);
            self.writer.buf(&value.to_be_bytes());
        }
    }

    fn write_uid(&mut self, uid: u64) -> Result<(), BplistError> {
        let width = int_width(uid);
        self.writer.u8(marker::UID | width.trailing_zeros() as u8);
        self.writer.uint_be(width, uid as u128)?;
        Ok(())
    }

    fn write_str(&mut self, s: &str) {
        if s.is_ascii() {
            self.write_length(marker::ASCII, s.len());
            self.writer.utf8(s);
        } else {
            self.write_utf16(s);
        }
    }

    fn write_utf16(&mut self, s: &str) {
        self.write_length(marker::UTF16, s.encode_utf16().count());
        self.writer.utf16_be(s);
    }

    fn write_length(&mut self, marker: u8, len: usize) {
        if len < LENGTH_FOLLOWS as usize {
            self.writer.u8(marker | len as u8);
        } else {
            self.writer.u8(marker | LENGTH_FOLLOWS);
            self.write_int(len as i128);
        }
    }

    fn write_refs(&mut self, marker: u8, children: &[usize]) -> Result<(), BplistError> {
        self.write_length(marker, children.len());
        for &child in children {
            self.writer.uint_be(self.ref_size, child as u128)?;
        }
        Ok(())
    }
}
