//! Binary plist decoder.
//!
//! A binary plist is a flat table of objects. The 32-byte trailer at the end
//! of the buffer locates an offset table, which maps every object index to
//! the byte offset of that object. Containers hold object indices, not
//! nested bytes, so every index and every offset read from the input is
//! validated before it is used.

use plist_pack_buffers::{print_octets, Reader};

use super::constants::{
    marker, DEFAULT_MAX_DEPTH, DEFAULT_MAX_OBJECT_COUNT, LENGTH_FOLLOWS, MAGIC, MIN_SIZE,
    NODES_PER_OBJECT, TRAILER_SIZE,
};
use super::BplistError;
use crate::date::from_core_data_seconds;
use crate::{PlistDict, PlistKey, PlistValue, TypedValue};

/// Options for [`BplistDecoder`].
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Upper bound on the trailer's object count. The expanded tree may hold
    /// at most [`NODES_PER_OBJECT`] times as many nodes.
    pub max_object_count: usize,
    /// Accept buffers that do not start with `bplist`.
    pub skip_magic_check: bool,
    /// Wrap integers, floats, UIDs and strings in [`PlistValue::Typed`].
    pub preserve_type: bool,
    /// Upper bound on container nesting.
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_object_count: DEFAULT_MAX_OBJECT_COUNT,
            skip_magic_check: false,
            preserve_type: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parsed 32-byte footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub offset_size: usize,
    pub object_ref_size: usize,
    pub num_objects: usize,
    pub top_object: usize,
    pub offset_table_offset: usize,
}

/// Binary plist decoder.
#[derive(Debug, Clone, Default)]
pub struct BplistDecoder {
    pub options: DecoderOptions,
}

impl BplistDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self { options }
    }

    /// Decodes a complete binary plist into a value tree.
    pub fn decode(&self, data: &[u8]) -> Result<PlistValue, BplistError> {
        let trailer = self.read_trailer(data)?;
        let offsets = read_offset_table(data, &trailer)?;
        let mut objects = ObjectTable {
            data,
            trailer,
            offsets,
            on_path: vec![false; trailer.num_objects],
            nodes: 0,
            max_nodes: self.options.max_object_count.saturating_mul(NODES_PER_OBJECT),
            depth: 0,
            max_depth: self.options.max_depth,
            preserve_type: self.options.preserve_type,
        };
        objects.read_object(trailer.top_object)
    }

    /// Validates the magic and parses the trailer.
    pub fn read_trailer(&self, data: &[u8]) -> Result<Trailer, BplistError> {
        if data.len() < MIN_SIZE {
            return Err(BplistError::TooSmall(data.len()));
        }
        if !self.options.skip_magic_check && &data[..MAGIC.len()] != MAGIC {
            return Err(BplistError::InvalidMagic(print_octets(
                &data[..MAGIC.len()],
                MAGIC.len(),
            )));
        }

        let start = data.len() - TRAILER_SIZE;
        let mut reader = Reader::at(data, start + 6);
        let offset_size = reader.try_u8()? as usize;
        let object_ref_size = reader.try_u8()? as usize;
        let num_objects = to_usize("numObjects", reader.try_u64()?)?;
        let top_object = to_usize("topObject", reader.try_u64()?)?;
        let offset_table_offset = to_usize("offsetTableOffset", reader.try_u64()?)?;

        if !matches!(offset_size, 1 | 2 | 4 | 8) {
            return Err(BplistError::InvalidIntSize {
                size: offset_size,
                offset: start + 6,
            });
        }
        if !(1..=8).contains(&object_ref_size) {
            return Err(BplistError::InvalidIntSize {
                size: object_ref_size,
                offset: start + 7,
            });
        }
        if num_objects > self.options.max_object_count {
            return Err(BplistError::TooManyObjects {
                count: num_objects,
                max: self.options.max_object_count,
            });
        }
        if top_object >= num_objects {
            return Err(BplistError::ObjectNotFound(top_object));
        }

        let table_len = num_objects
            .checked_mul(offset_size)
            .ok_or(BplistError::ValueTooLarge {
                field: "offset table",
                value: num_objects as u128 * offset_size as u128,
            })?;
        let in_bounds = offset_table_offset >= MAGIC.len()
            && offset_table_offset
                .checked_add(table_len)
                .is_some_and(|end| end <= start);
        if !in_bounds {
            return Err(BplistError::OutOfBounds {
                what: "offset table",
                offset: offset_table_offset,
                len: table_len,
            });
        }

        let trailer = Trailer {
            offset_size,
            object_ref_size,
            num_objects,
            top_object,
            offset_table_offset,
        };
        log::trace!("bplist trailer: {:?}", trailer);
        Ok(trailer)
    }
}

fn to_usize(field: &'static str, value: u64) -> Result<usize, BplistError> {
    usize::try_from(value).map_err(|_| BplistError::ValueTooLarge {
        field,
        value: value as u128,
    })
}

fn read_offset_table(data: &[u8], trailer: &Trailer) -> Result<Vec<usize>, BplistError> {
    let mut reader = Reader::at(data, trailer.offset_table_offset);
    let mut offsets = Vec::with_capacity(trailer.num_objects);
    for _ in 0..trailer.num_objects {
        let offset = reader.try_uint_be(trailer.offset_size)?;
        offsets.push(to_usize("object offset", offset as u64)?);
    }
    Ok(offsets)
}

/// Per-call decoding state.
struct ObjectTable<'a> {
    data: &'a [u8],
    trailer: Trailer,
    offsets: Vec<usize>,
    /// Containers currently being read, by object index.
    on_path: Vec<bool>,
    /// Nodes produced so far; a shared object counts once per reference.
    nodes: usize,
    max_nodes: usize,
    depth: usize,
    max_depth: usize,
    preserve_type: bool,
}

impl<'a> ObjectTable<'a> {
    fn read_object(&mut self, index: usize) -> Result<PlistValue, BplistError> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(BplistError::TooManyObjects {
                count: self.nodes,
                max: self.max_nodes,
            });
        }
        let offset = match self.offsets.get(index) {
            Some(&offset) if offset != 0 => offset,
            _ => return Err(BplistError::ObjectNotFound(index)),
        };
        if offset >= self.data.len() {
            return Err(BplistError::OutOfBounds {
                what: "object",
                offset,
                len: 1,
            });
        }

        let mut reader = Reader::at(self.data, offset);
        let byte = reader.try_u8()?;
        let low = byte & 0x0f;
        match byte & 0xf0 {
            0x00 => match byte {
                marker::NULL => Ok(PlistValue::Null),
                marker::FALSE => Ok(PlistValue::Bool(false)),
                marker::TRUE => Ok(PlistValue::Bool(true)),
                marker::FILL => Ok(PlistValue::Undefined),
                _ => Err(BplistError::InvalidType {
                    marker: byte,
                    offset,
                }),
            },
            marker::INT => {
                let value = read_int(&mut reader, low, offset)?;
                Ok(if self.preserve_type {
                    PlistValue::Typed(TypedValue::Int(value))
                } else {
                    PlistValue::from(value)
                })
            }
            marker::REAL => match (byte, self.preserve_type) {
                (marker::REAL32, true) => Ok(TypedValue::Float32(reader.try_f32()?).into()),
                (marker::REAL32, false) => Ok(PlistValue::Float(reader.try_f32()? as f64)),
                (marker::REAL64, true) => Ok(TypedValue::Float64(reader.try_f64()?).into()),
                (marker::REAL64, false) => Ok(PlistValue::Float(reader.try_f64()?)),
                _ => Err(BplistError::InvalidType {
                    marker: byte,
                    offset,
                }),
            },
            0x30 => {
                if byte != marker::DATE {
                    return Err(BplistError::InvalidType {
                        marker: byte,
                        offset,
                    });
                }
                let seconds = reader.try_f64()?;
                from_core_data_seconds(seconds)
                    .map(PlistValue::Date)
                    .ok_or(BplistError::InvalidDate(seconds))
            }
            marker::DATA => {
                let len = read_length(&mut reader, low, offset)?;
                Ok(PlistValue::Data(take(&mut reader, "data", len)?.to_vec()))
            }
            marker::ASCII => {
                let len = read_length(&mut reader, low, offset)?;
                let bytes = take(&mut reader, "ascii string", len)?;
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let s: String = bytes[..end].iter().map(|&b| b as char).collect();
                Ok(self.string(s, TypedValue::Ascii))
            }
            marker::UTF16 => {
                let count = read_length(&mut reader, low, offset)?;
                let len = count.checked_mul(2).ok_or(BplistError::ValueTooLarge {
                    field: "utf-16 length",
                    value: count as u128 * 2,
                })?;
                let bytes = take(&mut reader, "utf-16 string", len)?;
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                let s =
                    String::from_utf16(&units).map_err(|_| BplistError::InvalidUtf16(offset))?;
                Ok(self.string(s, TypedValue::Utf16))
            }
            marker::UTF8 => {
                let len = read_length(&mut reader, low, offset)?;
                let bytes = take(&mut reader, "utf-8 string", len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| BplistError::InvalidUtf8(offset))?
                    .to_owned();
                Ok(self.string(s, TypedValue::Utf8))
            }
            marker::UID => {
                if low > 3 {
                    return Err(BplistError::InvalidIntSize {
                        size: 1usize << low,
                        offset,
                    });
                }
                let uid = reader.try_uint_be(1 << low)? as u64;
                Ok(if self.preserve_type {
                    PlistValue::Typed(TypedValue::Uid(uid))
                } else {
                    PlistValue::Uid(uid)
                })
            }
            marker::ARRAY | marker::SET => {
                let count = read_length(&mut reader, low, offset)?;
                let refs = self.read_refs(&mut reader, count)?;
                self.enter(index)?;
                let mut items = Vec::with_capacity(count);
                for child in refs {
                    let value = self.read_object(child)?;
                    if byte & 0xf0 == marker::ARRAY {
                        items.push(value);
                    } else if !(value.is_scalar() && items.contains(&value)) {
                        items.push(value);
                    }
                }
                self.leave(index);
                Ok(if byte & 0xf0 == marker::ARRAY {
                    PlistValue::Array(items)
                } else {
                    PlistValue::Set(items)
                })
            }
            marker::DICT => {
                let count = read_length(&mut reader, low, offset)?;
                let key_refs = self.read_refs(&mut reader, count)?;
                let value_refs = self.read_refs(&mut reader, count)?;
                self.enter(index)?;
                let mut dict = PlistDict::with_capacity(count);
                for (key_ref, value_ref) in key_refs.into_iter().zip(value_refs) {
                    let key = self.read_key(key_ref)?;
                    let value = self.read_object(value_ref)?;
                    dict.insert(key, value);
                }
                self.leave(index);
                Ok(PlistValue::Dict(dict))
            }
            _ => Err(BplistError::InvalidType {
                marker: byte,
                offset,
            }),
        }
    }

    fn string(&self, s: String, typed: fn(String) -> TypedValue) -> PlistValue {
        if self.preserve_type {
            PlistValue::Typed(typed(s))
        } else {
            PlistValue::Str(s)
        }
    }

    fn read_key(&mut self, index: usize) -> Result<PlistKey, BplistError> {
        let key = self.read_object(index)?;
        match key.untyped().into_owned() {
            PlistValue::Str(s) => Ok(PlistKey::Str(s)),
            PlistValue::Integer(i) => Ok(PlistKey::Int(i)),
            PlistValue::Float(f) => Ok(PlistKey::Float(f)),
            other => Err(BplistError::InvalidKey {
                kind: other.kind(),
                offset: self.offsets[index],
            }),
        }
    }

    /// Reads `count` object references after checking they fit in the buffer.
    fn read_refs(&self, reader: &mut Reader<'a>, count: usize) -> Result<Vec<usize>, BplistError> {
        let ref_size = self.trailer.object_ref_size;
        let len = count.checked_mul(ref_size).ok_or(BplistError::ValueTooLarge {
            field: "reference table",
            value: count as u128 * ref_size as u128,
        })?;
        if len > reader.size() {
            return Err(BplistError::OutOfBounds {
                what: "reference table",
                offset: reader.x,
                len,
            });
        }
        let mut refs = Vec::with_capacity(count);
        for _ in 0..count {
            let index = reader.try_uint_be(ref_size)?;
            refs.push(to_usize("object reference", index as u64)?);
        }
        Ok(refs)
    }

    fn enter(&mut self, index: usize) -> Result<(), BplistError> {
        if self.on_path[index] {
            return Err(BplistError::CyclicReference(index));
        }
        if self.depth >= self.max_depth {
            return Err(BplistError::DepthExceeded(self.max_depth));
        }
        self.on_path[index] = true;
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, index: usize) {
        self.on_path[index] = false;
        self.depth -= 1;
    }
}

/// Reads an integer payload whose width is `1 << low` bytes.
///
/// Widths up to 4 bytes are unsigned; 8 and 16 byte integers are signed.
fn read_int(reader: &mut Reader<'_>, low: u8, offset: usize) -> Result<i128, BplistError> {
    if low > 4 {
        return Err(BplistError::InvalidIntSize {
            size: 1usize << low.min(15),
            offset,
        });
    }
    let width = 1usize << low;
    Ok(if width <= 4 {
        reader.try_uint_be(width)? as i128
    } else {
        reader.try_int_be(width)?
    })
}

/// Reads an object length from the marker's low nibble, or from the integer
/// object that follows it when the nibble is `0xF`.
fn read_length(reader: &mut Reader<'_>, low: u8, offset: usize) -> Result<usize, BplistError> {
    if low != LENGTH_FOLLOWS {
        return Ok(low as usize);
    }
    let int_offset = reader.x;
    let byte = reader.try_u8()?;
    if byte & 0xf0 != marker::INT {
        return Err(BplistError::InvalidType {
            marker: byte,
            offset: int_offset,
        });
    }
    let value = read_int(reader, byte & 0x0f, int_offset)?;
    if value < 0 {
        return Err(BplistError::NegativeLength { value, offset });
    }
    usize::try_from(value).map_err(|_| BplistError::ValueTooLarge {
        field: "length",
        value: value as u128,
    })
}

fn take<'a>(
    reader: &mut Reader<'a>,
    what: &'static str,
    len: usize,
) -> Result<&'a [u8], BplistError> {
    let offset = reader.x;
    reader
        .try_buf(len)
        .map_err(|_| BplistError::OutOfBounds { what, offset, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lays out `objects` back to back as objects 0, 1, ... with one-byte
    /// offsets and references. Object 0 is the top object.
    fn table(objects: &[&[u8]]) -> Vec<u8> {
        let mut data = b"bplist00".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for object in objects {
            offsets.push(data.len() as u8);
            data.extend_from_slice(object);
        }
        let table = data.len();
        data.extend_from_slice(&offsets);
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, 1]);
        data.extend_from_slice(&(objects.len() as u64).to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&(table as u64).to_be_bytes());
        data
    }

    fn single(object: &[u8]) -> Vec<u8> {
        table(&[object])
    }

    /// `levels` arrays, each referencing the next one `refs` times, ending in
    /// a null.
    fn chain(levels: usize, refs: usize) -> Vec<u8> {
        let mut objects: Vec<Vec<u8>> = (0..levels)
            .map(|i| {
                let mut object = vec![0xa0 | refs as u8];
                object.extend(std::iter::repeat(i as u8 + 1).take(refs));
                object
            })
            .collect();
        objects.push(vec![0x00]);
        let objects: Vec<&[u8]> = objects.iter().map(Vec::as_slice).collect();
        table(&objects)
    }

    fn decode(data: &[u8]) -> Result<PlistValue, BplistError> {
        BplistDecoder::new().decode(data)
    }

    #[test]
    fn singletons() {
        assert_eq!(decode(&single(&[0x00])), Ok(PlistValue::Null));
        assert_eq!(decode(&single(&[0x08])), Ok(PlistValue::Bool(false)));
        assert_eq!(decode(&single(&[0x09])), Ok(PlistValue::Bool(true)));
        assert_eq!(decode(&single(&[0x0f])), Ok(PlistValue::Undefined));
        assert_eq!(
            decode(&single(&[0x05])),
            Err(BplistError::InvalidType {
                marker: 0x05,
                offset: 8
            })
        );
    }

    #[test]
    fn integer_widths() {
        assert_eq!(decode(&single(&[0x10, 0xff])), Ok(PlistValue::Integer(255)));
        assert_eq!(
            decode(&single(&[0x12, 0xff, 0xff, 0xff, 0xff])),
            Ok(PlistValue::Integer(0xffff_ffff))
        );
        let mut neg = vec![0x13];
        neg.extend_from_slice(&(-2i64).to_be_bytes());
        assert_eq!(decode(&single(&neg)), Ok(PlistValue::Integer(-2)));
        let mut big = vec![0x14];
        big.extend_from_slice(&(i128::MIN).to_be_bytes());
        assert_eq!(decode(&single(&big)), Ok(PlistValue::BigInt(i128::MIN)));
        assert!(matches!(
            decode(&single(&[0x15, 0, 0])),
            Err(BplistError::InvalidIntSize { offset: 8, .. })
        ));
    }

    #[test]
    fn ascii_truncates_at_nul() {
        assert_eq!(
            decode(&single(&[0x55, b'a', b'b', 0, b'c', b'd'])),
            Ok(PlistValue::Str("ab".into()))
        );
    }

    #[test]
    fn length_follows_marker() {
        let mut object = vec![0x4f, 0x10, 20];
        object.extend_from_slice(&[7u8; 20]);
        assert_eq!(decode(&single(&object)), Ok(PlistValue::Data(vec![7; 20])));
        assert!(matches!(
            decode(&single(&[0x4f, 0x20, 0])),
            Err(BplistError::InvalidType { marker: 0x20, .. })
        ));
    }

    #[test]
    fn preserve_type_wraps_scalars() {
        let decoder = BplistDecoder::with_options(DecoderOptions {
            preserve_type: true,
            ..Default::default()
        });
        assert_eq!(
            decoder.decode(&single(&[0x22, 0x3f, 0xc0, 0, 0])),
            Ok(PlistValue::Typed(TypedValue::Float32(1.5)))
        );
        assert_eq!(
            decoder.decode(&single(&[0x61, 0x00, 0x68])),
            Ok(PlistValue::Typed(TypedValue::Utf16("h".into())))
        );
        assert_eq!(
            decoder.decode(&single(&[0x81, 0x01, 0x00])),
            Ok(PlistValue::Typed(TypedValue::Uid(256)))
        );
    }

    #[test]
    fn self_referencing_array_is_rejected() {
        // Object 0 is an array whose only element is object 0.
        assert_eq!(
            decode(&single(&[0xa1, 0x00])),
            Err(BplistError::CyclicReference(0))
        );
    }

    #[test]
    fn zero_offset_is_not_found() {
        let mut data = single(&[0x00]);
        let table = data.len() - TRAILER_SIZE - 1;
        data[table] = 0;
        assert_eq!(decode(&data), Err(BplistError::ObjectNotFound(0)));
    }

    #[test]
    fn uid_width_from_low_nibble() {
        assert_eq!(decode(&single(&[0x80, 0x07])), Ok(PlistValue::Uid(7)));
        assert_eq!(
            decode(&single(&[0x82, 0x00, 0x00, 0x01, 0x00])),
            Ok(PlistValue::Uid(256))
        );
        let mut wide = vec![0x83];
        wide.extend_from_slice(&42u64.to_be_bytes());
        assert_eq!(decode(&single(&wide)), Ok(PlistValue::Uid(42)));
        assert_eq!(
            decode(&single(&[0x84, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1])),
            Err(BplistError::InvalidIntSize {
                size: 16,
                offset: 8
            })
        );
    }

    #[test]
    fn set_marker() {
        let data = table(&[&[0xb3, 1, 1, 2], &[0x10, 5], &[0x51, b'x']]);
        assert_eq!(
            decode(&data),
            Ok(PlistValue::Set(vec![PlistValue::Integer(5), "x".into()]))
        );
        assert_eq!(
            decode(&single(&[0xc0])),
            Err(BplistError::InvalidType {
                marker: 0xc0,
                offset: 8
            })
        );
    }

    #[test]
    fn nesting_depth_limit() {
        let decoder = BplistDecoder::with_options(DecoderOptions {
            max_depth: 4,
            ..Default::default()
        });
        assert_eq!(
            decoder.decode(&chain(6, 1)),
            Err(BplistError::DepthExceeded(4))
        );
        assert!(decoder.decode(&chain(4, 1)).is_ok());
    }

    #[test]
    fn shared_references_count_toward_node_limit() {
        let decoder = BplistDecoder::with_options(DecoderOptions {
            max_object_count: 64,
            ..Default::default()
        });
        // 41 objects that would expand into 2^40 leaves.
        assert_eq!(
            decoder.decode(&chain(40, 2)),
            Err(BplistError::TooManyObjects {
                count: 257,
                max: 256
            })
        );
        // 7 objects, 127 nodes.
        assert!(decoder.decode(&chain(6, 2)).is_ok());
    }
}
