//! Writer/Reader roundtrip matrix for the buffers crate.

use plist_pack_buffers::{BufferError, Reader, Writer};

#[test]
fn roundtrip_fixed_width_integers() {
    let mut w = Writer::new();
    w.u8(0xff);
    w.u16(u16::MAX);
    w.u32(0x0102_0304);
    w.u64(u64::MAX);
    w.i64(-9_999_999_999);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.try_u8(), Ok(0xff));
    assert_eq!(r.try_u16(), Ok(u16::MAX));
    assert_eq!(r.try_uint_be(4), Ok(0x0102_0304));
    assert_eq!(r.try_u64(), Ok(u64::MAX));
    assert_eq!(r.try_int_be(8), Ok(-9_999_999_999));
    assert_eq!(r.size(), 0);
}

#[test]
fn roundtrip_floats() {
    let mut w = Writer::new();
    w.f32(1.5);
    w.f64(std::f64::consts::PI);
    w.u8f64(0x23, -0.25);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.try_f32(), Ok(1.5));
    assert_eq!(r.try_f64(), Ok(std::f64::consts::PI));
    assert_eq!(r.try_u8(), Ok(0x23));
    assert_eq!(r.try_f64(), Ok(-0.25));
}

#[test]
fn roundtrip_f64_nan() {
    let mut w = Writer::new();
    w.f64(f64::NAN);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert!(r.try_f64().unwrap().is_nan());
}

#[test]
fn roundtrip_arbitrary_width_matrix() {
    let unsigned: [(usize, u128); 6] = [
        (1, 0x7f),
        (2, 0xbeef),
        (3, 0x0a_0b0c),
        (7, 0x0102_0304_0506_07),
        (8, u64::MAX as u128),
        (16, u128::MAX),
    ];
    for (width, value) in unsigned {
        let mut w = Writer::new();
        w.uint_be(width, value).unwrap();
        let data = w.flush();
        assert_eq!(data.len(), width);
        let mut r = Reader::new(&data);
        assert_eq!(r.try_uint_be(width), Ok(value), "width {width}");
    }

    let signed: [(usize, i128); 5] = [
        (1, -1),
        (2, -300),
        (8, i64::MIN as i128),
        (8, i64::MAX as i128),
        (16, i128::MIN),
    ];
    for (width, value) in signed {
        let mut w = Writer::new();
        w.uint_be(width, value as u128).unwrap();
        let data = w.flush();
        let mut r = Reader::new(&data);
        assert_eq!(r.try_int_be(width), Ok(value), "width {width}");
    }
}

#[test]
fn underrun_is_distinguishable() {
    let data = [0u8; 7];
    let mut r = Reader::new(&data);
    assert_eq!(r.try_u64(), Err(BufferError::EndOfBuffer));
    assert_eq!(r.try_uint_be(8), Err(BufferError::EndOfBuffer));
    assert_eq!(r.try_buf(usize::MAX), Err(BufferError::EndOfBuffer));
    assert_eq!(r.try_uint_be(20), Err(BufferError::InvalidWidth(20)));
}

#[test]
fn strings_are_written_raw() {
    let mut w = Writer::new();
    assert_eq!(w.utf8("hé"), 3);
    assert_eq!(w.utf16_be("hé"), 2);
    w.buf(&[0]);
    assert_eq!(w.flush(), [b'h', 0xc3, 0xa9, 0x00, b'h', 0x00, 0xe9, 0x00]);
}
