// Value navigation, accessors and slices through the public API.

use dynffi::{
    c, grow_slice, make_slice, new_array_type, new_slice_type, new_struct_type, Field, FfiError,
    Kind, Type, Value,
};
use std::io::{Read, Write};

fn pair() -> Type {
    new_struct_type(
        "values_pair",
        &[Field::new("key", &c::uint16()), Field::new("val", &c::int64())],
    )
    .unwrap()
}

// ── Construction ────────────────────────────────────────────────────

#[test]
fn test_new_value_is_zeroed() {
    let v = Value::new(&pair());
    assert!(v.is_valid());
    assert!(v.bytes().unwrap().iter().all(|b| *b == 0));
    assert_eq!(v.field(0).unwrap().uint().unwrap(), 0);
}

#[test]
fn test_new_at_views_foreign_memory() {
    let mut raw: [i32; 4] = [1, 2, 3, 4];
    let ty = new_array_type(4, &c::int32()).unwrap();
    let v = unsafe { Value::new_at(&ty, raw.as_mut_ptr().cast()) };
    assert_eq!(v.index(2).unwrap().int().unwrap(), 3);
    v.index(0).unwrap().set_int(-9).unwrap();
    assert_eq!(raw[0], -9);
}

// ── Fields ──────────────────────────────────────────────────────────

#[test]
fn test_fields_alias_parent() {
    let v = Value::new(&pair());
    v.field_by_name("val").unwrap().set_int(-5).unwrap();
    v.field(0).unwrap().set_uint(7).unwrap();
    assert_eq!(v.field(1).unwrap().int().unwrap(), -5);
    assert_eq!(v.field_by_name("key").unwrap().uint().unwrap(), 7);
    assert!(matches!(
        v.field_by_name("nope"),
        Err(FfiError::NoSuchField { .. })
    ));
    assert!(matches!(v.field(2), Err(FfiError::Index { .. })));
}

#[test]
fn test_field_by_index_path() {
    let outer = new_struct_type(
        "values_outer",
        &[Field::new("flag", &c::uint8()), Field::new("pair", &pair())],
    )
    .unwrap();
    let v = Value::new(&outer);
    v.field_by_index(&[1, 1]).unwrap().set_int(99).unwrap();
    assert_eq!(
        v.field(1).unwrap().field_by_name("val").unwrap().int().unwrap(),
        99
    );
}

#[test]
fn test_field_outlives_parent_handle() {
    let field = {
        let v = Value::new(&pair());
        v.field(1).unwrap().set_int(12).unwrap();
        v.field(1).unwrap()
    };
    assert_eq!(field.int().unwrap(), 12);
}

// ── Pointers ────────────────────────────────────────────────────────

#[test]
fn test_addr_and_elem() {
    let v = Value::new(&c::double());
    v.set_float(2.5).unwrap();
    let p = v.addr().unwrap();
    assert_eq!(p.kind(), Kind::Pointer);
    assert_eq!(p.ty().name(), "double*");
    assert!(!p.is_nil().unwrap());
    let back = unsafe { p.elem() }.unwrap();
    back.set_float(4.0).unwrap();
    assert_eq!(v.float().unwrap(), 4.0);
}

#[test]
fn test_pointee_kept_alive_by_pointer() {
    let p = {
        let v = Value::new(&c::int32());
        v.set_int(31).unwrap();
        v.addr().unwrap()
    };
    assert_eq!(unsafe { p.elem() }.unwrap().int().unwrap(), 31);
}

#[test]
fn test_nil_pointer_elem_is_zero_value() {
    let p = Value::new(&c::pointer());
    assert!(p.is_nil().unwrap());
    let z = unsafe { p.elem() }.unwrap();
    assert!(!z.is_valid());
    assert!(!z.can_addr());
    assert!(matches!(z.int(), Err(FfiError::InvalidValue { .. })));
}

#[test]
fn test_indirect_passes_non_pointers() {
    let v = Value::new(&c::int16());
    let same = unsafe { v.indirect() }.unwrap();
    assert_eq!(same.as_ptr(), v.as_ptr());
}

// ── Accessors ───────────────────────────────────────────────────────

#[test]
fn test_accessor_kind_checks() {
    let v = Value::new(&c::uint32());
    assert!(matches!(v.int(), Err(FfiError::Kind { .. })));
    assert!(matches!(v.set_float(1.0), Err(FfiError::Kind { .. })));
    assert!(matches!(v.set_uint(1 << 40), Err(FfiError::OutOfRange { .. })));
    v.set_uint(u32::MAX as u64).unwrap();
    assert_eq!(v.uint().unwrap(), u32::MAX as u64);
}

#[test]
fn test_signed_range() {
    let v = Value::new(&c::int8());
    v.set_int(-128).unwrap();
    assert_eq!(v.int().unwrap(), -128);
    assert!(v.set_int(128).is_err());
}

#[test]
fn test_reader_writer_bounded() {
    let v = Value::new(&c::uint32());
    let mut w = v.writer().unwrap();
    assert_eq!(w.write(&[1, 2, 3, 4, 5, 6]).unwrap(), 4);
    let mut out = Vec::new();
    v.reader().unwrap().read_to_end(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4]);
    assert_eq!(v.uint().unwrap(), u32::from_ne_bytes([1, 2, 3, 4]) as u64);
}

#[test]
fn test_set_bytes_requires_exact_size() {
    let v = Value::new(&c::uint16());
    assert!(v.set_bytes(&[1]).is_err());
    v.set_bytes(&[0xff, 0xff]).unwrap();
    assert_eq!(v.uint().unwrap(), 0xffff);
}

// ── Slices ──────────────────────────────────────────────────────────

#[test]
fn test_make_slice_and_index() {
    let ty = new_slice_type(&c::int64()).unwrap();
    let s = make_slice(&ty, 3, 8).unwrap();
    assert_eq!((s.len().unwrap(), s.cap().unwrap()), (3, 8));
    s.index(2).unwrap().set_int(-1).unwrap();
    assert!(matches!(s.index(3), Err(FfiError::Index { .. })));
    assert!(matches!(make_slice(&ty, 4, 2), Err(FfiError::Index { .. })));
    assert!(matches!(make_slice(&c::int64(), 1, 1), Err(FfiError::Kind { .. })));
}

#[test]
fn test_slice_of_array_shares_storage() {
    let arr = Value::new(&new_array_type(6, &c::uint8()).unwrap());
    let s = arr.slice(2, 4).unwrap();
    assert_eq!((s.len().unwrap(), s.cap().unwrap()), (2, 4));
    s.index(0).unwrap().set_uint(9).unwrap();
    assert_eq!(arr.index(2).unwrap().uint().unwrap(), 9);
    assert!(arr.slice(3, 7).is_err());
    assert!(arr.slice(4, 3).is_err());
}

#[test]
fn test_grow_within_capacity_reslices() {
    let ty = new_slice_type(&c::int32()).unwrap();
    let s = make_slice(&ty, 2, 4).unwrap();
    let (g, i0, i1) = grow_slice(&s, 2).unwrap();
    assert_eq!((i0, i1), (2, 4));
    assert_eq!(g.cap().unwrap(), 4);
    g.index(0).unwrap().set_int(5).unwrap();
    assert_eq!(s.index(0).unwrap().int().unwrap(), 5);
}

#[test]
fn test_grow_past_capacity_copies() {
    let ty = new_slice_type(&c::int32()).unwrap();
    let s = make_slice(&ty, 3, 3).unwrap();
    for i in 0..3 {
        s.index(i).unwrap().set_int(i as i64 + 10).unwrap();
    }
    let (g, i0, i1) = grow_slice(&s, 1).unwrap();
    assert_eq!((i0, i1), (3, 4));
    assert_eq!(g.cap().unwrap(), 6);
    let copied: Vec<i64> = (0..3).map(|i| g.index(i).unwrap().int().unwrap()).collect();
    assert_eq!(copied, vec![10, 11, 12]);
    assert_eq!(g.index(3).unwrap().int().unwrap(), 0);

    // Detached from the old backing array.
    g.index(0).unwrap().set_int(0).unwrap();
    assert_eq!(s.index(0).unwrap().int().unwrap(), 10);
}

#[test]
fn test_grow_empty_slice() {
    let ty = new_slice_type(&c::double()).unwrap();
    let s = Value::new(&ty);
    assert!(s.is_nil().unwrap());
    let (g, i0, i1) = grow_slice(&s, 5).unwrap();
    assert_eq!((i0, i1), (0, 5));
    assert_eq!(g.cap().unwrap(), 5);
    assert!(!g.is_nil().unwrap());
}
