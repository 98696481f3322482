// Type registry behavior through the public API.

use dynffi::{
    c, new_array_type, new_pointer_type, new_slice_type, new_struct_type, type_by_name, Field,
    FfiError, Kind, Value,
};
use std::mem::{align_of, size_of};
use std::os::raw::{c_int, c_long, c_short};

// ── Builtins ────────────────────────────────────────────────────────

#[test]
fn test_builtin_sizes_are_native() {
    let cases = [
        ("char", 1),
        ("unsigned char", 1),
        ("short", size_of::<c_short>()),
        ("unsigned short", size_of::<c_short>()),
        ("int", size_of::<c_int>()),
        ("unsigned int", size_of::<c_int>()),
        ("long", size_of::<c_long>()),
        ("unsigned long", size_of::<c_long>()),
        ("uint8", 1),
        ("int8", 1),
        ("uint16", 2),
        ("int16", 2),
        ("uint32", 4),
        ("int32", 4),
        ("uint64", 8),
        ("int64", 8),
        ("float", 4),
        ("double", 8),
        ("*", size_of::<*const u8>()),
    ];
    for (name, size) in cases {
        let ty = type_by_name(name).unwrap();
        assert_eq!(ty.size(), size, "size of {}", name);
        assert_eq!(Value::new(&ty).kind(), ty.kind(), "kind of New({})", name);
    }
}

#[test]
fn test_c_names_map_to_fixed_width_kinds() {
    assert!(c::int().kind().is_signed());
    assert!(c::uint().kind().is_unsigned());
    assert_eq!(c::char().kind(), Kind::Int8);
    assert_eq!(c::uchar().kind(), Kind::Uint8);
    assert_eq!(c::long().size(), size_of::<c_long>());
    assert_eq!(c::longdouble().kind(), Kind::LongDouble);
}

// ── Structs ─────────────────────────────────────────────────────────

#[test]
fn test_struct_offsets_example() {
    let ty = new_struct_type(
        "api_struct_1",
        &[
            Field::new("F1", &c::uint8()),
            Field::new("F2", &c::int16()),
            Field::new("F3", &c::int32()),
            Field::new("F4", &c::uint8()),
        ],
    )
    .unwrap();
    assert_eq!(ty.num_field().unwrap(), 4);
    let offsets: Vec<usize> = (0..4).map(|i| ty.field(i).unwrap().offset).collect();
    assert_eq!(offsets, vec![0, 2, 4, 8]);
    assert_eq!(ty.size(), 12);
    assert_eq!(ty.field_index("F3"), Some(2));
    assert_eq!(ty.field_index("F9"), None);
    assert!(matches!(ty.field(4), Err(FfiError::Index { .. })));
}

#[test]
fn test_single_field_struct() {
    let ty = new_struct_type("api_struct_2", &[Field::new("F1", &c::int32())]).unwrap();
    assert_eq!(ty.field(0).unwrap().offset, 0);
    assert_eq!(ty.size(), c::int32().size());
}

#[test]
fn test_struct_with_array_member() {
    let arr = new_array_type(10, &c::int32()).unwrap();
    let ty = new_struct_type(
        "api_struct_3",
        &[
            Field::new("F1", &c::uint8()),
            Field::new("F2", &arr),
            Field::new("F3", &c::int32()),
            Field::new("F4", &c::uint8()),
        ],
    )
    .unwrap();
    let p = align_of::<usize>();
    let offsets: Vec<usize> = ty.fields().unwrap().iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, p, p + 40, p + 44]);
    assert_eq!(ty.size() % ty.align(), 0);
    if p == 8 {
        assert_eq!(ty.size(), 56);
    }
}

#[test]
fn test_nested_struct_member() {
    let inner = new_struct_type(
        "api_inner",
        &[Field::new("a", &c::uint8()), Field::new("b", &c::double())],
    )
    .unwrap();
    let outer = new_struct_type(
        "api_outer",
        &[Field::new("tag", &c::uint8()), Field::new("inner", &inner)],
    )
    .unwrap();
    assert_eq!(outer.field(1).unwrap().offset, inner.align());
    assert_eq!(outer.size(), inner.align() + inner.size());
}

#[test]
fn test_struct_redefinition_is_an_error() {
    let a = [Field::new("x", &c::int32()), Field::new("y", &c::int32())];
    let first = new_struct_type("api_redef", &a).unwrap();
    assert_eq!(new_struct_type("api_redef", &a).unwrap(), first);

    let b = [Field::new("x", &c::int32())];
    assert!(matches!(
        new_struct_type("api_redef", &b),
        Err(FfiError::Type { .. })
    ));
    // Registry keeps the first definition.
    assert_eq!(type_by_name("api_redef").unwrap(), first);
}

// ── Arrays, pointers, slices ────────────────────────────────────────

#[test]
fn test_array_types_memoized() {
    for (len, elem) in [(1, c::uint8()), (16, c::int64()), (3, c::float())] {
        let a = new_array_type(len, &elem).unwrap();
        assert_eq!(a.size(), len * elem.size());
        assert_eq!(a.len().unwrap(), len);
        assert_eq!(a.elem().unwrap(), elem);
        assert_eq!(new_array_type(len, &elem).unwrap(), a);
        assert_eq!(type_by_name(&format!("{}[{}]", elem.name(), len)).unwrap(), a);
    }
}

#[test]
fn test_pointer_names_and_sizes() {
    let p = new_pointer_type(&c::double()).unwrap();
    assert_eq!(p.name(), "double*");
    assert_eq!(p.size(), size_of::<*const u8>());
    let pp = new_pointer_type(&p).unwrap();
    assert_eq!(pp.name(), "double**");
    assert_eq!(pp.elem().unwrap(), p);
}

#[test]
fn test_slice_type() {
    let s = new_slice_type(&c::uint8()).unwrap();
    assert_eq!(s.kind(), Kind::Slice);
    assert_eq!(s.name(), "uint8[]");
    assert!(matches!(s.len(), Err(FfiError::Kind { .. })));
}

#[test]
fn test_compatibility_ignores_names() {
    let a = new_struct_type("api_compat_a", &[Field::new("x", &c::int32())]).unwrap();
    let b = new_struct_type("api_compat_b", &[Field::new("y", &c::int())]).unwrap();
    let c_ = new_struct_type("api_compat_c", &[Field::new("x", &c::uint32())]).unwrap();
    assert!(a.is_compatible(&b));
    assert!(!a.is_compatible(&c_));
}
