//! Proptest strategies for generating native types.

#![allow(dead_code)]

use dynffi::{c, Type};
use proptest::prelude::*;

/// Fixed-width scalar types, including the untyped pointer.
pub fn scalar_types() -> Vec<Type> {
    vec![
        c::uint8(),
        c::int8(),
        c::uint16(),
        c::int16(),
        c::uint32(),
        c::int32(),
        c::uint64(),
        c::int64(),
        c::float(),
        c::double(),
        c::pointer(),
    ]
}

/// Any one scalar type.
pub fn arb_scalar() -> impl Strategy<Value = Type> {
    let types = scalar_types();
    (0..types.len()).prop_map(move |i| types[i].clone())
}

/// Integer types only.
pub fn arb_integer() -> impl Strategy<Value = Type> {
    arb_scalar().prop_filter("integer kind", |t| t.kind().is_integer())
}

/// Between one and eight member types.
pub fn arb_members() -> impl Strategy<Value = Vec<Type>> {
    prop::collection::vec(arb_scalar(), 1..=8)
}

/// `(len, cap)` with `len <= cap <= 64`.
pub fn arb_len_cap() -> impl Strategy<Value = (usize, usize)> {
    (0usize..=64).prop_flat_map(|cap| (0..=cap, Just(cap)))
}
