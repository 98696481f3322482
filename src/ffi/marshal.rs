//! Host arguments to native argument pointers.
//!
//! The engine takes one pointer per argument, addressing storage laid out
//! as the parameter type. Scalars are boxed into a fresh value of the
//! parameter type, strings into a NUL-terminated copy whose address sits in
//! a pointer cell, and values are passed in place (or by address, for
//! pointer parameters). Everything allocated here lives until the call
//! returns.

use crate::error::{FfiError, FfiResult};
use crate::types::{c, Kind, Type};
use crate::value::Value;
use std::ffi::{c_void, CString};

/// One argument to a native call.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Int(i64),
    Uint(u64),
    Float(f64),
    /// Passed as a `char*` to a transient NUL-terminated copy.
    Str(&'a str),
    Ptr(*const c_void),
    Value(&'a Value),
}

macro_rules! arg_from {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl<'a> From<$t> for Arg<'a> {
                fn from(x: $t) -> Self {
                    Arg::$variant(x as $wide)
                }
            }
        )*
    };
}

arg_from!(Int as i64: i8, i16, i32, i64, isize);
arg_from!(Uint as u64: u8, u16, u32, u64, usize);
arg_from!(Float as f64: f32, f64);

impl<'a> From<&'a str> for Arg<'a> {
    fn from(s: &'a str) -> Self {
        Arg::Str(s)
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(s: &'a String) -> Self {
        Arg::Str(s)
    }
}

impl<'a> From<&'a Value> for Arg<'a> {
    fn from(v: &'a Value) -> Self {
        Arg::Value(v)
    }
}

impl<'a, T> From<*const T> for Arg<'a> {
    fn from(p: *const T) -> Self {
        Arg::Ptr(p as *const c_void)
    }
}

impl<'a, T> From<*mut T> for Arg<'a> {
    fn from(p: *mut T) -> Self {
        Arg::Ptr(p as *const c_void)
    }
}

/// A marshaled argument and the storage backing it.
pub(crate) struct MarshalledArg {
    ptr: *mut c_void,
    _cell: Option<Value>,
    _pointee: Option<Value>,
    _text: Option<CString>,
}

impl MarshalledArg {
    /// Marshal `arg` for a parameter of type `ty` at position `index`.
    pub(crate) fn new(index: usize, arg: &Arg<'_>, ty: &Type) -> FfiResult<MarshalledArg> {
        let mismatch = |what: &str| {
            FfiError::argument(index, format!("cannot pass {} as {}", what, ty.name()))
        };
        let wrap = |e: FfiError| FfiError::argument(index, e.to_string());
        let kind = ty.kind();
        match *arg {
            Arg::Int(x) => {
                let cell = Value::new(ty);
                if kind.is_signed() {
                    cell.set_int(x).map_err(wrap)?;
                } else if kind.is_unsigned() {
                    let x = u64::try_from(x)
                        .map_err(|_| wrap(FfiError::out_of_range("Value::set_uint", kind, x)))?;
                    cell.set_uint(x).map_err(wrap)?;
                } else if matches!(kind, Kind::Float | Kind::Double) {
                    cell.set_float(x as f64).map_err(wrap)?;
                } else {
                    return Err(mismatch("an integer"));
                }
                Ok(MarshalledArg::boxed(cell))
            }
            Arg::Uint(x) => {
                let cell = Value::new(ty);
                if kind.is_unsigned() {
                    cell.set_uint(x).map_err(wrap)?;
                } else if kind.is_signed() {
                    let x = i64::try_from(x)
                        .map_err(|_| wrap(FfiError::out_of_range("Value::set_int", kind, x)))?;
                    cell.set_int(x).map_err(wrap)?;
                } else if matches!(kind, Kind::Float | Kind::Double) {
                    cell.set_float(x as f64).map_err(wrap)?;
                } else {
                    return Err(mismatch("an unsigned integer"));
                }
                Ok(MarshalledArg::boxed(cell))
            }
            Arg::Float(x) => match kind {
                Kind::Float | Kind::Double => {
                    let cell = Value::new(ty);
                    cell.set_float(x).map_err(wrap)?;
                    Ok(MarshalledArg::boxed(cell))
                }
                _ => Err(mismatch("a float")),
            },
            Arg::Str(s) => {
                if !passes_as_pointer(kind) {
                    return Err(mismatch("a string"));
                }
                let text = CString::new(s)
                    .map_err(|_| FfiError::argument(index, "string contains a NUL byte"))?;
                let cell = pointer_cell(text.as_ptr() as *const c_void).map_err(wrap)?;
                Ok(MarshalledArg {
                    ptr: cell.as_ptr(),
                    _cell: Some(cell),
                    _pointee: None,
                    _text: Some(text),
                })
            }
            Arg::Ptr(p) => {
                if !passes_as_pointer(kind) {
                    return Err(mismatch("a pointer"));
                }
                Ok(MarshalledArg::boxed(pointer_cell(p).map_err(wrap)?))
            }
            Arg::Value(v) => {
                if !v.is_valid() {
                    return Err(FfiError::argument(index, "zero Value"));
                }
                MarshalledArg::from_value(v, ty).ok_or_else(|| {
                    mismatch(&format!("a value of type {}", v.ty().name()))
                })
            }
        }
    }

    fn boxed(cell: Value) -> MarshalledArg {
        MarshalledArg {
            ptr: cell.as_ptr(),
            _cell: Some(cell),
            _pointee: None,
            _text: None,
        }
    }

    /// `None` when `v` cannot be passed as `ty`.
    fn from_value(v: &Value, ty: &Type) -> Option<MarshalledArg> {
        let in_place = || MarshalledArg::boxed(v.clone());
        let by_address = || {
            let cell = pointer_cell(v.as_ptr()).ok()?;
            Some(MarshalledArg {
                ptr: cell.as_ptr(),
                _cell: Some(cell),
                _pointee: Some(v.clone()),
                _text: None,
            })
        };
        match (ty.kind(), v.kind()) {
            // A pointer or slice value's storage already holds the address.
            (Kind::Pointer, Kind::Pointer | Kind::Slice) => Some(in_place()),
            (Kind::Slice, Kind::Slice) if v.ty().is_compatible(ty) => Some(in_place()),
            (Kind::Array, Kind::Pointer | Kind::Slice) => Some(in_place()),
            (Kind::Pointer, _) => by_address(),
            (Kind::Array | Kind::Slice, Kind::Array) => by_address(),
            _ if v.ty().is_compatible(ty) => Some(in_place()),
            _ => None,
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }
}

fn passes_as_pointer(kind: Kind) -> bool {
    matches!(kind, Kind::Pointer | Kind::Slice | Kind::Array)
}

fn pointer_cell(p: *const c_void) -> FfiResult<Value> {
    let cell = Value::new(&c::pointer());
    cell.set_pointer(p)?;
    Ok(cell)
}
