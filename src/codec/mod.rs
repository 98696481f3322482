//! Moving host data in and out of native values.
//!
//! The host side is any type implementing [`Native`]: the fixed-width
//! integers and floats, `isize`/`usize` at the platform width, fixed arrays,
//! `Vec` (as a slice) and structs declared with [`native_struct!`]. Bytes
//! are written in native order at native widths, struct fields at their
//! laid-out offsets.
//!
//! [`native_struct!`]: crate::native_struct

mod native;

pub use native::Native;

use crate::error::{FfiError, FfiResult};
use crate::types::{Kind, Type};
use crate::value::{make_slice, Value};

pub(crate) fn incompatible<T: ?Sized>(op: &str, native: &Type) -> FfiError {
    FfiError::Incompatible {
        op: op.to_string(),
        host: std::any::type_name::<T>().to_string(),
        native: native.name().to_string(),
    }
}

/// Whether host shape `T` can be encoded into, or decoded from, `ty`.
pub fn is_compatible<T: Native>(ty: &Type) -> FfiResult<bool> {
    Ok(T::native_type()?.is_compatible(ty))
}

/// Writes host values into one destination value.
pub struct Encoder<'v> {
    dst: &'v Value,
}

impl<'v> Encoder<'v> {
    pub fn new(dst: &'v Value) -> Self {
        Encoder { dst }
    }

    /// # Returns
    /// * `Ok(())` - every leaf of `host` was written
    /// * `Err(FfiError::Incompatible)` - the inferred type does not match
    /// * `Err(FfiError::UnsupportedKind)` - `host` holds text or pointers
    pub fn encode<T: Native>(&self, host: &T) -> FfiResult<()> {
        self.dst.check_valid("Encoder::encode")?;
        if !is_compatible::<T>(self.dst.ty())? {
            return Err(incompatible::<T>("Encoder::encode", self.dst.ty()));
        }
        host.encode_into(self.dst)
    }
}

/// Reads one source value into host values.
pub struct Decoder<'v> {
    src: &'v Value,
}

impl<'v> Decoder<'v> {
    pub fn new(src: &'v Value) -> Self {
        Decoder { src }
    }

    pub fn decode<T: Native>(&self, host: &mut T) -> FfiResult<()> {
        self.src.check_valid("Decoder::decode")?;
        if !is_compatible::<T>(self.src.ty())? {
            return Err(incompatible::<T>("Decoder::decode", self.src.ty()));
        }
        host.decode_from(self.src)
    }
}

/// A fresh value holding an encoded copy of `host`.
pub fn value_of<T: Native>(host: &T) -> FfiResult<Value> {
    let ty = T::native_type()?;
    let v = match host.native_len() {
        Some(len) => make_slice(&ty, len, len)?,
        None => Value::new(&ty),
    };
    host.encode_into(&v)?;
    Ok(v)
}

/// Native type of a struct member, named by a projection closure.
#[doc(hidden)]
pub fn field_type<S, T: Native>(_project: fn(&S) -> &T) -> FfiResult<Type> {
    T::native_type()
}

/// Walks the fields of a struct value in order.
#[doc(hidden)]
pub struct FieldCursor<'v> {
    value: &'v Value,
    next: usize,
}

impl<'v> FieldCursor<'v> {
    pub fn new<S>(value: &'v Value, count: usize) -> FfiResult<Self> {
        if value.kind() != Kind::Struct || value.num_field()? != count {
            return Err(incompatible::<S>("Native struct", value.ty()));
        }
        Ok(FieldCursor { value, next: 0 })
    }

    pub fn next_field(&mut self) -> FfiResult<Value> {
        let field = self.value.field(self.next)?;
        self.next += 1;
        Ok(field)
    }
}
