//! Host shapes that map onto native types.

use super::incompatible;
use crate::error::{FfiError, FfiResult};
use crate::platform::NATIVE_INT_SIZE;
use crate::types::{c, new_array_type, new_slice_type, Kind, Type};
use crate::value::Value;
use std::io::{Read, Write};

/// A host type with a fixed native representation.
///
/// `native_type` is inferred from the host shape alone. `encode_into` and
/// `decode_from` move data between `self` and a value whose type is
/// compatible with that shape; each level checks only what it needs (kind,
/// element or field count), leaves check their own kind.
pub trait Native {
    fn native_type() -> FfiResult<Type>;

    fn encode_into(&self, dst: &Value) -> FfiResult<()>;

    fn decode_from(&mut self, src: &Value) -> FfiResult<()>;

    /// Element count for host shapes whose native form is a slice.
    fn native_len(&self) -> Option<usize> {
        None
    }
}

fn leaf_check<T>(v: &Value, ty: &Type) -> FfiResult<()> {
    if v.kind() == ty.kind() && v.ty().size() == ty.size() {
        Ok(())
    } else {
        Err(incompatible::<T>("Native leaf", v.ty()))
    }
}

fn io_failure<T>(v: &Value) -> FfiError {
    incompatible::<T>("Native leaf", v.ty())
}

fn default_int() -> Type {
    match Kind::signed_of_size(NATIVE_INT_SIZE) {
        Kind::Int32 => c::int32(),
        _ => c::int64(),
    }
}

fn default_uint() -> Type {
    match Kind::unsigned_of_size(NATIVE_INT_SIZE) {
        Kind::Uint32 => c::uint32(),
        _ => c::uint64(),
    }
}

macro_rules! native_scalar {
    ($($t:ty => $ctype:expr;)*) => {
        $(
            impl Native for $t {
                fn native_type() -> FfiResult<Type> {
                    Ok($ctype)
                }

                fn encode_into(&self, dst: &Value) -> FfiResult<()> {
                    leaf_check::<$t>(dst, &$ctype)?;
                    dst.writer()?
                        .write_all(&self.to_ne_bytes())
                        .map_err(|_| io_failure::<$t>(dst))
                }

                fn decode_from(&mut self, src: &Value) -> FfiResult<()> {
                    leaf_check::<$t>(src, &$ctype)?;
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    src.reader()?
                        .read_exact(&mut buf)
                        .map_err(|_| io_failure::<$t>(src))?;
                    *self = <$t>::from_ne_bytes(buf);
                    Ok(())
                }
            }
        )*
    };
}

native_scalar! {
    i8 => c::int8();
    i16 => c::int16();
    i32 => c::int32();
    i64 => c::int64();
    u8 => c::uint8();
    u16 => c::uint16();
    u32 => c::uint32();
    u64 => c::uint64();
    f32 => c::float();
    f64 => c::double();
    isize => default_int();
    usize => default_uint();
}

impl<T: Native, const N: usize> Native for [T; N] {
    fn native_type() -> FfiResult<Type> {
        new_array_type(N, &T::native_type()?)
    }

    fn encode_into(&self, dst: &Value) -> FfiResult<()> {
        if dst.kind() != Kind::Array || dst.len()? != N {
            return Err(incompatible::<Self>("Native array", dst.ty()));
        }
        for (i, item) in self.iter().enumerate() {
            item.encode_into(&dst.index(i)?)?;
        }
        Ok(())
    }

    fn decode_from(&mut self, src: &Value) -> FfiResult<()> {
        if src.kind() != Kind::Array || src.len()? != N {
            return Err(incompatible::<Self>("Native array", src.ty()));
        }
        for (i, item) in self.iter_mut().enumerate() {
            item.decode_from(&src.index(i)?)?;
        }
        Ok(())
    }
}

impl<T: Native + Default> Native for Vec<T> {
    fn native_type() -> FfiResult<Type> {
        new_slice_type(&T::native_type()?)
    }

    /// The destination slice must have exactly as many elements.
    fn encode_into(&self, dst: &Value) -> FfiResult<()> {
        if dst.kind() != Kind::Slice {
            return Err(incompatible::<Self>("Native slice", dst.ty()));
        }
        let len = dst.len()?;
        if len != self.len() {
            return Err(FfiError::index("Native slice", self.len(), len));
        }
        for (i, item) in self.iter().enumerate() {
            item.encode_into(&dst.index(i)?)?;
        }
        Ok(())
    }

    fn decode_from(&mut self, src: &Value) -> FfiResult<()> {
        if src.kind() != Kind::Slice {
            return Err(incompatible::<Self>("Native slice", src.ty()));
        }
        let len = src.len()?;
        self.clear();
        self.reserve(len);
        for i in 0..len {
            let mut item = T::default();
            item.decode_from(&src.index(i)?)?;
            self.push(item);
        }
        Ok(())
    }

    fn native_len(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Native for String {
    fn native_type() -> FfiResult<Type> {
        Err(FfiError::unsupported("native_type", "string"))
    }

    fn encode_into(&self, _dst: &Value) -> FfiResult<()> {
        Err(FfiError::unsupported("encode", "string"))
    }

    fn decode_from(&mut self, _src: &Value) -> FfiResult<()> {
        Err(FfiError::unsupported("decode", "string"))
    }
}

impl<T: Native> Native for Box<T> {
    fn native_type() -> FfiResult<Type> {
        Err(FfiError::unsupported("native_type", "pointer"))
    }

    fn encode_into(&self, _dst: &Value) -> FfiResult<()> {
        Err(FfiError::unsupported("encode", "pointer"))
    }

    fn decode_from(&mut self, _src: &Value) -> FfiResult<()> {
        Err(FfiError::unsupported("decode", "pointer"))
    }
}

/// Implement [`Native`] for a plain struct, field by field in declaration
/// order. The native struct type is registered under the Rust type's name.
///
/// ```ignore
/// struct Point { x: i32, y: f64 }
/// dynffi::native_struct!(Point { x, y });
/// ```
///
/// [`Native`]: crate::codec::Native
#[macro_export]
macro_rules! native_struct {
    ($name:ident { $($field:ident),+ $(,)? }) => {
        impl $crate::codec::Native for $name {
            fn native_type() -> $crate::FfiResult<$crate::types::Type> {
                $crate::types::new_struct_type(
                    stringify!($name),
                    &[$(
                        $crate::types::Field::new(
                            stringify!($field),
                            &$crate::codec::field_type(|s: &$name| &s.$field)?,
                        ),
                    )+],
                )
            }

            fn encode_into(&self, dst: &$crate::value::Value) -> $crate::FfiResult<()> {
                let count = [$(stringify!($field)),+].len();
                let mut fields = $crate::codec::FieldCursor::new::<Self>(dst, count)?;
                $(
                    $crate::codec::Native::encode_into(&self.$field, &fields.next_field()?)?;
                )+
                Ok(())
            }

            fn decode_from(&mut self, src: &$crate::value::Value) -> $crate::FfiResult<()> {
                let count = [$(stringify!($field)),+].len();
                let mut fields = $crate::codec::FieldCursor::new::<Self>(src, count)?;
                $(
                    $crate::codec::Native::decode_from(&mut self.$field, &fields.next_field()?)?;
                )+
                Ok(())
            }
        }
    };
}
