//! Run-time descriptions of C types.
//!
//! A [`Type`] is an immutable, shareable descriptor: its name, [`Kind`],
//! size, alignment, element or field information, and the engine-level
//! `ffi_type` used when the type crosses a call boundary. Types are created
//! through the process-wide [`TypeRegistry`] and compared by identity; the
//! registry guarantees that a given name always maps to the same descriptor.

mod registry;

pub use registry::{
    new_array_type, new_pointer_type, new_slice_type, new_struct_type, ptr_to, registry,
    type_by_name, TypeRegistry,
};
pub(crate) use registry::MAX_TYPE_SIZE;

use crate::error::{FfiError, FfiResult};
use crate::ffi::abi::RawType;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Classification of a [`Type`].
///
/// C names such as `int` or `long` have no kind of their own; they resolve to
/// the fixed-width kind matching the platform's width for that C type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Void,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    LongDouble,
    Pointer,
    Array,
    Struct,
    Slice,
}

impl Kind {
    pub fn is_signed(self) -> bool {
        matches!(self, Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float | Kind::Double | Kind::LongDouble)
    }

    /// Kinds whose storage is a single machine pointer.
    pub fn is_pointer_like(self) -> bool {
        matches!(self, Kind::Pointer | Kind::Slice)
    }

    pub(crate) fn signed_of_size(size: usize) -> Kind {
        match size {
            1 => Kind::Int8,
            2 => Kind::Int16,
            4 => Kind::Int32,
            _ => Kind::Int64,
        }
    }

    pub(crate) fn unsigned_of_size(size: usize) -> Kind {
        match size {
            1 => Kind::Uint8,
            2 => Kind::Uint16,
            4 => Kind::Uint32,
            _ => Kind::Uint64,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Void => "Void",
            Kind::Int8 => "Int8",
            Kind::Int16 => "Int16",
            Kind::Int32 => "Int32",
            Kind::Int64 => "Int64",
            Kind::Uint8 => "Uint8",
            Kind::Uint16 => "Uint16",
            Kind::Uint32 => "Uint32",
            Kind::Uint64 => "Uint64",
            Kind::Float => "Float",
            Kind::Double => "Double",
            Kind::LongDouble => "LongDouble",
            Kind::Pointer => "Pointer",
            Kind::Array => "Array",
            Kind::Struct => "Struct",
            Kind::Slice => "Slice",
        };
        f.write_str(name)
    }
}

/// Requested member of a struct, before layout.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: &Type) -> Self {
        Field {
            name: name.into(),
            ty: ty.clone(),
        }
    }
}

/// Laid-out member of a struct type.
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    /// Byte offset from the start of the struct.
    pub offset: usize,
}

#[derive(Debug)]
pub(crate) enum Shape {
    Scalar,
    Pointer { elem: Type },
    Array { len: usize, elem: Type },
    Slice { elem: Type },
    Struct { fields: Vec<StructField> },
}

pub(crate) struct TypeInner {
    pub(crate) name: String,
    pub(crate) kind: Kind,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) shape: Shape,
    pub(crate) raw: RawType,
}

/// Immutable descriptor of a C type.
///
/// Cloning is cheap. Two `Type`s are equal only if they are the same
/// registered descriptor.
#[derive(Clone)]
pub struct Type(Arc<TypeInner>);

impl Type {
    pub(crate) fn from_inner(inner: TypeInner) -> Self {
        Type(Arc::new(inner))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> Kind {
        self.0.kind
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.0.size
    }

    /// Alignment in bytes.
    pub fn align(&self) -> usize {
        self.0.align
    }

    /// Number of elements of an array type.
    pub fn len(&self) -> FfiResult<usize> {
        match &self.0.shape {
            Shape::Array { len, .. } => Ok(*len),
            _ => Err(FfiError::kind("Type::len", self.kind())),
        }
    }

    /// Element type of an array, pointer or slice type.
    pub fn elem(&self) -> FfiResult<Type> {
        match &self.0.shape {
            Shape::Pointer { elem } | Shape::Array { elem, .. } | Shape::Slice { elem } => {
                Ok(elem.clone())
            }
            _ => Err(FfiError::kind("Type::elem", self.kind())),
        }
    }

    pub fn fields(&self) -> FfiResult<&[StructField]> {
        match &self.0.shape {
            Shape::Struct { fields } => Ok(fields),
            _ => Err(FfiError::kind("Type::fields", self.kind())),
        }
    }

    pub fn num_field(&self) -> FfiResult<usize> {
        self.fields().map(|fields| fields.len())
    }

    /// The i-th field of a struct type.
    pub fn field(&self, i: usize) -> FfiResult<&StructField> {
        let fields = self.fields()?;
        fields
            .get(i)
            .ok_or_else(|| FfiError::index("Type::field", i, fields.len()))
    }

    /// Position of the field called `name`, or `None` when absent or when
    /// this is not a struct type.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        match &self.0.shape {
            Shape::Struct { fields } => fields.iter().position(|f| f.name == name),
            _ => None,
        }
    }

    /// Layout compatibility: same kind, and for composites, pairwise
    /// compatible elements or fields.
    pub fn is_compatible(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        if self.kind() != other.kind() {
            return false;
        }
        match (&self.0.shape, &other.0.shape) {
            (Shape::Array { len: n, elem: a }, Shape::Array { len: m, elem: b }) => {
                n == m && a.is_compatible(b)
            }
            (Shape::Pointer { elem: a }, Shape::Pointer { elem: b })
            | (Shape::Slice { elem: a }, Shape::Slice { elem: b }) => a.is_compatible(b),
            (Shape::Struct { fields: a }, Shape::Struct { fields: b }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ty.is_compatible(&y.ty))
            }
            _ => self.size() == other.size(),
        }
    }

    pub(crate) fn raw(&self) -> &RawType {
        &self.0.raw
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builtin C types.
pub mod c {
    use super::registry::builtins;
    use super::Type;

    macro_rules! builtin {
        ($($(#[$meta:meta])* $fn_name:ident => $field:ident),* $(,)?) => {
            $(
                $(#[$meta])*
                pub fn $fn_name() -> Type {
                    builtins().$field.clone()
                }
            )*
        };
    }

    builtin! {
        void => void,
        /// `unsigned char`
        uchar => uchar,
        char => char,
        /// `unsigned short`
        ushort => ushort,
        short => short,
        /// `unsigned int`
        uint => uint,
        int => int,
        /// `unsigned long`
        ulong => ulong,
        long => long,
        uint8 => uint8,
        int8 => int8,
        uint16 => uint16,
        int16 => int16,
        uint32 => uint32,
        int32 => int32,
        uint64 => uint64,
        int64 => int64,
        float => float,
        double => double,
        /// `long double`
        longdouble => longdouble,
        /// Untyped pointer, named `*`.
        pointer => pointer,
    }
}
