//! Process-wide type table.
//!
//! Builtin primitives are registered when the table is first touched.
//! Composite types are built on demand, validated against the call engine,
//! and interned by their synthesized name. Descriptors are always built
//! outside the lock; only the insert-if-absent step takes the write lock, so
//! concurrent requests for one name agree on a single winner.

use super::{Field, Kind, Shape, StructField, Type, TypeInner};
use crate::error::{FfiError, FfiResult};
use crate::ffi::abi::{self, Abi, RawType};
use log::{debug, trace};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::mem::size_of;
use std::os::raw::{c_int, c_long, c_short};

/// Largest byte size a type may have. Keeps every allocation layout valid.
pub(crate) const MAX_TYPE_SIZE: usize = (isize::MAX as usize) >> 1;

pub(crate) struct Builtins {
    pub(crate) void: Type,
    pub(crate) uchar: Type,
    pub(crate) char: Type,
    pub(crate) ushort: Type,
    pub(crate) short: Type,
    pub(crate) uint: Type,
    pub(crate) int: Type,
    pub(crate) ulong: Type,
    pub(crate) long: Type,
    pub(crate) uint8: Type,
    pub(crate) int8: Type,
    pub(crate) uint16: Type,
    pub(crate) int16: Type,
    pub(crate) uint32: Type,
    pub(crate) int32: Type,
    pub(crate) uint64: Type,
    pub(crate) int64: Type,
    pub(crate) float: Type,
    pub(crate) double: Type,
    pub(crate) longdouble: Type,
    pub(crate) pointer: Type,
}

impl Builtins {
    fn new() -> Self {
        let void = scalar("void", Kind::Void);
        let pointer = Type::from_inner(TypeInner {
            name: "*".to_string(),
            kind: Kind::Pointer,
            size: size_of::<usize>(),
            align: std::mem::align_of::<usize>(),
            shape: Shape::Pointer { elem: void.clone() },
            raw: RawType::scalar(Kind::Pointer),
        });
        Builtins {
            void,
            uchar: scalar("unsigned char", Kind::Uint8),
            char: scalar("char", Kind::Int8),
            ushort: scalar("unsigned short", Kind::unsigned_of_size(size_of::<c_short>())),
            short: scalar("short", Kind::signed_of_size(size_of::<c_short>())),
            uint: scalar("unsigned int", Kind::unsigned_of_size(size_of::<c_int>())),
            int: scalar("int", Kind::signed_of_size(size_of::<c_int>())),
            ulong: scalar("unsigned long", Kind::unsigned_of_size(size_of::<c_long>())),
            long: scalar("long", Kind::signed_of_size(size_of::<c_long>())),
            uint8: scalar("uint8", Kind::Uint8),
            int8: scalar("int8", Kind::Int8),
            uint16: scalar("uint16", Kind::Uint16),
            int16: scalar("int16", Kind::Int16),
            uint32: scalar("uint32", Kind::Uint32),
            int32: scalar("int32", Kind::Int32),
            uint64: scalar("uint64", Kind::Uint64),
            int64: scalar("int64", Kind::Int64),
            float: scalar("float", Kind::Float),
            double: scalar("double", Kind::Double),
            longdouble: scalar("long double", Kind::LongDouble),
            pointer,
        }
    }

    fn all(&self) -> [&Type; 21] {
        [
            &self.void,
            &self.uchar,
            &self.char,
            &self.ushort,
            &self.short,
            &self.uint,
            &self.int,
            &self.ulong,
            &self.long,
            &self.uint8,
            &self.int8,
            &self.uint16,
            &self.int16,
            &self.uint32,
            &self.int32,
            &self.uint64,
            &self.int64,
            &self.float,
            &self.double,
            &self.longdouble,
            &self.pointer,
        ]
    }
}

fn scalar(name: &str, kind: Kind) -> Type {
    let raw = RawType::scalar(kind);
    // The engine gives void a nominal size of one byte.
    let (size, align) = match kind {
        Kind::Void => (0, 1),
        _ => (raw.size(), raw.align()),
    };
    Type::from_inner(TypeInner {
        name: name.to_string(),
        kind,
        size,
        align,
        shape: Shape::Scalar,
        raw,
    })
}

static BUILTINS: Lazy<Builtins> = Lazy::new(Builtins::new);

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::with_builtins);

pub(crate) fn builtins() -> &'static Builtins {
    &BUILTINS
}

/// The process-wide registry.
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

/// Name-keyed table of canonical type descriptors.
pub struct TypeRegistry {
    types: RwLock<FxHashMap<String, Type>>,
}

impl TypeRegistry {
    fn with_builtins() -> Self {
        let mut types = FxHashMap::default();
        for ty in builtins().all() {
            types.insert(ty.name().to_string(), ty.clone());
        }
        TypeRegistry {
            types: RwLock::new(types),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Type> {
        self.types.read().get(name).cloned()
    }

    /// Number of registered types, builtins included.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Register a struct type laid out sequentially with natural padding.
    ///
    /// Re-registering a name with the same field list returns the existing
    /// descriptor. A different field list, or a name already used by a
    /// non-struct type, is a redefinition error. Names ending in `*`, `[]`
    /// or `[<digits>]` belong to pointer, slice and array types and are
    /// rejected.
    pub fn new_struct_type(&self, name: &str, fields: &[Field]) -> FfiResult<Type> {
        if is_composite_name(name) {
            return Err(FfiError::type_error(format!(
                "struct name '{}' is reserved for composite types",
                name
            )));
        }
        if let Some(existing) = self.lookup(name) {
            trace!("registry hit for struct {}", name);
            return check_redefinition(&existing, name, fields);
        }
        let built = build_struct(name, fields)?;
        let mut types = self.types.write();
        if let Some(existing) = types.get(name) {
            let existing = existing.clone();
            drop(types);
            return check_redefinition(&existing, name, fields);
        }
        debug!(
            "registered struct {} (size {}, align {}, {} fields)",
            name,
            built.size(),
            built.align(),
            fields.len()
        );
        types.insert(name.to_string(), built.clone());
        Ok(built)
    }

    /// Register (or fetch) the array type `elem[len]`.
    ///
    /// A struct with an array member can be laid out and accessed, but it
    /// cannot be passed to or returned from a call by value.
    pub fn new_array_type(&self, len: usize, elem: &Type) -> FfiResult<Type> {
        let name = format!("{}[{}]", elem.name(), len);
        self.intern(name, Kind::Array, elem, Some(len), |name| {
            build_array(name, len, elem)
        })
    }

    /// Register (or fetch) the pointer type `elem*`.
    pub fn new_pointer_type(&self, elem: &Type) -> FfiResult<Type> {
        let name = format!("{}*", elem.name());
        self.intern(name, Kind::Pointer, elem, None, |name| {
            Ok(Type::from_inner(TypeInner {
                name,
                kind: Kind::Pointer,
                size: size_of::<usize>(),
                align: std::mem::align_of::<usize>(),
                shape: Shape::Pointer { elem: elem.clone() },
                raw: RawType::scalar(Kind::Pointer),
            }))
        })
    }

    /// Register (or fetch) the slice type `elem[]`.
    pub fn new_slice_type(&self, elem: &Type) -> FfiResult<Type> {
        let name = format!("{}[]", elem.name());
        self.intern(name, Kind::Slice, elem, None, |name| {
            Ok(Type::from_inner(TypeInner {
                name,
                kind: Kind::Slice,
                size: size_of::<usize>(),
                align: std::mem::align_of::<usize>(),
                shape: Shape::Slice { elem: elem.clone() },
                raw: RawType::scalar(Kind::Pointer),
            }))
        })
    }

    /// Fetch or insert the composite type `name`. An existing entry must
    /// have the same kind, element and length.
    fn intern<F>(
        &self,
        name: String,
        kind: Kind,
        elem: &Type,
        len: Option<usize>,
        build: F,
    ) -> FfiResult<Type>
    where
        F: FnOnce(String) -> FfiResult<Type>,
    {
        if let Some(existing) = self.lookup(&name) {
            trace!("registry hit for {}", name);
            return check_composite(existing, kind, elem, len);
        }
        let built = build(name.clone())?;
        let mut types = self.types.write();
        if let Some(existing) = types.get(&name) {
            let existing = existing.clone();
            drop(types);
            return check_composite(existing, kind, elem, len);
        }
        debug!(
            "registered {} (size {}, align {})",
            name,
            built.size(),
            built.align()
        );
        types.insert(name, built.clone());
        Ok(built)
    }
}

/// Whether `name` has the shape of a synthesized pointer, slice or array
/// name.
fn is_composite_name(name: &str) -> bool {
    if name.ends_with('*') || name.ends_with("[]") {
        return true;
    }
    match name.strip_suffix(']').and_then(|rest| rest.rsplit_once('[')) {
        Some((_, digits)) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn check_composite(
    existing: Type,
    kind: Kind,
    elem: &Type,
    len: Option<usize>,
) -> FfiResult<Type> {
    let same = existing.kind() == kind
        && existing.elem().map_or(false, |e| &e == elem)
        && len.map_or(true, |len| existing.len().map_or(false, |have| have == len));
    if same {
        Ok(existing)
    } else {
        Err(FfiError::type_error(format!(
            "type name '{}' already registered as {:?}",
            existing.name(),
            existing.kind()
        )))
    }
}

fn check_redefinition(existing: &Type, name: &str, fields: &[Field]) -> FfiResult<Type> {
    let same = match existing.fields() {
        Ok(have) => {
            have.len() == fields.len()
                && have
                    .iter()
                    .zip(fields)
                    .all(|(h, f)| h.name == f.name && h.ty == f.ty)
        }
        Err(_) => false,
    };
    if same {
        Ok(existing.clone())
    } else {
        Err(FfiError::type_error(format!(
            "redefinition of type '{}' with a different layout",
            name
        )))
    }
}

fn build_struct(name: &str, fields: &[Field]) -> FfiResult<Type> {
    for field in fields {
        if field.ty.kind() == Kind::Void {
            return Err(FfiError::type_error(format!(
                "struct {}: field '{}' has type void",
                name, field.name
            )));
        }
    }
    let elements: Vec<_> = fields.iter().map(|f| f.ty.raw().as_ptr()).collect();
    let raw = RawType::structure(&elements);
    // Preparing a descriptor that returns the struct lets the engine lay it out.
    abi::prepare(Abi::Default, &raw, &[])?;
    let offsets = abi::struct_offsets(Abi::Default, &raw, fields.len())?;
    let laid_out = fields
        .iter()
        .zip(offsets)
        .map(|(f, offset)| StructField {
            name: f.name.clone(),
            ty: f.ty.clone(),
            offset,
        })
        .collect();
    Ok(Type::from_inner(TypeInner {
        name: name.to_string(),
        kind: Kind::Struct,
        size: raw.size(),
        align: raw.align(),
        shape: Shape::Struct { fields: laid_out },
        raw,
    }))
}

fn build_array(name: String, len: usize, elem: &Type) -> FfiResult<Type> {
    if elem.kind() == Kind::Void {
        return Err(FfiError::type_error(format!("{}: array of void", name)));
    }
    let size = len
        .checked_mul(elem.size())
        .filter(|size| *size <= MAX_TYPE_SIZE)
        .ok_or_else(|| FfiError::type_error(format!("{}: array too large", name)))?;
    let align = std::mem::align_of::<usize>();
    let raw = RawType::custom_pointer(size, align);
    abi::prepare(Abi::Default, &raw, &[])?;
    Ok(Type::from_inner(TypeInner {
        name,
        kind: Kind::Array,
        size,
        align,
        shape: Shape::Array {
            len,
            elem: elem.clone(),
        },
        raw,
    }))
}

/// Look a type up by name in the global registry.
pub fn type_by_name(name: &str) -> Option<Type> {
    registry().lookup(name)
}

pub fn new_struct_type(name: &str, fields: &[Field]) -> FfiResult<Type> {
    registry().new_struct_type(name, fields)
}

pub fn new_array_type(len: usize, elem: &Type) -> FfiResult<Type> {
    registry().new_array_type(len, elem)
}

pub fn new_pointer_type(elem: &Type) -> FfiResult<Type> {
    registry().new_pointer_type(elem)
}

pub fn new_slice_type(elem: &Type) -> FfiResult<Type> {
    registry().new_slice_type(elem)
}

/// Pointer type to `ty`.
pub fn ptr_to(ty: &Type) -> FfiResult<Type> {
    new_pointer_type(ty)
}
