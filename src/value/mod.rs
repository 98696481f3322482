//! Typed views over native memory.
//!
//! A [`Value`] pairs a [`Type`] with the address of one instance of it.
//! Owning values hold their storage in a reference-counted [`Buffer`];
//! values derived by navigation (fields, elements, pointees, slices) alias
//! the same storage and keep it alive. Cloning a `Value` yields another
//! handle on the same bytes, never a copy.
//!
//! Slices are a pointer-sized cell holding the data address plus an
//! out-of-band length and capacity. Growing a slice past its capacity
//! allocates a new backing array; views of the old one keep the old array
//! alive but no longer observe writes made through the grown slice.

mod accessors;
mod buffer;
mod io;
mod slice;

pub use io::{ValueReader, ValueWriter};
pub use slice::{grow_slice, make_slice};

pub(crate) use buffer::Buffer;

use crate::error::{FfiError, FfiResult};
use crate::types::{new_pointer_type, Kind, Type};
use std::ffi::c_void;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SliceHeader {
    len: usize,
    cap: usize,
}

/// A typed handle on native memory.
#[derive(Clone)]
pub struct Value {
    ty: Type,
    ptr: *mut u8,
    // Keeps the bytes at `ptr` alive; `None` for foreign memory.
    owner: Option<Rc<Buffer>>,
    // Keeps alive the memory a pointer or slice value refers to.
    target: Option<Rc<Buffer>>,
    header: Option<SliceHeader>,
}

impl Value {
    /// Allocate a zero-filled instance of `ty`.
    pub fn new(ty: &Type) -> Value {
        let buf = Rc::new(Buffer::zeroed(ty.size(), ty.align()));
        let header = match ty.kind() {
            Kind::Slice => Some(SliceHeader { len: 0, cap: 0 }),
            _ => None,
        };
        Value {
            ty: ty.clone(),
            ptr: buf.as_ptr(),
            owner: Some(buf),
            target: None,
            header,
        }
    }

    /// View foreign memory at `ptr` as an instance of `ty`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `ty.size()` bytes for as
    /// long as the returned value, or anything derived from it, is used.
    pub unsafe fn new_at(ty: &Type, ptr: *mut c_void) -> Value {
        Value {
            ty: ty.clone(),
            ptr: ptr as *mut u8,
            owner: None,
            target: None,
            header: None,
        }
    }

    /// The zero value of `ty`: a handle with no storage.
    pub(crate) fn invalid(ty: Type) -> Value {
        Value {
            ty,
            ptr: std::ptr::null_mut(),
            owner: None,
            target: None,
            header: None,
        }
    }

    pub(crate) fn from_buffer(ty: Type, owner: Rc<Buffer>, offset: usize) -> Value {
        Value {
            ty,
            ptr: owner.as_ptr().wrapping_add(offset),
            owner: Some(owner),
            target: None,
            header: None,
        }
    }

    /// Alias of this value's storage at `offset`, typed as `ty`.
    fn derive(&self, ty: Type, offset: usize) -> Value {
        Value {
            ty,
            ptr: self.ptr.wrapping_add(offset),
            owner: self.owner.clone(),
            target: None,
            header: None,
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    /// False only for the zero value, e.g. the pointee of a nil pointer.
    pub fn is_valid(&self) -> bool {
        !self.ptr.is_null()
    }

    /// Whether [`Value::addr`] can succeed.
    pub fn can_addr(&self) -> bool {
        self.is_valid()
    }

    /// Address of this value's storage.
    pub fn unsafe_addr(&self) -> FfiResult<usize> {
        self.check_valid("Value::unsafe_addr")?;
        Ok(self.ptr as usize)
    }

    /// Raw address of the storage; null for the zero value.
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr as *mut c_void
    }

    pub(crate) fn check_valid(&self, op: &str) -> FfiResult<()> {
        if self.ptr.is_null() {
            Err(FfiError::invalid(op))
        } else {
            Ok(())
        }
    }

    fn expect_kind(&self, op: &str, kind: Kind) -> FfiResult<()> {
        self.check_valid(op)?;
        if self.kind() == kind {
            Ok(())
        } else {
            Err(FfiError::kind(op, self.kind()))
        }
    }

    /// Contents of a pointer-sized cell.
    pub(crate) fn read_cell(&self) -> *mut u8 {
        unsafe { (self.ptr as *const *mut u8).read_unaligned() }
    }

    /// A pointer-typed value holding this value's address.
    pub fn addr(&self) -> FfiResult<Value> {
        self.check_valid("Value::addr")?;
        let ty = new_pointer_type(&self.ty)?;
        let cell = Rc::new(Buffer::zeroed(ty.size(), ty.align()));
        unsafe { (cell.as_ptr() as *mut *mut u8).write(self.ptr) };
        Ok(Value {
            ty,
            ptr: cell.as_ptr(),
            owner: Some(cell),
            target: self.owner.clone(),
            header: None,
        })
    }

    /// Dereference a pointer value. A nil pointer yields the zero value of
    /// the pointee type.
    ///
    /// # Safety
    /// A non-nil pointer must address a live instance of the pointee type.
    /// This holds for pointers produced by [`Value::addr`] and for values
    /// returned by native code that honors its signature.
    pub unsafe fn elem(&self) -> FfiResult<Value> {
        self.expect_kind("Value::elem", Kind::Pointer)?;
        let elem = self.ty.elem()?;
        let p = self.read_cell();
        if p.is_null() {
            return Ok(Value::invalid(elem));
        }
        Ok(Value {
            ty: elem,
            ptr: p,
            owner: self.target.clone(),
            target: None,
            header: None,
        })
    }

    /// Dereference pointers; any other value is returned as is.
    ///
    /// # Safety
    /// As for [`Value::elem`].
    pub unsafe fn indirect(&self) -> FfiResult<Value> {
        match self.kind() {
            Kind::Pointer => self.elem(),
            _ => Ok(self.clone()),
        }
    }

    /// Whether a pointer or slice value holds the null address.
    pub fn is_nil(&self) -> FfiResult<bool> {
        self.check_valid("Value::is_nil")?;
        if self.kind().is_pointer_like() {
            Ok(self.read_cell().is_null())
        } else {
            Err(FfiError::kind("Value::is_nil", self.kind()))
        }
    }

    pub fn num_field(&self) -> FfiResult<usize> {
        self.expect_kind("Value::num_field", Kind::Struct)?;
        self.ty.num_field()
    }

    /// The i-th field of a struct value.
    pub fn field(&self, i: usize) -> FfiResult<Value> {
        self.expect_kind("Value::field", Kind::Struct)?;
        let field = self.ty.field(i).map_err(|_| {
            FfiError::index("Value::field", i, self.ty.num_field().unwrap_or_default())
        })?;
        Ok(self.derive(field.ty.clone(), field.offset))
    }

    pub fn field_by_name(&self, name: &str) -> FfiResult<Value> {
        self.expect_kind("Value::field_by_name", Kind::Struct)?;
        match self.ty.field_index(name) {
            Some(i) => self.field(i),
            None => Err(FfiError::NoSuchField {
                ty: self.ty.name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Follow a path of field indices through nested structs.
    pub fn field_by_index(&self, path: &[usize]) -> FfiResult<Value> {
        path.iter().try_fold(self.clone(), |v, &i| v.field(i))
    }

    /// The i-th element of an array or slice.
    pub fn index(&self, i: usize) -> FfiResult<Value> {
        self.check_valid("Value::index")?;
        match self.kind() {
            Kind::Array => {
                let len = self.ty.len()?;
                if i >= len {
                    return Err(FfiError::index("Value::index", i, len));
                }
                let elem = self.ty.elem()?;
                let offset = i * elem.size();
                Ok(self.derive(elem, offset))
            }
            Kind::Slice => {
                let len = self.len()?;
                if i >= len {
                    return Err(FfiError::index("Value::index", i, len));
                }
                let elem = self.ty.elem()?;
                let ptr = self.read_cell().wrapping_add(i * elem.size());
                Ok(Value {
                    ty: elem,
                    ptr,
                    owner: self.target.clone(),
                    target: None,
                    header: None,
                })
            }
            kind => Err(FfiError::kind("Value::index", kind)),
        }
    }

    /// Element count of an array or slice.
    ///
    /// Slices reached by navigation (a slice-typed struct field, say) carry
    /// no length and report zero.
    pub fn len(&self) -> FfiResult<usize> {
        self.check_valid("Value::len")?;
        match self.kind() {
            Kind::Array => self.ty.len(),
            Kind::Slice => Ok(self.header.map_or(0, |h| h.len)),
            kind => Err(FfiError::kind("Value::len", kind)),
        }
    }

    pub fn is_empty(&self) -> FfiResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Capacity of a slice; equal to the length for arrays.
    pub fn cap(&self) -> FfiResult<usize> {
        self.check_valid("Value::cap")?;
        match self.kind() {
            Kind::Array => self.ty.len(),
            Kind::Slice => Ok(self.header.map_or(0, |h| h.cap)),
            kind => Err(FfiError::kind("Value::cap", kind)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("ty", &self.ty.name())
            .field("ptr", &self.ptr)
            .finish()
    }
}
