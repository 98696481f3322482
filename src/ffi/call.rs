//! Call interfaces and bound functions.

use crate::error::{FfiError, FfiResult};
use crate::ffi::abi::{self, Abi, CallDescriptor, RawType};
use crate::ffi::loader::Handle;
use crate::ffi::marshal::{Arg, MarshalledArg};
use crate::types::{Kind, Type};
use crate::value::{Buffer, Value};
use libffi::raw::ffi_arg;
use log::{debug, trace};
use smallvec::SmallVec;
use std::ffi::c_void;
use std::fmt;
use std::mem::{align_of, size_of};
use std::rc::Rc;
use std::sync::Arc;

/// A prepared, reusable call interface for one signature.
pub struct Cif {
    abi: Abi,
    ret: Type,
    args: Vec<Type>,
    desc: CallDescriptor,
}

impl Cif {
    /// Prepare `ret(args...)` under `abi`.
    ///
    /// Array parameters decay to pointers. Arrays cannot be returned and
    /// `void` cannot be a parameter. Structs holding an array member, at any
    /// depth, cannot cross the call boundary by value; pass a pointer to
    /// them instead.
    pub fn new(abi: Abi, ret: &Type, args: &[Type]) -> FfiResult<Cif> {
        if ret.kind() == Kind::Array {
            return Err(FfiError::type_error(format!(
                "function cannot return array type {}",
                ret.name()
            )));
        }
        if let Some(void) = args.iter().position(|t| t.kind() == Kind::Void) {
            return Err(FfiError::type_error(format!(
                "parameter {} has type void",
                void
            )));
        }
        for ty in std::iter::once(ret).chain(args) {
            if has_array_member(ty) {
                return Err(FfiError::type_error(format!(
                    "struct {} with array members cannot be passed by value",
                    ty.name()
                )));
            }
        }
        let decayed = RawType::scalar(Kind::Pointer);
        let raw_args: SmallVec<[&RawType; 8]> = args
            .iter()
            .map(|t| match t.kind() {
                Kind::Array => &decayed,
                _ => t.raw(),
            })
            .collect();
        let desc = abi::prepare(abi, ret.raw(), &raw_args)?;
        Ok(Cif {
            abi,
            ret: ret.clone(),
            args: args.to_vec(),
            desc,
        })
    }

    pub fn abi(&self) -> Abi {
        self.abi
    }

    pub fn ret(&self) -> &Type {
        &self.ret
    }

    pub fn args(&self) -> &[Type] {
        &self.args
    }

    pub fn nargs(&self) -> usize {
        self.desc.nargs()
    }

    /// Call the function at `code` and wrap its result in a value of the
    /// return type.
    ///
    /// # Returns
    /// * `Ok(result)` - the native call completed
    /// * `Err(FfiError::ArgumentCount)` - nothing was called
    /// * `Err(FfiError::Argument)` - an argument could not be marshaled;
    ///   nothing was called
    ///
    /// # Safety
    /// `code` must be a function whose native signature matches this
    /// interface, and pointer arguments must be valid for what it does
    /// with them.
    pub unsafe fn call(&self, code: *const c_void, args: &[Arg<'_>]) -> FfiResult<Value> {
        if args.len() != self.args.len() {
            return Err(FfiError::ArgumentCount {
                expected: self.args.len(),
                got: args.len(),
            });
        }
        let marshalled: SmallVec<[MarshalledArg; 8]> = args
            .iter()
            .zip(&self.args)
            .enumerate()
            .map(|(i, (arg, ty))| MarshalledArg::new(i, arg, ty))
            .collect::<FfiResult<_>>()?;
        let mut pointers: SmallVec<[*mut c_void; 8]> =
            marshalled.iter().map(|m| m.as_ptr()).collect();

        // The engine widens small integer results to a full ffi_arg.
        let size = self.ret.size().max(size_of::<ffi_arg>());
        let align = self.ret.align().max(align_of::<ffi_arg>());
        let result = Rc::new(Buffer::zeroed(size, align));
        let offset = if cfg!(target_endian = "big")
            && self.ret.kind().is_integer()
            && self.ret.size() < size_of::<ffi_arg>()
        {
            size_of::<ffi_arg>() - self.ret.size()
        } else {
            0
        };

        trace!("invoking {:p} with {} args", code, args.len());
        self.desc
            .invoke(code, pointers.as_mut_ptr(), result.as_ptr() as *mut c_void);
        drop(marshalled);
        Ok(Value::from_buffer(self.ret.clone(), result, offset))
    }
}

impl fmt::Debug for Cif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self.args.iter().map(|t| t.name()).collect();
        write!(f, "Cif({:?}, {}({}))", self.abi, self.ret.name(), args.join(", "))
    }
}

/// A library function bound to a prepared call interface.
///
/// Holding a `Function` keeps its library loaded.
pub struct Function {
    name: String,
    addr: usize,
    cif: Cif,
    _library: Arc<Handle>,
}

impl Function {
    pub(crate) fn bind(
        name: &str,
        library: Arc<Handle>,
        addr: *mut c_void,
        ret: &Type,
        args: &[Type],
    ) -> FfiResult<Function> {
        let cif = Cif::new(Abi::Default, ret, args)?;
        debug!("bound {} as {:?}", name, cif);
        Ok(Function {
            name: name.to_string(),
            addr: addr as usize,
            cif,
            _library: library,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> *const c_void {
        self.addr as *const c_void
    }

    pub fn cif(&self) -> &Cif {
        &self.cif
    }

    /// Call with `args`, one per declared parameter.
    ///
    /// # Example
    /// ```ignore
    /// let cos = unsafe { libm.function("cos", &c::double(), &[c::double()])? };
    /// let one = cos.call(&[0.0f64.into()])?.float()?;
    /// ```
    pub fn call(&self, args: &[Arg<'_>]) -> FfiResult<Value> {
        trace!("calling {} with {} args", self.name, args.len());
        // The signature was vouched for when the function was bound.
        unsafe { self.cif.call(self.addr(), args) }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("cif", &self.cif)
            .finish()
    }
}

/// Whether a by-value struct embeds an array. The engine has no array
/// descriptor, so such a struct would be classified wrongly.
fn has_array_member(ty: &Type) -> bool {
    match ty.fields() {
        Ok(fields) => fields
            .iter()
            .any(|f| f.ty.kind() == Kind::Array || has_array_member(&f.ty)),
        Err(_) => false,
    }
}
