//! Bridge to the libffi call engine.
//!
//! Owns the engine-level `ffi_type` descriptors behind each [`Type`] and the
//! prepared `ffi_cif` behind each call interface. Everything here works on
//! raw engine structures; the safe surface lives in `types` and `ffi::call`.
//!
//! [`Type`]: crate::types::Type

use crate::error::{FfiError, FfiResult, Status};
use crate::types::Kind;
use libffi::middle::CodePtr;
use libffi::raw;
use log::debug;
use std::ffi::c_void;
use std::fmt;
use std::os::raw::c_uint;
use std::ptr::{self, addr_of_mut};

/// Calling convention selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Abi {
    /// The platform's default convention.
    #[default]
    Default,
    /// An explicit engine ABI number.
    Raw(u32),
}

impl Abi {
    fn as_raw(self) -> raw::ffi_abi {
        match self {
            Abi::Default => raw::ffi_abi_FFI_DEFAULT_ABI,
            Abi::Raw(n) => n as raw::ffi_abi,
        }
    }
}

fn status_of(code: raw::ffi_status) -> Status {
    if code == raw::ffi_status_FFI_OK {
        Status::Ok
    } else if code == raw::ffi_status_FFI_BAD_ABI {
        Status::BadAbi
    } else {
        Status::BadTypedef
    }
}

/// Engine descriptor for one type: either one of libffi's static scalar
/// descriptors or a heap-allocated one this crate owns.
pub(crate) struct RawType {
    ptr: *mut raw::ffi_type,
    owned: bool,
    // Null-terminated; `(*ptr).elements` points into it.
    _elements: Option<Box<[*mut raw::ffi_type]>>,
}

// Descriptors are never mutated once their owning `Type` is published.
unsafe impl Send for RawType {}
unsafe impl Sync for RawType {}

impl RawType {
    /// Static descriptor for a scalar kind. Composite kinds get the pointer
    /// descriptor.
    pub(crate) fn scalar(kind: Kind) -> RawType {
        let ptr = match kind {
            Kind::Void => addr_of_mut!(raw::ffi_type_void),
            Kind::Int8 => addr_of_mut!(raw::ffi_type_sint8),
            Kind::Int16 => addr_of_mut!(raw::ffi_type_sint16),
            Kind::Int32 => addr_of_mut!(raw::ffi_type_sint32),
            Kind::Int64 => addr_of_mut!(raw::ffi_type_sint64),
            Kind::Uint8 => addr_of_mut!(raw::ffi_type_uint8),
            Kind::Uint16 => addr_of_mut!(raw::ffi_type_uint16),
            Kind::Uint32 => addr_of_mut!(raw::ffi_type_uint32),
            Kind::Uint64 => addr_of_mut!(raw::ffi_type_uint64),
            Kind::Float => addr_of_mut!(raw::ffi_type_float),
            Kind::Double => addr_of_mut!(raw::ffi_type_double),
            #[cfg(not(target_arch = "arm"))]
            Kind::LongDouble => addr_of_mut!(raw::ffi_type_longdouble),
            #[cfg(target_arch = "arm")]
            Kind::LongDouble => addr_of_mut!(raw::ffi_type_double),
            Kind::Pointer | Kind::Array | Kind::Slice | Kind::Struct => {
                addr_of_mut!(raw::ffi_type_pointer)
            }
        };
        RawType {
            ptr,
            owned: false,
            _elements: None,
        }
    }

    /// Pointer-class descriptor with an explicit size, used for fixed arrays.
    /// Arrays travel as pointers at the call boundary.
    pub(crate) fn custom_pointer(size: usize, align: usize) -> RawType {
        let desc = raw::ffi_type {
            size,
            alignment: align as u16,
            type_: raw::FFI_TYPE_POINTER as u16,
            elements: ptr::null_mut(),
        };
        RawType {
            ptr: Box::into_raw(Box::new(desc)),
            owned: true,
            _elements: None,
        }
    }

    /// Unlaid-out struct descriptor. Size and alignment are zero until the
    /// engine initializes the aggregate during preparation.
    pub(crate) fn structure(fields: &[*mut raw::ffi_type]) -> RawType {
        let mut elements: Box<[*mut raw::ffi_type]> = fields
            .iter()
            .copied()
            .chain(std::iter::once(ptr::null_mut()))
            .collect();
        let desc = raw::ffi_type {
            size: 0,
            alignment: 0,
            type_: raw::FFI_TYPE_STRUCT as u16,
            elements: elements.as_mut_ptr(),
        };
        RawType {
            ptr: Box::into_raw(Box::new(desc)),
            owned: true,
            _elements: Some(elements),
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut raw::ffi_type {
        self.ptr
    }

    pub(crate) fn size(&self) -> usize {
        unsafe { (*self.ptr).size }
    }

    pub(crate) fn align(&self) -> usize {
        unsafe { (*self.ptr).alignment as usize }
    }
}

impl Drop for RawType {
    fn drop(&mut self) {
        if self.owned {
            unsafe { drop(Box::from_raw(self.ptr)) };
        }
    }
}

/// A prepared `ffi_cif` and the argument-type array it points into.
///
/// The `RawType`s it references must outlive it; callers keep the owning
/// `Type`s alongside.
pub(crate) struct CallDescriptor {
    cif: Box<raw::ffi_cif>,
    _arg_types: Box<[*mut raw::ffi_type]>,
}

impl fmt::Debug for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("abi", &self.cif.abi)
            .field("nargs", &self.nargs())
            .field("bytes", &self.cif.bytes)
            .finish()
    }
}

// The engine only reads a prepared cif during calls.
unsafe impl Send for CallDescriptor {}
unsafe impl Sync for CallDescriptor {}

/// Prepare a call descriptor for `ret(args...)`.
///
/// # Returns
/// * `Ok(descriptor)` - Engine accepted the signature
/// * `Err(FfiError::Type)` - Engine status was `BadTypedef` or `BadAbi`
pub(crate) fn prepare(abi: Abi, ret: &RawType, args: &[&RawType]) -> FfiResult<CallDescriptor> {
    let mut arg_types: Box<[*mut raw::ffi_type]> = args.iter().map(|a| a.as_ptr()).collect();
    let arg_ptr = if arg_types.is_empty() {
        ptr::null_mut()
    } else {
        arg_types.as_mut_ptr()
    };
    let mut cif: Box<raw::ffi_cif> = Box::new(unsafe { std::mem::zeroed() });
    let code = unsafe {
        raw::ffi_prep_cif(
            &mut *cif,
            abi.as_raw(),
            arg_types.len() as c_uint,
            ret.as_ptr(),
            arg_ptr,
        )
    };
    match status_of(code) {
        Status::Ok => {
            debug!(
                "prepared cif: {} args, return size {}",
                arg_types.len(),
                ret.size()
            );
            Ok(CallDescriptor {
                cif,
                _arg_types: arg_types,
            })
        }
        status => Err(FfiError::engine("error while preparing cif", status)),
    }
}

/// Field offsets of a struct descriptor, as the engine lays it out.
pub(crate) fn struct_offsets(abi: Abi, ty: &RawType, count: usize) -> FfiResult<Vec<usize>> {
    let mut offsets = vec![0usize; count];
    let code =
        unsafe { raw::ffi_get_struct_offsets(abi.as_raw(), ty.as_ptr(), offsets.as_mut_ptr()) };
    match status_of(code) {
        Status::Ok => Ok(offsets),
        status => Err(FfiError::engine("error while computing struct offsets", status)),
    }
}

impl CallDescriptor {
    /// Perform the native call.
    ///
    /// # Safety
    /// `code` must be a function matching the prepared signature, `args`
    /// must hold one valid pointer per declared argument, and `result` must
    /// point to writable storage at least as large as the return type (and
    /// never smaller than `ffi_arg`).
    pub(crate) unsafe fn invoke(
        &self,
        code: *const c_void,
        args: *mut *mut c_void,
        result: *mut c_void,
    ) {
        let code = CodePtr::from_ptr(code);
        raw::ffi_call(
            &*self.cif as *const raw::ffi_cif as *mut raw::ffi_cif,
            Some(*code.as_fun()),
            result,
            args,
        );
    }

    pub(crate) fn nargs(&self) -> usize {
        self.cif.nargs as usize
    }
}
