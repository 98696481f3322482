//! # dynffi - Dynamic C Types, Values and Calls
//!
//! Describe C types at run time, allocate values laid out exactly as native
//! code expects, and call shared-library functions through signatures
//! assembled on the fly. No bindings are generated ahead of time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dynffi::{c, platform, Library};
//!
//! let libm = Library::open(platform::LIBM)?;
//! let cos = unsafe { libm.function("cos", &c::double(), &[c::double()])? };
//! let one = cos.call(&[0.0f64.into()])?.float()?;
//! assert_eq!(one, 1.0);
//! # Ok::<(), dynffi::FfiError>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **types** - Registry of shared, immutable type descriptors
//! 2. **value** - Typed views over native memory
//! 3. **codec** - Host data in and out of values
//! 4. **ffi** - Library loading, call interfaces, argument marshaling
//!
//! Struct layout and calling conventions come from libffi, so values are
//! bit-compatible with the code they are passed to.

pub mod codec;
pub mod error;
pub mod ffi;
pub mod platform;
pub mod types;
pub mod value;

pub use codec::{value_of, Decoder, Encoder, Native};
pub use error::{FfiError, FfiResult, Status};
pub use ffi::{Abi, Arg, BindMode, Cif, Function, Library, OpenFlags, Visibility};
pub use types::{
    c, new_array_type, new_pointer_type, new_slice_type, new_struct_type, ptr_to, type_by_name,
    Field, Kind, StructField, Type, TypeRegistry,
};
pub use value::{grow_slice, make_slice, Value};
