//! Foreign function interface.
//!
//! Opens shared libraries, prepares call interfaces with libffi and
//! marshals host arguments into native calls.
//!
//! # Example
//!
//! ```ignore
//! let libc = Library::open(platform::LIBC)?;
//! let char_ptr = ptr_to(&c::char())?;
//! let strlen = unsafe { libc.function("strlen", &c::ulong(), &[char_ptr])? };
//! assert_eq!(strlen.call(&["hello".into()])?.uint()?, 5);
//! ```

pub(crate) mod abi;
mod call;
mod loader;
mod marshal;

pub use abi::Abi;
pub use call::{Cif, Function};
pub use loader::{BindMode, Library, OpenFlags, Visibility};
pub use marshal::Arg;
