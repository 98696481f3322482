//! Platform facts: system library names and native widths.

/// The C runtime library.
#[cfg(target_os = "linux")]
pub const LIBC: &str = "libc.so.6";
/// The C math library.
#[cfg(target_os = "linux")]
pub const LIBM: &str = "libm.so.6";

#[cfg(target_os = "macos")]
pub const LIBC: &str = "/usr/lib/libSystem.B.dylib";
#[cfg(target_os = "macos")]
pub const LIBM: &str = "/usr/lib/libSystem.B.dylib";

#[cfg(windows)]
pub const LIBC: &str = "msvcrt.dll";
#[cfg(windows)]
pub const LIBM: &str = "msvcrt.dll";

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
pub const LIBC: &str = "libc.so";
#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
pub const LIBM: &str = "libm.so";

pub const POINTER_SIZE: usize = std::mem::size_of::<*const u8>();

/// Width of the host's default integer, `isize`.
pub const NATIVE_INT_SIZE: usize = std::mem::size_of::<isize>();
