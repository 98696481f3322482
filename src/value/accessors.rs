//! Typed scalar getters and setters.
//!
//! Each accessor reads or writes exactly the native width of the value's
//! kind. Signed, unsigned, floating and pointer families do not mix; a
//! setter given a number that does not fit the width is refused.

use super::Value;
use crate::error::{FfiError, FfiResult};
use crate::types::Kind;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

impl Value {
    unsafe fn load<T: Copy>(&self) -> T {
        (self.ptr as *const T).read_unaligned()
    }

    unsafe fn store<T: Copy>(&self, x: T) {
        (self.ptr as *mut T).write_unaligned(x)
    }

    /// Read a signed integer.
    pub fn int(&self) -> FfiResult<i64> {
        self.check_valid("Value::int")?;
        unsafe {
            match self.kind() {
                Kind::Int8 => Ok(self.load::<i8>() as i64),
                Kind::Int16 => Ok(self.load::<i16>() as i64),
                Kind::Int32 => Ok(self.load::<i32>() as i64),
                Kind::Int64 => Ok(self.load::<i64>()),
                kind => Err(FfiError::kind("Value::int", kind)),
            }
        }
    }

    /// Read an unsigned integer.
    pub fn uint(&self) -> FfiResult<u64> {
        self.check_valid("Value::uint")?;
        unsafe {
            match self.kind() {
                Kind::Uint8 => Ok(self.load::<u8>() as u64),
                Kind::Uint16 => Ok(self.load::<u16>() as u64),
                Kind::Uint32 => Ok(self.load::<u32>() as u64),
                Kind::Uint64 => Ok(self.load::<u64>()),
                kind => Err(FfiError::kind("Value::uint", kind)),
            }
        }
    }

    /// Read a `float` or `double`. `long double` has no host counterpart.
    pub fn float(&self) -> FfiResult<f64> {
        self.check_valid("Value::float")?;
        unsafe {
            match self.kind() {
                Kind::Float => Ok(self.load::<f32>() as f64),
                Kind::Double => Ok(self.load::<f64>()),
                Kind::LongDouble => Err(FfiError::unsupported("Value::float", "LongDouble")),
                kind => Err(FfiError::kind("Value::float", kind)),
            }
        }
    }

    /// The address held by a pointer value, or the data address of a slice.
    pub fn pointer(&self) -> FfiResult<*mut c_void> {
        self.check_valid("Value::pointer")?;
        if self.kind().is_pointer_like() {
            Ok(self.read_cell() as *mut c_void)
        } else {
            Err(FfiError::kind("Value::pointer", self.kind()))
        }
    }

    pub fn set_int(&self, x: i64) -> FfiResult<()> {
        self.check_valid("Value::set_int")?;
        let kind = self.kind();
        let range = || FfiError::out_of_range("Value::set_int", kind, x);
        unsafe {
            match kind {
                Kind::Int8 => self.store(i8::try_from(x).map_err(|_| range())?),
                Kind::Int16 => self.store(i16::try_from(x).map_err(|_| range())?),
                Kind::Int32 => self.store(i32::try_from(x).map_err(|_| range())?),
                Kind::Int64 => self.store(x),
                _ => return Err(FfiError::kind("Value::set_int", kind)),
            }
        }
        Ok(())
    }

    pub fn set_uint(&self, x: u64) -> FfiResult<()> {
        self.check_valid("Value::set_uint")?;
        let kind = self.kind();
        let range = || FfiError::out_of_range("Value::set_uint", kind, x);
        unsafe {
            match kind {
                Kind::Uint8 => self.store(u8::try_from(x).map_err(|_| range())?),
                Kind::Uint16 => self.store(u16::try_from(x).map_err(|_| range())?),
                Kind::Uint32 => self.store(u32::try_from(x).map_err(|_| range())?),
                Kind::Uint64 => self.store(x),
                _ => return Err(FfiError::kind("Value::set_uint", kind)),
            }
        }
        Ok(())
    }

    /// Store a float. Narrowing to `float` rounds like a C conversion.
    pub fn set_float(&self, x: f64) -> FfiResult<()> {
        self.check_valid("Value::set_float")?;
        unsafe {
            match self.kind() {
                Kind::Float => self.store(x as f32),
                Kind::Double => self.store(x),
                Kind::LongDouble => {
                    return Err(FfiError::unsupported("Value::set_float", "LongDouble"))
                }
                kind => return Err(FfiError::kind("Value::set_float", kind)),
            }
        }
        Ok(())
    }

    /// Store an address into a pointer value.
    pub fn set_pointer(&self, p: *const c_void) -> FfiResult<()> {
        self.expect_kind("Value::set_pointer", Kind::Pointer)?;
        unsafe { self.store(p) };
        Ok(())
    }

    /// Copy out the NUL-terminated string a pointer value refers to.
    /// Returns `None` for a nil pointer.
    ///
    /// # Safety
    /// A non-nil pointer must address a NUL-terminated byte string.
    pub unsafe fn read_c_string(&self) -> FfiResult<Option<String>> {
        let p = self.pointer()?;
        if p.is_null() {
            return Ok(None);
        }
        let text = CStr::from_ptr(p as *const c_char);
        Ok(Some(text.to_string_lossy().into_owned()))
    }
}
