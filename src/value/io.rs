//! Byte-level access to a value's storage.

use super::Value;
use crate::error::{FfiError, FfiResult};
use std::io::{self, Read, Write};

impl Value {
    /// Copy of the raw storage, `ty().size()` bytes.
    pub fn bytes(&self) -> FfiResult<Vec<u8>> {
        self.check_valid("Value::bytes")?;
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.ty.size()) };
        Ok(bytes.to_vec())
    }

    /// Overwrite the storage with `src`, which must be exactly
    /// `ty().size()` bytes long.
    pub fn set_bytes(&self, src: &[u8]) -> FfiResult<()> {
        self.check_valid("Value::set_bytes")?;
        if src.len() != self.ty.size() {
            return Err(FfiError::index("Value::set_bytes", src.len(), self.ty.size()));
        }
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr, src.len()) };
        Ok(())
    }

    /// Sequential reader over the storage.
    pub fn reader(&self) -> FfiResult<ValueReader> {
        self.check_valid("Value::reader")?;
        Ok(ValueReader {
            value: self.clone(),
            pos: 0,
        })
    }

    /// Sequential writer over the storage. Writes past the end are short.
    pub fn writer(&self) -> FfiResult<ValueWriter> {
        self.check_valid("Value::writer")?;
        Ok(ValueWriter {
            value: self.clone(),
            pos: 0,
        })
    }
}

pub struct ValueReader {
    value: Value,
    pos: usize,
}

impl Read for ValueReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.value.ty.size() - self.pos;
        let n = remaining.min(buf.len());
        unsafe {
            std::ptr::copy_nonoverlapping(self.value.ptr.add(self.pos), buf.as_mut_ptr(), n);
        }
        self.pos += n;
        Ok(n)
    }
}

pub struct ValueWriter {
    value: Value,
    pos: usize,
}

impl Write for ValueWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.value.ty.size() - self.pos;
        let n = remaining.min(buf.len());
        unsafe {
            std::ptr::copy_nonoverlapping(buf.as_ptr(), self.value.ptr.add(self.pos), n);
        }
        self.pos += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
