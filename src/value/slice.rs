//! Slice construction, re-slicing and growth.

use super::{Buffer, SliceHeader, Value};
use crate::error::{FfiError, FfiResult};
use crate::types::{new_slice_type, Kind, Type, MAX_TYPE_SIZE};
use log::debug;
use std::ptr;
use std::rc::Rc;

/// Below this length capacity doubles; from here on it grows by a quarter.
const GROWTH_THRESHOLD: usize = 1024;

impl Value {
    fn slice_view(
        ty: Type,
        data: *mut u8,
        backing: Option<Rc<Buffer>>,
        len: usize,
        cap: usize,
    ) -> Value {
        let cell = Rc::new(Buffer::zeroed(ty.size(), ty.align()));
        unsafe { (cell.as_ptr() as *mut *mut u8).write(data) };
        Value {
            ty,
            ptr: cell.as_ptr(),
            owner: Some(cell),
            target: backing,
            header: Some(SliceHeader { len, cap }),
        }
    }

    /// Slice `[begin, end)` of an array or slice, sharing its storage.
    ///
    /// # Returns
    /// * `Ok(slice)` - with `len = end - begin` and `cap = cap - begin`
    /// * `Err(FfiError::Index)` - unless `begin <= end <= cap`
    pub fn slice(&self, begin: usize, end: usize) -> FfiResult<Value> {
        self.check_valid("Value::slice")?;
        let (data, cap, backing) = match self.kind() {
            Kind::Array => (self.ptr, self.ty.len()?, self.owner.clone()),
            Kind::Slice => (self.read_cell(), self.cap()?, self.target.clone()),
            kind => return Err(FfiError::kind("Value::slice", kind)),
        };
        if end > cap {
            return Err(FfiError::index("Value::slice", end, cap));
        }
        if begin > end {
            return Err(FfiError::index("Value::slice", begin, end));
        }
        let elem = self.ty.elem()?;
        let ty = new_slice_type(&elem)?;
        let start = data.wrapping_add(begin * elem.size());
        Ok(Value::slice_view(ty, start, backing, end - begin, cap - begin))
    }
}

/// Allocate a zeroed backing array of `cap` elements and return a slice of
/// the first `len`.
pub fn make_slice(ty: &Type, len: usize, cap: usize) -> FfiResult<Value> {
    if ty.kind() != Kind::Slice {
        return Err(FfiError::kind("make_slice", ty.kind()));
    }
    if len > cap {
        return Err(FfiError::index("make_slice", len, cap));
    }
    let elem = ty.elem()?;
    let bytes = cap
        .checked_mul(elem.size())
        .filter(|bytes| *bytes <= MAX_TYPE_SIZE)
        .ok_or_else(|| FfiError::out_of_range("make_slice", Kind::Slice, cap))?;
    let backing = Rc::new(Buffer::zeroed(bytes, elem.align()));
    Ok(Value::slice_view(
        ty.clone(),
        backing.as_ptr(),
        Some(backing),
        len,
        cap,
    ))
}

/// Extend a slice by `extra` elements.
///
/// Within capacity this re-slices the same backing array. Otherwise a new
/// array is allocated and the existing elements copied over; views of the
/// old array stay valid but are detached from the result.
///
/// # Returns
/// `(grown, old_len, new_len)`
pub fn grow_slice(v: &Value, extra: usize) -> FfiResult<(Value, usize, usize)> {
    v.expect_kind("grow_slice", Kind::Slice)?;
    let i0 = v.len()?;
    let cap = v.cap()?;
    let i1 = i0
        .checked_add(extra)
        .ok_or_else(|| FfiError::out_of_range("grow_slice", Kind::Slice, extra))?;
    if i1 <= cap {
        return Ok((v.slice(0, i1)?, i0, i1));
    }

    let mut m = cap;
    if m == 0 {
        m = extra;
    } else {
        while m < i1 {
            if i0 < GROWTH_THRESHOLD {
                m = m.saturating_add(m);
            } else {
                m = m.saturating_add(m / 4);
            }
        }
    }

    let grown = make_slice(v.ty(), i1, m)?;
    let elem_size = v.ty().elem()?.size();
    if i0 > 0 {
        unsafe { ptr::copy_nonoverlapping(v.read_cell(), grown.read_cell(), i0 * elem_size) };
    }
    debug!(
        "grew slice {} from capacity {} to {}",
        v.ty().name(),
        cap,
        m
    );
    Ok((grown, i0, i1))
}
