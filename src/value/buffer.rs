//! Zero-filled, aligned heap storage backing owning values.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

pub(crate) struct Buffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Buffer {
    /// Allocate `size` zeroed bytes aligned to `align`.
    ///
    /// Zero-sized requests still get a one-byte allocation so the address is
    /// unique and non-null.
    ///
    /// # Panics
    /// If `size` rounded up to `align` overflows `isize`. Type and slice
    /// construction reject such sizes before reaching here.
    pub(crate) fn zeroed(size: usize, align: usize) -> Buffer {
        let layout = match Layout::from_size_align(size.max(1), align.max(1)) {
            Ok(layout) => layout,
            Err(_) => panic!("buffer of {} bytes with alignment {} is not allocatable", size, align),
        };
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };
        Buffer { ptr, layout }
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}
