//! Shared test helpers for the dynffi test suite.

#![allow(dead_code)]

use dynffi::{c, platform, ptr_to, Library, Type};

/// Route crate logging to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}

pub fn libm() -> Library {
    init_logging();
    Library::open(platform::LIBM).expect("platform math library")
}

pub fn libc() -> Library {
    init_logging();
    Library::open(platform::LIBC).expect("platform C library")
}

/// `char*`
pub fn char_ptr() -> Type {
    ptr_to(&c::char()).unwrap()
}

/// `size_t` at the platform pointer width.
pub fn size_t() -> Type {
    match platform::POINTER_SIZE {
        4 => c::uint32(),
        _ => c::uint64(),
    }
}
