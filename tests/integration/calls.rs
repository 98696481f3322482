// End-to-end calls into the platform C and math libraries.

use crate::common::{char_ptr, libc, libm, size_t};
use dynffi::{c, Abi, Arg, Cif, FfiError, Library, Value};
use std::f64::consts::FRAC_PI_2;

// ── libm ────────────────────────────────────────────────────────────

#[test]
fn test_cos() {
    let libm = libm();
    let cos = unsafe { libm.function("cos", &c::double(), &[c::double()]) }.unwrap();
    assert_eq!(cos.name(), "cos");
    assert_eq!(cos.call(&[0.0f64.into()]).unwrap().float().unwrap(), 1.0);
    let near_zero = cos.call(&[FRAC_PI_2.into()]).unwrap().float().unwrap();
    assert!(near_zero.abs() < 1e-12, "cos(pi/2) = {}", near_zero);
}

#[test]
fn test_integer_argument_to_double_parameter() {
    let libm = libm();
    let sqrt = unsafe { libm.function("sqrt", &c::double(), &[c::double()]) }.unwrap();
    assert_eq!(sqrt.call(&[16i32.into()]).unwrap().float().unwrap(), 4.0);
}

#[test]
fn test_float_signature() {
    let libm = libm();
    let powf = unsafe { libm.function("powf", &c::float(), &[c::float(), c::float()]) }.unwrap();
    let r = powf.call(&[2.0f32.into(), 10.0f32.into()]).unwrap();
    assert_eq!(r.kind(), c::float().kind());
    assert_eq!(r.float().unwrap(), 1024.0);
}

#[test]
fn test_descriptor_reuse() {
    let libm = libm();
    let sym = libm.symbol("fabs").unwrap();
    let cif = Cif::new(Abi::Default, &c::double(), &[c::double()]).unwrap();
    for x in [-3.5f64, 0.0, 2.25] {
        let r = unsafe { cif.call(sym, &[x.into()]) }.unwrap();
        assert_eq!(r.float().unwrap(), x.abs());
    }
}

// ── libc ────────────────────────────────────────────────────────────

#[test]
fn test_strlen() {
    let libc = libc();
    let strlen = unsafe { libc.function("strlen", &size_t(), &[char_ptr()]) }.unwrap();
    let text = "a 17 byte string.";
    assert_eq!(text.len(), 17);
    assert_eq!(strlen.call(&[text.into()]).unwrap().uint().unwrap(), 17);
    assert_eq!(strlen.call(&["".into()]).unwrap().uint().unwrap(), 0);
}

#[test]
fn test_strcmp() {
    let libc = libc();
    let strcmp =
        unsafe { libc.function("strcmp", &c::int(), &[char_ptr(), char_ptr()]) }.unwrap();
    let cmp = |a: &str, b: &str| strcmp.call(&[a.into(), b.into()]).unwrap().int().unwrap();
    assert_eq!(cmp("same", "same"), 0);
    assert!(cmp("abc", "abd") < 0);
    assert!(cmp("b", "a") > 0);
}

#[test]
fn test_abs_and_labs() {
    let libc = libc();
    let abs = unsafe { libc.function("abs", &c::int(), &[c::int()]) }.unwrap();
    let labs = unsafe { libc.function("labs", &c::long(), &[c::long()]) }.unwrap();
    assert_eq!(abs.call(&[(-12i32).into()]).unwrap().int().unwrap(), 12);
    assert_eq!(labs.call(&[(-1_000_000i64).into()]).unwrap().int().unwrap(), 1_000_000);
}

#[test]
fn test_narrow_integer_result() {
    let libc = libc();
    let toupper = unsafe { libc.function("toupper", &c::int(), &[c::int()]) }.unwrap();
    let r = toupper.call(&[(b'q' as i32).into()]).unwrap();
    assert_eq!(r.int().unwrap(), b'Q' as i64);
}

#[test]
fn test_pointer_argument() {
    let libc = libc();
    let strlen = unsafe { libc.function("strlen", &size_t(), &[char_ptr()]) }.unwrap();
    let owned = std::ffi::CString::new("pointer").unwrap();
    let r = strlen.call(&[Arg::from(owned.as_ptr())]).unwrap();
    assert_eq!(r.uint().unwrap(), 7);
}

#[test]
fn test_returned_string() {
    let libc = libc();
    let strchr =
        unsafe { libc.function("strchr", &char_ptr(), &[char_ptr(), c::int()]) }.unwrap();
    let haystack = std::ffi::CString::new("key=value").unwrap();
    let hit = strchr
        .call(&[haystack.as_ptr().into(), (b'=' as i32).into()])
        .unwrap();
    assert_eq!(
        unsafe { hit.read_c_string() }.unwrap().as_deref(),
        Some("=value")
    );
    let miss = strchr
        .call(&[haystack.as_ptr().into(), (b'#' as i32).into()])
        .unwrap();
    assert!(miss.is_nil().unwrap());
    assert_eq!(unsafe { miss.read_c_string() }.unwrap(), None);
}

// ── Errors ──────────────────────────────────────────────────────────

#[test]
fn test_wrong_argument_count() {
    let libm = libm();
    let cos = unsafe { libm.function("cos", &c::double(), &[c::double()]) }.unwrap();
    assert_eq!(
        cos.call(&[]).unwrap_err(),
        FfiError::ArgumentCount {
            expected: 1,
            got: 0
        }
    );
    assert!(matches!(
        cos.call(&[1.0f64.into(), 2.0f64.into()]),
        Err(FfiError::ArgumentCount { expected: 1, got: 2 })
    ));
}

#[test]
fn test_missing_symbol() {
    let libc = libc();
    let err = unsafe { libc.function("no_such_function_anywhere", &c::void(), &[]) }
        .unwrap_err();
    match err {
        FfiError::Symbol { symbol, .. } => assert_eq!(symbol, "no_such_function_anywhere"),
        other => panic!("expected symbol error, got {:?}", other),
    }
}

#[test]
fn test_mismatched_argument_reports_position() {
    let libm = libm();
    let pow = unsafe { libm.function("pow", &c::double(), &[c::double(), c::double()]) }.unwrap();
    let err = pow.call(&[2.0f64.into(), "two".into()]).unwrap_err();
    assert!(matches!(err, FfiError::Argument { index: 1, .. }));

    let wrong = Value::new(&c::int32());
    let err = pow.call(&[(&wrong).into(), 1.0f64.into()]).unwrap_err();
    assert!(matches!(err, FfiError::Argument { index: 0, .. }));
}

#[test]
fn test_function_keeps_library_loaded() {
    let cos = {
        let libm = Library::open(dynffi::platform::LIBM).unwrap();
        let cos = unsafe { libm.function("cos", &c::double(), &[c::double()]) }.unwrap();
        libm.close().unwrap();
        cos
    };
    assert_eq!(cos.call(&[0.0f64.into()]).unwrap().float().unwrap(), 1.0);
}
