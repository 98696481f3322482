// Property tests for re-slicing and slice growth.

use super::strategies::arb_len_cap;
use dynffi::{c, grow_slice, make_slice, new_slice_type, FfiError, Value};
use proptest::prelude::*;

fn filled(len: usize, cap: usize) -> Value {
    let ty = new_slice_type(&c::int32()).unwrap();
    let s = make_slice(&ty, len, cap).unwrap();
    for i in 0..len {
        s.index(i).unwrap().set_int(i as i64 * 3 - 7).unwrap();
    }
    s
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn reslice_bounds((len, cap) in arb_len_cap(), begin in 0usize..80, end in 0usize..80) {
        let s = filled(len, cap);
        match s.slice(begin, end) {
            Ok(sub) => {
                prop_assert!(begin <= end && end <= cap);
                prop_assert_eq!(sub.len().unwrap(), end - begin);
                prop_assert_eq!(sub.cap().unwrap(), cap - begin);
                if end > begin && begin < len {
                    prop_assert_eq!(
                        sub.index(0).unwrap().int().unwrap(),
                        s.index(begin).unwrap().int().unwrap()
                    );
                }
            }
            Err(FfiError::Index { .. }) => prop_assert!(begin > end || end > cap),
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }

    #[test]
    fn grow_preserves_prefix((len, cap) in arb_len_cap(), extra in 0usize..200) {
        let s = filled(len, cap);
        let (g, i0, i1) = grow_slice(&s, extra).unwrap();
        prop_assert_eq!(i0, len);
        prop_assert_eq!(i1, len + extra);
        prop_assert_eq!(g.len().unwrap(), i1);
        prop_assert!(g.cap().unwrap() >= i1);
        if i1 <= cap {
            prop_assert_eq!(g.cap().unwrap(), cap);
        }
        for i in 0..len {
            prop_assert_eq!(g.index(i).unwrap().int().unwrap(), i as i64 * 3 - 7);
        }
        for i in len..i1 {
            prop_assert_eq!(g.index(i).unwrap().int().unwrap(), 0);
        }
    }
}
