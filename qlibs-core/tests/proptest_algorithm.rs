use proptest::prelude::*;
use qlibs_core::algorithm::{bsearch, rotate, sort};

proptest! {
    #[test]
    fn prop_sort_matches_std(mut v in prop::collection::vec(any::<i32>(), 0..300)) {
        let mut want = v.clone();
        want.sort_unstable();
        sort(&mut v);
        prop_assert_eq!(v, want);
    }
}

proptest! {
    #[test]
    fn prop_sorted_floats_are_ascending_and_searchable(
        mut v in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
        pick in any::<prop::sample::Index>()
    ) {
        sort(&mut v);
        prop_assert!(v.windows(2).all(|w| w[0] <= w[1]));
        let key = v[pick.index(v.len())];
        let at = bsearch(&v, &key);
        prop_assert!(at.is_some_and(|i| v[i] == key));
    }
}

proptest! {
    #[test]
    fn prop_rotate_inverts(v in prop::collection::vec(any::<u8>(), 0..64), k in -200isize..200) {
        let mut w = v.clone();
        rotate(&mut w, k);
        if let Some(&first) = v.first() {
            let len = v.len() as isize;
            let dst = k.rem_euclid(len) as usize;
            prop_assert_eq!(w[dst], first);
        }
        rotate(&mut w, -k);
        prop_assert_eq!(w, v);
    }
}
