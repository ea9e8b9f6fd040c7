use proptest::prelude::*;
use qlibs_core::mathex::{in_circle, in_polygon, in_range_coerce, is_equal, map_min_max, normalize};

proptest! {
    #[test]
    fn prop_map_min_max_round_trips(
        x in -1.0e3f64..1.0e3,
        lo in -1.0e3f64..0.0,
        span in 1.0e-2f64..1.0e3,
        y_lo in -50.0f64..50.0,
        y_span in 1.0e-2f64..100.0,
    ) {
        let hi = lo + span;
        let y = map_min_max(x, lo, hi, y_lo, y_lo + y_span);
        let back = map_min_max(y, y_lo, y_lo + y_span, lo, hi);
        let tol = 1e-9 * (1.0 + x.abs()) * (1.0 + span / y_span);
        prop_assert!(is_equal(back, x, tol), "x={} back={}", x, back);
    }
}

proptest! {
    #[test]
    fn prop_normalize_maps_range_ends(lo in -1.0e6f64..1.0e6, span in 1.0e-3f64..1.0e6) {
        let hi = lo + span;
        prop_assert!(normalize(lo, lo, hi).abs() < 1e-12);
        prop_assert!((normalize(hi, lo, hi) - 1.0).abs() < 1e-9);
    }
}

proptest! {
    #[test]
    fn prop_coerce_lands_in_range(x in any::<f64>(), lo in -1.0e3f64..0.0, hi in 0.0f64..1.0e3) {
        let mut v = x;
        let inside = in_range_coerce(&mut v, lo, hi);
        prop_assert!(v >= lo && v <= hi);
        prop_assert_eq!(inside, x >= lo && x <= hi);
        if inside {
            prop_assert_eq!(v, x);
        }
    }
}

proptest! {
    #[test]
    fn prop_square_polygon_agrees_with_bounds(x in -2.0f64..2.0, y in -2.0f64..2.0) {
        let px = [-1.0, 1.0, 1.0, -1.0];
        let py = [-1.0, -1.0, 1.0, 1.0];
        // stay clear of the edges where ray casting is ambiguous
        prop_assume!((x.abs() - 1.0).abs() > 1e-9 && (y.abs() - 1.0).abs() > 1e-9);
        prop_assert_eq!(in_polygon(x, y, &px, &py), x.abs() < 1.0 && y.abs() < 1.0);
        prop_assert_eq!(in_circle(x, y, 0.0, 0.0, 1.0), x * x + y * y <= 1.0);
    }
}
