use proptest::prelude::*;
use qlibs_core::fp16::Fp16;

// One Q16.16 step; every conversion rounds to within half of it.
const LSB: f64 = 1.0 / 65_536.0;

proptest! {
    #[test]
    fn prop_add_sub_track_f64(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
        let (fa, fb) = (Fp16::from_f64(a), Fp16::from_f64(b));
        let sum = (fa + fb).to_f64();
        let diff = (fa - fb).to_f64();
        prop_assert!((sum - (a + b)).abs() <= 2.0 * LSB, "a={} b={} sum={}", a, b, sum);
        prop_assert!((diff - (a - b)).abs() <= 2.0 * LSB, "a={} b={} diff={}", a, b, diff);
    }
}

proptest! {
    #[test]
    fn prop_mul_tracks_f64(a in -100.0f64..100.0, b in -100.0f64..100.0) {
        let got = (Fp16::from_f64(a) * Fp16::from_f64(b)).to_f64();
        // input quantisation scaled by the other operand, plus the product rounding
        let tol = LSB * (a.abs() + b.abs() + 2.0);
        prop_assert!((got - a * b).abs() <= tol, "a={} b={} got={}", a, b, got);
    }
}

proptest! {
    #[test]
    fn prop_conversion_is_monotonic(a in -30_000.0f64..30_000.0, b in -30_000.0f64..30_000.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Fp16::from_f64(lo) <= Fp16::from_f64(hi));
    }
}

proptest! {
    #[test]
    fn prop_sqrt_tracks_f64(x in 1.0f64..10_000.0) {
        let got = Fp16::from_f64(x).sqrt().to_f64();
        prop_assert!((got - x.sqrt()).abs() < 1e-3, "x={} got={}", x, got);
    }
}
