//! Small numeric helpers generic over `f32`/`f64`.
//!
//! Everything is bounded by [`num_traits::Float`], so the same code serves
//! the `f64` modules of this crate and the `f32` fast-math layer.

use num_traits::Float;

/// Map `x` from `[min, max]` to `[0, 1]` (not clamped).
#[inline]
pub fn normalize<T: Float>(x: T, min: T, max: T) -> T {
    (x - min) / (max - min)
}

/// Linear map of `x` from `[x_min, x_max]` onto `[y_min, y_max]`.
#[inline]
pub fn map_min_max<T: Float>(x: T, x_min: T, x_max: T, y_min: T, y_max: T) -> T {
    (y_max - y_min) * normalize(x, x_min, x_max) + y_min
}

/// Clamp `x` into `[lo, hi]` in place.
///
/// Returns `true` only when `x` was already inside the range. A NaN is
/// replaced by `lo` and reported as out of range.
#[inline]
pub fn in_range_coerce<T: Float>(x: &mut T, lo: T, hi: T) -> bool {
    if x.is_nan() {
        *x = lo;
        false
    } else if *x < lo {
        *x = lo;
        false
    } else if *x > hi {
        *x = hi;
        false
    } else {
        true
    }
}

/// `|a - b| <= |tol|`.
#[inline]
pub fn is_equal<T: Float>(a: T, b: T, tol: T) -> bool {
    (a - b).abs() <= tol.abs()
}

/// [`is_equal`] with the smallest positive normal value as tolerance.
#[inline]
pub fn is_equal_exact<T: Float>(a: T, b: T) -> bool {
    is_equal(a, b, T::min_positive_value())
}

/// Ray-casting point-in-polygon test. `px`/`py` hold the vertices in order;
/// extra elements of the longer slice are ignored.
pub fn in_polygon<T: Float>(x: T, y: T, px: &[T], py: &[T]) -> bool {
    let p = px.len().min(py.len());
    if p < 3 {
        return false;
    }
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (px[0], px[0], py[0], py[0]);
    for i in 0..p {
        max_x = max_x.max(px[i]);
        min_x = min_x.min(px[i]);
        max_y = max_y.max(py[i]);
        min_y = min_y.min(py[i]);
    }
    if y < min_y || y > max_y || x < min_x || x > max_x {
        return false;
    }
    let mut inside = false;
    let mut j = p - 1;
    for i in 0..p {
        if (px[i] > x) != (px[j] > x) {
            let dx = px[j] - px[i];
            let dy = py[j] - py[i];
            if y < dy * (x - px[i]) / dx + py[i] {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[inline]
pub fn in_circle<T: Float>(x: T, y: T, cx: T, cy: T, r: T) -> bool {
    let d = (x - cx) * (x - cx) + (y - cy) * (y - cy);
    d <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_reports_and_clamps() {
        let mut x = 5.0_f64;
        assert!(in_range_coerce(&mut x, 0.0, 10.0));
        x = 12.0;
        assert!(!in_range_coerce(&mut x, 0.0, 10.0));
        assert_eq!(x, 10.0);
        x = f64::NAN;
        assert!(!in_range_coerce(&mut x, -1.0, 1.0));
        assert_eq!(x, -1.0);
    }

    #[test]
    fn map_and_normalize() {
        assert!((normalize(5.0_f32, 0.0, 10.0) - 0.5).abs() < 1e-6);
        assert!((map_min_max(0.25_f64, 0.0, 1.0, -100.0, 100.0) + 50.0).abs() < 1e-12);
    }

    #[test]
    fn polygon_and_circle() {
        let px = [0.0, 4.0, 4.0, 0.0];
        let py = [0.0, 0.0, 4.0, 4.0];
        assert!(in_polygon(2.0, 2.0, &px, &py));
        assert!(!in_polygon(5.0, 2.0, &px, &py));
        // concave "L" shape: notch at the upper right
        let lx = [0.0, 4.0, 4.0, 2.0, 2.0, 0.0];
        let ly = [0.0, 0.0, 2.0, 2.0, 4.0, 4.0];
        assert!(in_polygon(1.0, 3.0, &lx, &ly));
        assert!(!in_polygon(3.0, 3.0, &lx, &ly));
        assert!(in_circle(1.0, 1.0, 0.0, 0.0, 1.5));
        assert!(!in_circle(2.0, 2.0, 0.0, 0.0, 1.5));
    }

    #[test]
    fn equality_with_tolerance() {
        assert!(is_equal(1.0, 1.05, 0.1));
        assert!(!is_equal(1.0, 1.2, -0.1));
        assert!(is_equal_exact(0.5_f64, 0.5));
    }
}
