//! 1-D table interpolation over borrowed `x`/`y` slices.
//!
//! `x` must be strictly increasing. Queries outside the table are
//! extrapolated from the first or last segment (neighbour methods clamp).

use crate::backend;
use crate::error::SetupError;
use crate::mathex::is_equal_exact;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Interp1Method {
    /// Value of the next table point.
    Next,
    /// Value of the previous table point.
    Previous,
    Nearest,
    #[default]
    Linear,
    /// Raised-cosine blend between neighbours.
    Sine,
    Cubic,
    /// Polynomial through every table point (Lagrange form).
    Hermite,
    /// Catmull-Rom style cubic Hermite spline.
    Spline,
    /// Constrained cubic spline: never overshoots the data.
    ConstrainedSpline,
}

#[derive(Copy, Clone, Debug)]
pub struct Interp1<'a> {
    x: &'a [f64],
    y: &'a [f64],
    method: Interp1Method,
}

impl<'a> Interp1<'a> {
    pub const MIN_POINTS: usize = 4;

    pub fn new(x: &'a [f64], y: &'a [f64]) -> Result<Self, SetupError> {
        if x.len() != y.len() {
            return Err(SetupError::LengthMismatch(x.len(), y.len()));
        }
        if x.len() < Self::MIN_POINTS {
            return Err(SetupError::NotEnoughPoints(Self::MIN_POINTS));
        }
        Ok(Self { x, y, method: Interp1Method::default() })
    }

    #[inline]
    pub fn with_method(mut self, m: Interp1Method) -> Self {
        self.method = m;
        self
    }

    #[inline]
    pub fn set_method(&mut self, m: Interp1Method) {
        self.method = m;
    }

    #[inline]
    pub fn method(&self) -> Interp1Method {
        self.method
    }

    pub fn get(&self, x: f64) -> f64 {
        let (tx, ty) = (self.x, self.y);
        match self.method {
            Interp1Method::Next => next(x, tx, ty),
            Interp1Method::Previous => previous(x, tx, ty),
            Interp1Method::Nearest => nearest(x, tx, ty),
            Interp1Method::Linear => linear(x, tx, ty),
            Interp1Method::Sine => sine(x, tx, ty),
            Interp1Method::Cubic => cubic(x, tx, ty),
            Interp1Method::Hermite => lagrange(x, tx, ty),
            Interp1Method::Spline => spline(x, tx, ty),
            Interp1Method::ConstrainedSpline => constrained_spline(x, tx, ty),
        }
    }
}

// ----------------------------- Neighbour methods -----------------------------

fn next(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let n = tx.len();
    if x >= tx[n - 1] {
        return ty[n - 1];
    }
    let i = (0..n - 1).find(|&i| x < tx[i + 1]).unwrap_or(n - 1);
    ty[(i + 1).min(n - 1)]
}

fn previous(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    if x <= tx[0] {
        return ty[0];
    }
    let i = tx.iter().rposition(|&xi| x >= xi).unwrap_or(0);
    ty[i]
}

fn nearest(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let mut best = 0;
    let mut dmin = backend::abs(x - tx[0]);
    for (i, &xi) in tx.iter().enumerate().skip(1) {
        let d = backend::abs(x - xi);
        // ties go to the later point
        if d <= dmin {
            dmin = d;
            best = i;
        }
    }
    ty[best]
}

// ----------------------------- Segment methods -----------------------------

/// Index `i` of the segment `[tx[i], tx[i+1]]` used for `x`, extrapolating
/// with the first/last segment.
fn segment(x: f64, tx: &[f64]) -> usize {
    let n = tx.len();
    if x <= tx[0] {
        0
    } else if x >= tx[n - 1] {
        n - 2
    } else {
        tx.partition_point(|&xi| xi <= x).saturating_sub(1).min(n - 2)
    }
}

#[inline]
fn line(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    y0 + ((y1 - y0) / (x1 - x0)) * (x - x0)
}

fn linear(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let i = segment(x, tx);
    line(x, tx[i], tx[i + 1], ty[i], ty[i + 1])
}

fn sine(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let i = segment(x, tx);
    let (x0, x1, y0, y1) = (tx[i], tx[i + 1], ty[i], ty[i + 1]);
    let w = 0.5 - 0.5 * backend::cos(core::f64::consts::PI * (x - x0) / (x1 - x0));
    y0 + w * (y1 - y0)
}

#[inline]
fn hermite_basis(t: f64) -> (f64, f64, f64, f64) {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0, t3 - 2.0 * t2 + t, -2.0 * t3 + 3.0 * t2, t3 - t2)
}

fn cubic(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let n = tx.len();
    let i = segment(x, tx);
    let (x0, x1, y0, y1) = (tx[i], tx[i + 1], ty[i], ty[i + 1]);
    let h = x1 - x0;
    if x > tx[n - 1] {
        // mirrored about the last point
        let (h00, h10, h01, h11) = hermite_basis((x - x1) / h);
        return h00 * y1 + h10 * h * (y0 - ty[n - 3]) + h01 * y0 + h11 * h * (y1 - y0);
    }
    let (h00, h10, h01, h11) = hermite_basis((x - x0) / h);
    let back = if i == 0 { y0 - y1 } else { y0 - ty[i - 1] };
    h00 * y0 + h10 * h * back + h01 * y1 + h11 * h * (y1 - y0)
}

/// Polynomial through all points; extrapolates linearly outside the table.
fn lagrange(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let n = tx.len();
    if x < tx[0] || x > tx[n - 1] {
        return linear(x, tx, ty);
    }
    let mut y = 0.0;
    for (i, (&xi, &yi)) in tx.iter().zip(ty).enumerate() {
        let mut term = yi;
        for (j, &xj) in tx.iter().enumerate() {
            if i != j {
                term *= (x - xj) / (xi - xj);
            }
        }
        y += term;
    }
    y
}

fn slope(tx: &[f64], ty: &[f64], i: usize) -> f64 {
    if is_equal_exact(tx[i + 1], tx[i - 1]) {
        0.0
    } else {
        (ty[i + 1] - ty[i - 1]) / (tx[i + 1] - tx[i - 1])
    }
}

fn spline(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let n = tx.len();
    let i = segment(x, tx);
    if is_equal_exact(x, tx[i + 1]) {
        return ty[i + 1];
    }
    let (x0, x1, y0, y1) = (tx[i], tx[i + 1], ty[i], ty[i + 1]);
    let h = x1 - x0;
    let (h00, h10, h01, h11) = hermite_basis((x - x0) / h);
    let (m0, m1) = if i == 0 {
        ((ty[1] - ty[0]) / (tx[1] - tx[0]), (ty[2] - ty[0]) / (tx[2] - tx[0]))
    } else if i == n - 2 {
        (
            (ty[n - 1] - ty[n - 3]) / (tx[n - 1] - tx[n - 3]),
            (ty[n - 1] - ty[n - 2]) / (tx[n - 1] - tx[n - 2]),
        )
    } else {
        (slope(tx, ty, i), slope(tx, ty, i + 1))
    };
    h00 * y0 + h01 * y1 + h10 * h * m0 + h11 * h * m1
}

// ----------------------------- Constrained spline -----------------------------

fn first_derivative(tx: &[f64], ty: &[f64], i: usize) -> f64 {
    let n = tx.len() - 1;
    if i == 0 || i == n {
        let (a, b, c) = if i == 0 { (0, 1, 2) } else { (n, n - 1, n - 2) };
        let dx = tx[b] - tx[a];
        let dy = ty[b] - ty[a];
        return 1.5 * (dy / dx) - 1.0 / ((tx[c] - tx[a]) / (ty[c] - ty[a]) + dx / dy);
    }
    let t1 = (tx[i + 1] - tx[i]) / (ty[i + 1] - ty[i]);
    let t2 = (tx[i] - tx[i - 1]) / (ty[i] - ty[i - 1]);
    // slope changes sign: flat
    if t1 * t2 < 0.0 {
        0.0
    } else {
        2.0 / (t1 + t2)
    }
}

fn constrained_spline(x: f64, tx: &[f64], ty: &[f64]) -> f64 {
    let i = segment(x, tx) + 1;
    if is_equal_exact(x, tx[i]) {
        return ty[i];
    }
    let (x0, x1, y0, y1) = (tx[i - 1], tx[i], ty[i - 1], ty[i]);
    let f1 = first_derivative(tx, ty, i);
    let f0 = first_derivative(tx, ty, i - 1);
    let dx = x1 - x0;
    let dy = y1 - y0;
    let f2_left = -2.0 * (f1 + 2.0 * f0) / dx + 6.0 * dy / (dx * dx);
    let f2_right = 2.0 * (2.0 * f1 + f0) / dx - 6.0 * dy / (dx * dx);
    let x0_x1 = x0 - x1;
    let d = (f2_right - f2_left) / (6.0 * x0_x1);
    let c = (x0 * f2_left - x1 * f2_right) / (2.0 * x0_x1);
    let b = (y0 - y1 - c * (x0 * x0 - x1 * x1) - d * (x0 * x0 * x0 - x1 * x1 * x1)) / x0_x1;
    let a = y1 - b * x1 - c * x1 * x1 - d * x1 * x1 * x1;
    a + x * (b + x * (c + x * d))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX: [f64; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];
    const TY: [f64; 5] = [0.0, 2.0, 4.0, 3.0, 1.0];

    fn table(m: Interp1Method) -> Interp1<'static> {
        Interp1::new(&TX, &TY).unwrap().with_method(m)
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(Interp1::new(&TX, &TY[..4]).err(), Some(SetupError::LengthMismatch(5, 4)));
        assert_eq!(Interp1::new(&TX[..3], &TY[..3]).err(), Some(SetupError::NotEnoughPoints(4)));
    }

    #[test]
    fn neighbour_methods() {
        let nx = table(Interp1Method::Next);
        let pv = table(Interp1Method::Previous);
        let nr = table(Interp1Method::Nearest);
        assert_eq!(nx.get(1.5), 4.0);
        assert_eq!(nx.get(9.0), 1.0);
        assert_eq!(pv.get(1.5), 2.0);
        assert_eq!(pv.get(-1.0), 0.0);
        assert_eq!(nr.get(2.4), 4.0);
        assert_eq!(nr.get(2.6), 3.0);
    }

    #[test]
    fn linear_interpolates_and_extrapolates() {
        let t = table(Interp1Method::Linear);
        assert!((t.get(2.5) - 3.5).abs() < 1e-12);
        assert!((t.get(-1.0) + 2.0).abs() < 1e-12);
        assert!((t.get(5.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn sine_meets_knots_and_midpoints() {
        let t = table(Interp1Method::Sine);
        assert!((t.get(1.0) - 2.0).abs() < 1e-9);
        assert!((t.get(0.5) - 1.0).abs() < 1e-9);
        assert!((t.get(3.5) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn lagrange_reproduces_a_cubic() {
        let xs = [-1.0, 0.0, 1.0, 2.0];
        let ys = xs.map(|x: f64| x * x * x - 2.0 * x + 1.0);
        let t = Interp1::new(&xs, &ys).unwrap().with_method(Interp1Method::Hermite);
        let x = 0.3;
        assert!((t.get(x) - (x * x * x - 2.0 * x + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn splines_hit_the_knots() {
        for m in [Interp1Method::Spline, Interp1Method::ConstrainedSpline, Interp1Method::Cubic] {
            let t = table(m);
            for (x, y) in TX.iter().zip(&TY).skip(1) {
                assert!((t.get(*x) - y).abs() < 1e-9, "method={m:?} x={x} y={}", t.get(*x));
            }
        }
    }

    #[test]
    fn constrained_spline_does_not_overshoot() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [0.0, 0.0, 1.0, 1.0, 1.0];
        let t = Interp1::new(&xs, &ys).unwrap().with_method(Interp1Method::ConstrainedSpline);
        for k in 0..=40 {
            let y = t.get(f64::from(k) * 0.1);
            assert!((-1e-9..=1.0 + 1e-9).contains(&y), "x={} y={y}", f64::from(k) * 0.1);
        }
    }
}
