//! Signal smoothing filters behind one `Smoother` trait.
//!
//! Contents
//! - `Lpf1`, `Lpf2`    : first/second order low-pass
//! - `Mwm1`, `Mwm2`    : moving window mean (shifting window / O(1) running sum)
//! - `Mor1`, `Mor2`    : moving outlier removal
//! - `Gmwf`            : Gaussian-weighted moving window
//! - `Expw`            : exponentially weighted mean (and variance)
//! - `Klmn`            : scalar Kalman filter
//! - `Desf`            : double exponential smoothing with n-step forecast
//! - `Alnf`            : adaptive linear filter (LMS with momentum)
//!
//! Notes
//! - Every filter seeds its state with the first sample it sees; `reset`
//!   makes the next sample the seed again.
//! - Windowed filters size their storage with a const generic `N > 0`.

use crate::backend;
use crate::error::SetupError;
use crate::ltisys::{update_fir, update_window_sum};
use crate::tdl::Tdl;

pub trait Smoother {
    /// Filter one sample.
    fn smooth(&mut self, x: f64) -> f64;

    /// Forget the state; the next sample re-seeds the filter.
    fn reset(&mut self);

    /// `true` once the filter has been seeded.
    fn is_initialized(&self) -> bool;
}

#[inline]
fn open_unit(name: &'static str, v: f64) -> Result<f64, SetupError> {
    if v > 0.0 && v < 1.0 {
        Ok(v)
    } else {
        Err(SetupError::OutOfRange { name })
    }
}

#[inline]
fn positive(name: &'static str, v: f64) -> Result<f64, SetupError> {
    if v > 0.0 {
        Ok(v)
    } else {
        Err(SetupError::OutOfRange { name })
    }
}

macro_rules! seeded {
    () => {
        #[inline]
        fn reset(&mut self) {
            self.primed = false;
        }

        #[inline]
        fn is_initialized(&self) -> bool {
            self.primed
        }
    };
}

// ----------------------------- Low-pass -----------------------------

/// `y = x + α(y[k-1] - x)`.
#[derive(Copy, Clone, Debug)]
pub struct Lpf1 {
    pub(crate) alpha: f64,
    y1: f64,
    primed: bool,
}

impl Default for Lpf1 {
    fn default() -> Self {
        Self { alpha: 0.9, y1: 0.0, primed: false }
    }
}

impl Lpf1 {
    pub fn new(alpha: f64) -> Result<Self, SetupError> {
        Ok(Self { alpha: open_unit("alpha", alpha)?, ..Self::default() })
    }
}

impl Smoother for Lpf1 {
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.y1 = x;
            self.primed = true;
        }
        let y = x + self.alpha * (self.y1 - x);
        self.y1 = y;
        y
    }

    seeded!();
}

/// Second-order low-pass; both poles derived from `alpha`.
#[derive(Copy, Clone, Debug)]
pub struct Lpf2 {
    k: f64,
    a1: f64,
    a2: f64,
    b1: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
    primed: bool,
}

impl Default for Lpf2 {
    fn default() -> Self {
        Self::with_alpha(0.9)
    }
}

impl Lpf2 {
    pub fn new(alpha: f64) -> Result<Self, SetupError> {
        Ok(Self::with_alpha(open_unit("alpha", alpha)?))
    }

    fn with_alpha(a: f64) -> Self {
        let aa = a * a;
        let p1 = backend::sqrt(2.0 * a);
        let r = 1.0 + p1 + aa;
        let k = aa / r;
        Self {
            k,
            a1: 2.0 * (aa - 1.0) / r,
            a2: (1.0 - p1 + aa) / r,
            b1: 2.0 * k,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            primed: false,
        }
    }
}

impl Smoother for Lpf2 {
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            (self.x1, self.x2, self.y1, self.y2) = (x, x, x, x);
            self.primed = true;
        }
        let y = self.k * x + self.b1 * self.x1 + self.k * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        (self.x2, self.x1) = (self.x1, x);
        (self.y2, self.y1) = (self.y1, y);
        y
    }

    seeded!();
}

// ----------------------------- Moving windows -----------------------------

/// Moving mean over a shifting window: O(N) per sample.
#[derive(Copy, Clone, Debug)]
pub struct Mwm1<const N: usize> {
    w: [f64; N],
    primed: bool,
}

impl<const N: usize> Default for Mwm1<N> {
    fn default() -> Self {
        const { assert!(N > 0, "window must hold at least one sample") };
        Self { w: [0.0; N], primed: false }
    }
}

impl<const N: usize> Mwm1<N> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const N: usize> Smoother for Mwm1<N> {
    #[allow(clippy::cast_precision_loss)]
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.w = [x; N];
            self.primed = true;
        }
        update_window_sum(&mut self.w, x) / N as f64
    }

    seeded!();
}

/// Moving mean over a tapped delay line with a running sum: O(1) per sample.
#[derive(Copy, Clone, Debug)]
pub struct Mwm2<const N: usize> {
    tdl: Tdl<N>,
    sum: f64,
    primed: bool,
}

impl<const N: usize> Default for Mwm2<N> {
    fn default() -> Self {
        const { assert!(N > 0, "window must hold at least one sample") };
        Self { tdl: Tdl::new(0.0), sum: 0.0, primed: false }
    }
}

impl<const N: usize> Mwm2<N> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const N: usize> Smoother for Mwm2<N> {
    #[allow(clippy::cast_precision_loss)]
    fn smooth(&mut self, x: f64) -> f64 {
        let n = N as f64;
        if !self.primed {
            self.tdl.flush(x);
            self.sum = x * n;
            self.primed = true;
        }
        self.sum += x - self.tdl.oldest();
        self.tdl.insert(x);
        self.sum / n
    }

    seeded!();
}

/// Moving outlier removal on a shifting window.
///
/// A sample further than `alpha·|m|` from the running mean `m` is replaced
/// by `m`; the (possibly replaced) sample is returned.
#[derive(Copy, Clone, Debug)]
pub struct Mor1<const N: usize> {
    w: [f64; N],
    m: f64,
    alpha: f64,
    primed: bool,
}

impl<const N: usize> Mor1<N> {
    pub fn new(alpha: f64) -> Result<Self, SetupError> {
        const { assert!(N > 0, "window must hold at least one sample") };
        Ok(Self { w: [0.0; N], m: 0.0, alpha: open_unit("alpha", alpha)?, primed: false })
    }
}

impl<const N: usize> Smoother for Mor1<N> {
    #[allow(clippy::cast_precision_loss)]
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.w = [x; N];
            self.m = x;
            self.primed = true;
        }
        let mc = update_window_sum(&mut self.w, x) - x;
        if backend::abs(self.m - x) > self.alpha * backend::abs(self.m) {
            self.w[0] = self.m;
        }
        self.m = (mc + self.w[0]) / N as f64;
        self.w[0]
    }

    seeded!();
}

/// Moving outlier removal on a delay line with a running sum.
#[derive(Copy, Clone, Debug)]
pub struct Mor2<const N: usize> {
    tdl: Tdl<N>,
    sum: f64,
    m: f64,
    alpha: f64,
    primed: bool,
}

impl<const N: usize> Mor2<N> {
    pub fn new(alpha: f64) -> Result<Self, SetupError> {
        const { assert!(N > 0, "window must hold at least one sample") };
        Ok(Self { tdl: Tdl::new(0.0), sum: 0.0, m: 0.0, alpha: open_unit("alpha", alpha)?, primed: false })
    }
}

impl<const N: usize> Smoother for Mor2<N> {
    #[allow(clippy::cast_precision_loss)]
    fn smooth(&mut self, x: f64) -> f64 {
        let n = N as f64;
        if !self.primed {
            self.tdl.flush(x);
            self.sum = n * x;
            self.m = x;
            self.primed = true;
        }
        let xx = if backend::abs(self.m - x) > self.alpha * backend::abs(self.m) { self.m } else { x };
        self.sum += xx - self.tdl.oldest();
        self.m = self.sum / n;
        self.tdl.insert(xx);
        xx
    }

    seeded!();
}

/// FIR with a normalized Gaussian kernel centred on tap `center`.
#[derive(Copy, Clone, Debug)]
pub struct Gmwf<const N: usize> {
    w: [f64; N],
    k: [f64; N],
    primed: bool,
}

impl<const N: usize> Gmwf<N> {
    /// `sigma > 0`, `0 <= center < N`.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(sigma: f64, center: f64) -> Result<Self, SetupError> {
        const { assert!(N > 0, "window must hold at least one sample") };
        let sigma = positive("sigma", sigma)?;
        if !(center >= 0.0 && center < N as f64) {
            return Err(SetupError::OutOfRange { name: "center" });
        }
        let r = 2.0 * sigma * sigma;
        let mut k = [0.0; N];
        for (i, ki) in k.iter_mut().enumerate() {
            let d = i as f64 - center;
            *ki = backend::exp(-(d * d) / r);
        }
        let sum: f64 = k.iter().sum();
        k.iter_mut().for_each(|ki| *ki /= sum);
        Ok(Self { w: [0.0; N], k, primed: false })
    }

    pub fn kernel(&self) -> &[f64; N] {
        &self.k
    }
}

impl<const N: usize> Smoother for Gmwf<N> {
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.w = [x; N];
            self.primed = true;
        }
        update_fir(&mut self.w, x, &self.k)
    }

    seeded!();
}

// ----------------------------- Recursive estimators -----------------------------

/// Exponentially weighted mean with forgetting factor `lambda`.
///
/// The weighted variance is tracked alongside and exposed by [`Expw::variance`].
#[derive(Copy, Clone, Debug)]
pub struct Expw {
    pub(crate) lambda: f64,
    m: f64,
    v: f64,
    w: f64,
    primed: bool,
}

impl Default for Expw {
    fn default() -> Self {
        Self { lambda: 0.8, m: 0.0, v: 0.0, w: 1.0, primed: false }
    }
}

impl Expw {
    pub fn new(lambda: f64) -> Result<Self, SetupError> {
        Ok(Self { lambda: open_unit("lambda", lambda)?, ..Self::default() })
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.m
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.v
    }
}

impl Smoother for Expw {
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.m = x;
            self.v = 0.0;
            self.w = 1.0;
            self.primed = true;
        }
        self.w = self.lambda * self.w + 1.0;
        let iw = 1.0 / self.w;
        let m1 = self.m;
        self.m = m1 * (1.0 - iw) + iw * x;
        self.v = self.v * (1.0 - iw) + iw * (x - m1) * (x - self.m);
        self.m
    }

    seeded!();
}

/// Scalar Kalman filter for a constant-state model (`A = H = 1`).
#[derive(Copy, Clone, Debug)]
pub struct Klmn {
    xs: f64,
    p: f64,
    p0: f64,
    q: f64,
    r: f64,
    gain: f64,
    primed: bool,
}

impl Klmn {
    /// `p`: initial estimation error covariance, `q`: process noise
    /// covariance, `r`: measurement noise covariance. All strictly positive.
    pub fn new(p: f64, q: f64, r: f64) -> Result<Self, SetupError> {
        let q = positive("q", q)?;
        let r = positive("r", r)?;
        let p = positive("p", p)?;
        Ok(Self { xs: 0.0, p, p0: p, q, r, gain: 0.0, primed: false })
    }

    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    pub fn covariance(&self) -> f64 {
        self.p
    }
}

impl Smoother for Klmn {
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.xs = x;
            self.p = self.p0;
            self.primed = true;
        }
        self.p += self.q;
        self.gain = self.p / (self.r + self.p);
        self.xs += self.gain * (x - self.xs);
        self.p *= 1.0 - self.gain;
        self.xs
    }

    seeded!();
}

/// Double exponential smoothing; the output is the `n`-step-ahead forecast.
#[derive(Copy, Clone, Debug)]
pub struct Desf {
    alpha: f64,
    beta: f64,
    n: f64,
    lt: f64,
    bt: f64,
    primed: bool,
}

impl Desf {
    /// `alpha`, `beta` in (0, 1); `n >= 0` is rounded to whole steps.
    pub fn new(alpha: f64, beta: f64, n: f64) -> Result<Self, SetupError> {
        let alpha = open_unit("alpha", alpha)?;
        let beta = open_unit("beta", beta)?;
        if !(n >= 0.0) {
            return Err(SetupError::OutOfRange { name: "n" });
        }
        Ok(Self { alpha, beta, n: backend::round(n), lt: 0.0, bt: 0.0, primed: false })
    }

    /// Current trend estimate.
    #[inline]
    pub fn trend(&self) -> f64 {
        self.bt
    }
}

impl Smoother for Desf {
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.lt = x;
            self.bt = 0.0;
            self.primed = true;
        }
        let lt1 = self.lt;
        self.lt = (1.0 - self.alpha) * lt1 + self.alpha * x;
        self.bt = (1.0 - self.beta) * self.bt + self.beta * (self.lt - lt1);
        self.lt + self.n * self.bt
    }

    seeded!();
}

/// Adaptive linear filter: LMS weight update with a momentum term.
#[derive(Copy, Clone, Debug)]
pub struct Alnf<const N: usize> {
    alpha: f64,
    mu: f64,
    xx: [f64; N],
    w: [f64; N],
    w1: [f64; N],
    primed: bool,
}

impl<const N: usize> Alnf<N> {
    /// Learning rate `alpha` in (0, 1), momentum `mu` in [0, 1).
    pub fn new(alpha: f64, mu: f64) -> Result<Self, SetupError> {
        const { assert!(N > 0, "window must hold at least one sample") };
        let alpha = open_unit("alpha", alpha)?;
        if !(0.0..1.0).contains(&mu) {
            return Err(SetupError::OutOfRange { name: "mu" });
        }
        Ok(Self { alpha, mu, xx: [0.0; N], w: [0.0; N], w1: [0.0; N], primed: false })
    }

    pub fn weights(&self) -> &[f64; N] {
        &self.w
    }
}

impl<const N: usize> Smoother for Alnf<N> {
    #[allow(clippy::cast_precision_loss)]
    fn smooth(&mut self, x: f64) -> f64 {
        if !self.primed {
            let np = 1.0 / N as f64;
            self.xx = [x; N];
            self.w = [np; N];
            self.w1 = [np; N];
            self.primed = true;
        }
        let xe = update_fir(&mut self.xx, x, &self.w);
        let e = self.alpha * (x - xe);
        for i in 0..N {
            let w0 = self.w[i];
            self.w[i] += e * self.xx[i] + self.mu * (w0 - self.w1[i]);
            self.w1[i] = w0;
        }
        xe
    }

    seeded!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<S: Smoother>(s: &mut S, xs: &[f64]) -> f64 {
        xs.iter().fold(f64::NAN, |_, &x| s.smooth(x))
    }

    #[test]
    fn lpf1_seeds_with_first_sample() {
        let mut f = Lpf1::new(0.5).unwrap();
        assert!(!f.is_initialized());
        assert_eq!(f.smooth(0.0), 0.0);
        assert!(f.is_initialized());
        assert_eq!(f.smooth(1.0), 0.5);
        assert_eq!(f.smooth(1.0), 0.75);
        f.reset();
        assert_eq!(f.smooth(4.0), 4.0);
        assert!(Lpf1::new(1.0).is_err());
    }

    #[test]
    fn lpf2_has_unit_dc_gain() {
        let mut f = Lpf2::new(0.3).unwrap();
        f.smooth(0.0);
        let y = run(&mut f, &[2.0; 400]);
        assert!((y - 2.0).abs() < 1e-6, "y={y}");
    }

    #[test]
    fn window_means_agree() {
        let xs = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0];
        let mut a: Mwm1<4> = Mwm1::new();
        let mut b: Mwm2<4> = Mwm2::new();
        for &x in &xs {
            let (ya, yb) = (a.smooth(x), b.smooth(x));
            assert!((ya - yb).abs() < 1e-12, "x={x} mwm1={ya} mwm2={yb}");
        }
        // last four samples: 2, 6, 5, 3
        assert!((b.smooth(3.0) - (6.0 + 5.0 + 3.0 + 3.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn outliers_are_replaced() {
        let mut a: Mor1<4> = Mor1::new(0.5).unwrap();
        let mut b: Mor2<4> = Mor2::new(0.5).unwrap();
        for _ in 0..4 {
            a.smooth(10.0);
            b.smooth(10.0);
        }
        assert_eq!(a.smooth(100.0), 10.0);
        assert_eq!(b.smooth(100.0), 10.0);
        assert_eq!(b.smooth(12.0), 12.0);
    }

    #[test]
    fn gaussian_kernel_is_normalized() {
        let g: Gmwf<5> = Gmwf::new(1.0, 2.0).unwrap();
        let k = g.kernel();
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((k[0] - k[4]).abs() < 1e-12 && k[2] > k[1]);
        assert!(Gmwf::<5>::new(1.0, 5.0).is_err());
        let mut g = g;
        assert!((run(&mut g, &[7.0; 10]) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn expw_tracks_mean_and_variance() {
        let mut f = Expw::new(0.99).unwrap();
        let y = run(&mut f, &[1.0, -1.0].repeat(500));
        assert!(y.abs() < 0.05, "mean={y}");
        assert!((f.variance() - 1.0).abs() < 0.1, "var={}", f.variance());
    }

    #[test]
    fn kalman_converges_to_level() {
        let mut f = Klmn::new(1.0, 1e-5, 0.5).unwrap();
        f.smooth(0.0);
        let y = run(&mut f, &[5.0; 400]);
        assert!((y - 5.0).abs() < 0.1, "y={y}");
        assert!(f.gain() > 0.0 && f.gain() < 1.0);
    }

    #[test]
    fn desf_forecasts_a_ramp() {
        let mut f = Desf::new(0.5, 0.5, 1.0).unwrap();
        let mut y = 0.0;
        for k in 0..200 {
            y = f.smooth(f64::from(k));
        }
        assert!((y - 199.0).abs() < 1e-6, "y={y}");
        assert!((f.trend() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn alnf_passes_constant() {
        let mut f: Alnf<8> = Alnf::new(0.1, 0.05).unwrap();
        assert!((run(&mut f, &[3.0; 50]) - 3.0).abs() < 1e-12);
        assert!(Alnf::<8>::new(0.1, 1.0).is_err());
    }
}
