//! Linear time-invariant systems driven one sample at a time.
//!
//! Goals
//! - Allocation free: state lives in const-generic arrays
//! - Same stepping API for continuous and discrete models (`LtiSystem`)
//! - Optional output saturation and input transport delay
//!
//! Contents
//! - `update_fir` / `update_window_sum` : shift-and-accumulate helpers shared with the smoothers
//! - `ContinuousSystem<ORDER, DELAY>`    : `num(s)/den(s)` in observable canonical form
//! - `DiscreteSystem<N, DELAY>`          : `b(z)/a(z)` in direct form II
//!
//! Notes
//! - Coefficients are given highest power first and normalized by the
//!   leading denominator coefficient.
//! - `DELAY` is a whole number of samples; `0` disables the delay line.
//! - Systems built with `Default` are not ready: `excite` returns 0 until
//!   `setup` succeeds.

use crate::error::SetupError;
use crate::numa::{IntegrationMethod, NumaState};
use crate::tdl::Tdl;
use cfg_if::cfg_if;

// ----------------------------- FIR helpers -----------------------------

/// Shift `window` by one (dropping the oldest value), store `x` at index 0
/// and return the dot product of the window with `coeffs`.
///
/// `coeffs` shorter than the window weights the tail with zeros.
#[inline]
pub fn update_fir(window: &mut [f64], x: f64, coeffs: &[f64]) -> f64 {
    shift_in(window, x);
    dot(window, coeffs)
}

/// [`update_fir`] with unit weights: the sum of the window after the shift.
#[inline]
pub fn update_window_sum(window: &mut [f64], x: f64) -> f64 {
    shift_in(window, x);
    window.iter().sum()
}

#[inline]
fn shift_in(window: &mut [f64], x: f64) {
    if let Some(n) = window.len().checked_sub(1) {
        window.copy_within(0..n, 1);
        window[0] = x;
    }
}

cfg_if! {
    if #[cfg(feature = "simd")] {
        use wide::f64x4;

        fn dot(a: &[f64], b: &[f64]) -> f64 {
            let n = a.len().min(b.len());
            let (a, b) = (&a[..n], &b[..n]);
            let mut acc = f64x4::ZERO;
            let mut ca = a.chunks_exact(4);
            let mut cb = b.chunks_exact(4);
            for (x, y) in (&mut ca).zip(&mut cb) {
                acc += f64x4::new([x[0], x[1], x[2], x[3]]) * f64x4::new([y[0], y[1], y[2], y[3]]);
            }
            let tail: f64 = ca.remainder().iter().zip(cb.remainder()).map(|(x, y)| x * y).sum();
            acc.reduce_add() + tail
        }
    } else {
        #[inline]
        fn dot(a: &[f64], b: &[f64]) -> f64 {
            a.iter().zip(b).map(|(x, y)| x * y).sum()
        }
    }
}

// ----------------------------- Common interface -----------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LtiKind {
    Continuous,
    Discrete,
}

/// A single-input single-output LTI model.
pub trait LtiSystem {
    /// Feed input `u` (after the transport delay) and return the saturated output.
    fn excite(&mut self, u: f64) -> f64;

    /// Set internal states; `None` zeroes them.
    fn set_init_states(&mut self, xi: Option<&[f64]>) -> Result<(), SetupError>;

    /// Clamp the output to `[min, max]`. Requires `min < max`.
    fn set_saturation(&mut self, min: f64, max: f64) -> Result<(), SetupError>;

    /// Refill the transport delay line with `init`.
    fn flush_delay(&mut self, init: f64);

    fn is_initialized(&self) -> bool;

    fn kind(&self) -> LtiKind;
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Limits {
    min: f64,
    max: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self { min: f64::NEG_INFINITY, max: f64::INFINITY }
    }
}

impl Limits {
    fn set(&mut self, ready: bool, min: f64, max: f64) -> Result<(), SetupError> {
        if !ready {
            return Err(SetupError::NotInitialized);
        }
        if !(max > min) {
            return Err(SetupError::InvalidLimits);
        }
        *self = Self { min, max };
        Ok(())
    }

    #[inline]
    fn apply(&self, y: f64) -> f64 {
        if y < self.min {
            self.min
        } else if y > self.max {
            self.max
        } else {
            y
        }
    }
}

#[inline]
fn delayed<const D: usize>(line: &mut Tdl<D>, u: f64) -> f64 {
    if D == 0 {
        return u;
    }
    let out = line.oldest();
    line.insert(u);
    out
}

// ----------------------------- Continuous -----------------------------

/// Strictly-proper or proper transfer function `num(s)/den(s)` of order `ORDER`.
///
/// ```
/// use qlibs_core::ltisys::{ContinuousSystem, LtiSystem};
/// // 1 / (s + 1)
/// let mut g: ContinuousSystem<1> = ContinuousSystem::new(&[1.0], &[1.0, 1.0], 0.01).unwrap();
/// let mut y = 0.0;
/// for _ in 0..1000 {
///     y = g.excite(1.0);
/// }
/// assert!((y - 1.0).abs() < 1e-3);
/// ```
#[derive(Clone, Debug)]
pub struct ContinuousSystem<const ORDER: usize, const DELAY: usize = 0> {
    b0: f64,
    b: [f64; ORDER],
    a: [f64; ORDER],
    xc: [NumaState; ORDER],
    dt: f64,
    limits: Limits,
    delay: Tdl<DELAY>,
    ready: bool,
}

impl<const ORDER: usize, const DELAY: usize> Default for ContinuousSystem<ORDER, DELAY> {
    fn default() -> Self {
        Self {
            b0: 0.0,
            b: [0.0; ORDER],
            a: [0.0; ORDER],
            xc: [NumaState::default(); ORDER],
            dt: 0.0,
            limits: Limits::default(),
            delay: Tdl::new(0.0),
            ready: false,
        }
    }
}

impl<const ORDER: usize, const DELAY: usize> ContinuousSystem<ORDER, DELAY> {
    pub fn new(num: &[f64], den: &[f64], dt: f64) -> Result<Self, SetupError> {
        let mut s = Self::default();
        s.setup(num, den, dt)?;
        Ok(s)
    }

    /// `den` must hold exactly `ORDER + 1` coefficients; a shorter `num` is
    /// padded with leading zeros.
    pub fn setup(&mut self, num: &[f64], den: &[f64], dt: f64) -> Result<(), SetupError> {
        if ORDER == 0 {
            return Err(SetupError::OutOfRange { name: "order" });
        }
        if den.len() != ORDER + 1 {
            return Err(SetupError::LengthMismatch(den.len(), ORDER + 1));
        }
        if num.is_empty() || num.len() > ORDER + 1 {
            return Err(SetupError::TooManyCoefficients { got: num.len(), max: ORDER + 1 });
        }
        if !(dt > 0.0) {
            return Err(SetupError::InvalidTimeStep);
        }
        let a0 = den[0];
        if a0 == 0.0 {
            return Err(SetupError::ZeroLeadingCoefficient);
        }
        let pad = ORDER + 1 - num.len();
        let coef = |k: usize| if k < pad { 0.0 } else { num[k - pad] / a0 };
        self.b0 = coef(0);
        for i in 0..ORDER {
            self.b[i] = coef(i + 1);
            self.a[i] = den[i + 1] / a0;
        }
        self.dt = dt;
        self.ready = true;
        self.set_init_states(None)
    }

    pub fn set_integration_method(&mut self, m: IntegrationMethod) -> Result<(), SetupError> {
        if !self.ready {
            return Err(SetupError::NotInitialized);
        }
        for x in &mut self.xc {
            x.set_method(m);
        }
        Ok(())
    }

    /// Current state vector.
    pub fn states(&self) -> [f64; ORDER] {
        core::array::from_fn(|i| self.xc[i].value())
    }

    fn update(&mut self, u: f64) -> f64 {
        let n = ORDER - 1;
        let x0 = self.xc[0].value();
        for i in 0..n {
            let dxi = -self.a[i] * x0 + self.xc[i + 1].value() + (self.b[i] - self.a[i] * self.b0) * u;
            self.xc[i].integrate(dxi, self.dt);
        }
        let dxn = -self.a[n] * x0 + (self.b[n] - self.a[n] * self.b0) * u;
        self.xc[n].integrate(dxn, self.dt);
        self.xc[0].value() + self.b0 * u
    }
}

impl<const ORDER: usize, const DELAY: usize> LtiSystem for ContinuousSystem<ORDER, DELAY> {
    fn excite(&mut self, u: f64) -> f64 {
        if !self.ready {
            return 0.0;
        }
        let u = delayed(&mut self.delay, u);
        let y = self.update(u);
        self.limits.apply(y)
    }

    fn set_init_states(&mut self, xi: Option<&[f64]>) -> Result<(), SetupError> {
        if !self.ready {
            return Err(SetupError::NotInitialized);
        }
        match xi {
            Some(v) if v.len() != ORDER => return Err(SetupError::LengthMismatch(v.len(), ORDER)),
            Some(v) => self.xc.iter_mut().zip(v).for_each(|(x, &v0)| x.init(v0, 0.0, 0.0)),
            None => self.xc.iter_mut().for_each(|x| x.init(0.0, 0.0, 0.0)),
        }
        Ok(())
    }

    fn set_saturation(&mut self, min: f64, max: f64) -> Result<(), SetupError> {
        self.limits.set(self.ready, min, max)
    }

    fn flush_delay(&mut self, init: f64) {
        self.delay.flush(init);
    }

    fn is_initialized(&self) -> bool {
        self.ready
    }

    fn kind(&self) -> LtiKind {
        LtiKind::Continuous
    }
}

// ----------------------------- Discrete -----------------------------

/// `b(z)/a(z)` with up to `N` numerator taps and `N` denominator taps after `a0`.
#[derive(Clone, Debug)]
pub struct DiscreteSystem<const N: usize, const DELAY: usize = 0> {
    b: [f64; N],
    a: [f64; N],
    na: usize,
    xd: [f64; N],
    limits: Limits,
    delay: Tdl<DELAY>,
    ready: bool,
}

impl<const N: usize, const DELAY: usize> Default for DiscreteSystem<N, DELAY> {
    fn default() -> Self {
        Self {
            b: [0.0; N],
            a: [0.0; N],
            na: 0,
            xd: [0.0; N],
            limits: Limits::default(),
            delay: Tdl::new(0.0),
            ready: false,
        }
    }
}

impl<const N: usize, const DELAY: usize> DiscreteSystem<N, DELAY> {
    pub fn new(b: &[f64], a: &[f64]) -> Result<Self, SetupError> {
        let mut s = Self::default();
        s.setup(b, a)?;
        Ok(s)
    }

    pub fn setup(&mut self, b: &[f64], a: &[f64]) -> Result<(), SetupError> {
        if b.is_empty() || b.len() > N {
            return Err(SetupError::TooManyCoefficients { got: b.len(), max: N });
        }
        if a.is_empty() || a.len() > N + 1 {
            return Err(SetupError::TooManyCoefficients { got: a.len(), max: N + 1 });
        }
        let a0 = a[0];
        if a0 == 0.0 {
            return Err(SetupError::ZeroLeadingCoefficient);
        }
        self.b = [0.0; N];
        self.a = [0.0; N];
        for (dst, &v) in self.b.iter_mut().zip(b) {
            *dst = v / a0;
        }
        for (dst, &v) in self.a.iter_mut().zip(&a[1..]) {
            *dst = v / a0;
        }
        self.na = a.len() - 1;
        self.ready = true;
        self.set_init_states(None)
    }

    fn update(&mut self, u: f64) -> f64 {
        let v = u - dot(&self.a[..self.na], &self.xd[..self.na]);
        update_fir(&mut self.xd, v, &self.b)
    }
}

impl<const N: usize, const DELAY: usize> LtiSystem for DiscreteSystem<N, DELAY> {
    fn excite(&mut self, u: f64) -> f64 {
        if !self.ready {
            return 0.0;
        }
        let u = delayed(&mut self.delay, u);
        let y = self.update(u);
        self.limits.apply(y)
    }

    fn set_init_states(&mut self, xi: Option<&[f64]>) -> Result<(), SetupError> {
        if !self.ready {
            return Err(SetupError::NotInitialized);
        }
        match xi {
            Some(v) if v.len() != N => return Err(SetupError::LengthMismatch(v.len(), N)),
            Some(v) => self.xd.copy_from_slice(v),
            None => self.xd = [0.0; N],
        }
        Ok(())
    }

    fn set_saturation(&mut self, min: f64, max: f64) -> Result<(), SetupError> {
        self.limits.set(self.ready, min, max)
    }

    fn flush_delay(&mut self, init: f64) {
        self.delay.flush(init);
    }

    fn is_initialized(&self) -> bool {
        self.ready
    }

    fn kind(&self) -> LtiKind {
        LtiKind::Discrete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fir_shifts_and_weights() {
        let mut w = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = update_fir(&mut w, 10.0, &[1.0, 0.5, 0.0, 0.0, 1.0]);
        assert_eq!(w, [10.0, 1.0, 2.0, 3.0, 4.0]);
        assert!((y - (10.0 + 0.5 + 4.0)).abs() < 1e-12, "y={y}");
        assert_eq!(update_window_sum(&mut w, 0.0), 16.0);
        assert_eq!(w, [0.0, 10.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn continuous_step_reaches_dc_gain() {
        let mut g: ContinuousSystem<3> =
            ContinuousSystem::new(&[0.0, 2.0, 3.0, 6.0], &[1.0, 6.0, 11.0, 16.0], 0.01).unwrap();
        let mut y = 0.0;
        for _ in 0..3000 {
            y = g.excite(1.0);
        }
        assert!((y - 6.0 / 16.0).abs() < 1e-3, "y={y}");
    }

    #[test]
    fn continuous_short_numerator_is_padded() {
        let full: ContinuousSystem<2> = ContinuousSystem::new(&[0.0, 0.0, 4.0], &[2.0, 3.0, 4.0], 0.01).unwrap();
        let short: ContinuousSystem<2> = ContinuousSystem::new(&[4.0], &[2.0, 3.0, 4.0], 0.01).unwrap();
        let (mut f, mut s) = (full, short);
        for _ in 0..50 {
            assert_eq!(f.excite(1.0), s.excite(1.0));
        }
    }

    #[test]
    fn discrete_step_and_saturation() {
        let mut g: DiscreteSystem<3> = DiscreteSystem::new(&[0.1, 0.2, 0.3], &[1.0, -0.85, 0.02]).unwrap();
        assert_eq!(g.kind(), LtiKind::Discrete);
        let first = g.excite(1.0);
        assert!((first - 0.1).abs() < 1e-12);
        let mut y = 0.0;
        for _ in 0..500 {
            y = g.excite(1.0);
        }
        assert!((y - 0.6 / 0.17).abs() < 1e-9, "y={y}");
        g.set_saturation(0.0, 1.0).unwrap();
        assert_eq!(g.excite(1.0), 1.0);
        assert_eq!(g.set_saturation(1.0, 1.0), Err(SetupError::InvalidLimits));
    }

    #[test]
    fn transport_delay_in_samples() {
        let mut g: DiscreteSystem<1, 2> = DiscreteSystem::new(&[1.0], &[1.0]).unwrap();
        let out: [f64; 4] = core::array::from_fn(|k| g.excite(k as f64 + 1.0));
        assert_eq!(out, [0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn rejects_bad_setup() {
        let mut g: DiscreteSystem<2> = DiscreteSystem::default();
        assert!(!g.is_initialized());
        assert_eq!(g.excite(1.0), 0.0);
        assert_eq!(g.setup(&[1.0], &[0.0, 1.0]), Err(SetupError::ZeroLeadingCoefficient));
        assert!(matches!(
            ContinuousSystem::<2>::new(&[1.0], &[1.0, 1.0], 0.1),
            Err(SetupError::LengthMismatch(2, 3))
        ));
        assert_eq!(
            ContinuousSystem::<1>::new(&[1.0], &[1.0, 1.0], 0.0).err(),
            Some(SetupError::InvalidTimeStep)
        );
    }
}
