//! PID controller with anti-windup, bumpless transfer, an optional
//! model-reference adaptive term and on-line auto-tuning.
//!
//! Control law (per call, sample time `dt`):
//! ```text
//! e  = w - y                      (0 inside the ±epsilon dead band)
//! ie = ∫ (e + u1) dt              u1 = kw·(u - v) is the back-calculation term
//! D  = de + β·(D - de)            de = d(c·w - y)/dt
//! v  = kc·(b·w - y) + ki·ie + kd·D [+ w·θ when MRAC is enabled]
//! u  = sat(v) in automatic mode, sat(m) in manual mode
//! ```
//! Manual mode follows a tracking integrator `m`:
//! `dm/dt = kt·manual_input + kw·(u - m)`, so the manual input acts as a
//! rate and `m` keeps following the output while in automatic mode.
//!
//! Auto-tuning identifies a first-order plant `y[k] = b1·u[k-1] - a1·y[k-1]`
//! with recursive least squares and derives new gains from the estimated
//! gain/time constant once the requested number of valid steps elapsed.

use crate::backend;
use crate::error::SetupError;
use crate::numa::NumaState;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PidMode {
    #[default]
    Automatic,
    Manual,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PidDirection {
    #[default]
    Forward,
    /// Every positive gain is negated inside the control law.
    Backward,
}

/// Parallel-form gains.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PidGains {
    pub kc: f64,
    pub ki: f64,
    pub kd: f64,
}

// ----------------------------- Auto-tuning -----------------------------

#[derive(Copy, Clone, Debug)]
struct AutoTuner {
    p00: f64,
    p01: f64,
    p10: f64,
    p11: f64,
    b1: f64,
    a1: f64,
    uk: f64,
    yk: f64,
    lambda: f64,
    k: f64,
    tau: f64,
    mu: f64,
    speed: f64,
    // `None`: estimate only, never apply
    countdown: Option<u32>,
}

impl AutoTuner {
    fn seeded(g: PidGains, dt: f64) -> Self {
        let k = g.kc / 0.9;
        let t = (0.27 * k) / g.ki;
        let a1 = -backend::exp(-dt / t);
        Self {
            p00: 1000.0,
            p01: 0.0,
            p10: 0.0,
            p11: 1000.0,
            b1: k * (1.0 + a1),
            a1,
            uk: 0.0,
            yk: 0.0,
            lambda: 0.9898,
            k: 0.0,
            tau: 0.0,
            mu: 0.95,
            speed: 0.25,
            countdown: None,
        }
    }

    #[inline]
    fn valid(x: f64) -> bool {
        x.is_finite() && x > 0.0
    }

    /// One RLS update; `true` when the countdown just reached zero.
    fn step(&mut self, u: f64, y: f64, dt: f64) -> bool {
        let (uk, yk) = (self.uk, self.yk);
        let t1 = self.p00 * uk;
        let t2 = self.p11 * yk;
        let r = self.lambda + uk * (t1 - self.p10 * yk) - yk * (self.p01 * uk - t2);
        let l0 = (t1 - self.p01 * yk) / r;
        let l1 = (self.p10 * uk - t2) / r;
        let err = y - (self.b1 * uk - self.a1 * yk);
        self.b1 += l0 * err;
        self.a1 += l1 * err;

        let il = 1.0 / self.lambda;
        let (lp00, lp01, lp10, lp11) = (il * self.p00, il * self.p01, il * self.p10, il * self.p11);
        let t1 = l0 * uk - 1.0;
        let t2 = l1 * yk + 1.0;
        self.p00 = l0 * lp10 * yk - lp00 * t1 + 1e-10;
        self.p01 = l0 * lp11 * yk - lp01 * t1;
        self.p10 = lp10 * t2 - l1 * lp00 * uk;
        self.p11 = lp11 * t2 - l1 * lp01 * uk + 1e-10;
        self.yk = y;
        self.uk = u;

        let gain = self.b1 / (1.0 + self.a1);
        let tau = -dt / backend::ln(backend::abs(self.a1));
        // estimates freeze once the countdown has run out
        if !(Self::valid(gain) && Self::valid(tau)) || self.countdown == Some(0) {
            return false;
        }
        self.k = gain + self.mu * (self.k - gain);
        self.tau = tau + self.mu * (self.tau - tau);
        match &mut self.countdown {
            Some(n) if *n > 0 => {
                *n -= 1;
                *n == 0
            }
            _ => false,
        }
    }

    fn estimates(&self, dt: f64) -> PidGains {
        let t1 = dt / self.tau;
        let t2 = 1.35 + 0.25 * t1;
        let kc = (self.speed * t2 * self.tau) / (self.k * dt);
        let ki = ((self.speed * kc) * (0.54 + 0.33 * t1)) / (t2 * dt);
        let kd = (0.5 * self.speed * kc * dt) / t2;
        PidGains { kc, ki, kd }
    }
}

// ----------------------------- Controller -----------------------------

#[derive(Copy, Clone, Debug)]
struct Mrac {
    gamma: f64,
    alpha: f64,
}

#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    b: f64,
    c: f64,
    min: f64,
    max: f64,
    epsilon: f64,
    kw: f64,
    kt: f64,
    beta: f64,
    dt: f64,
    d: f64,
    u1: f64,
    u: f64,
    m: f64,
    manual_input: f64,
    i_state: NumaState,
    d_state: NumaState,
    b_state: NumaState,
    theta: NumaState,
    mrac: Option<Mrac>,
    tuner: Option<AutoTuner>,
    mode: PidMode,
    dir: PidDirection,
}

impl PidController {
    /// Parallel gains and sample time `dt > 0`.
    ///
    /// Defaults: output limits `0..=100`, derivative filter `0.98`,
    /// `kw = kt = 1`, reference weights `b = 1`, `c = 0`, automatic mode,
    /// forward direction.
    pub fn new(kc: f64, ki: f64, kd: f64, dt: f64) -> Result<Self, SetupError> {
        if !(dt > 0.0) {
            return Err(SetupError::InvalidTimeStep);
        }
        Ok(Self {
            gains: PidGains { kc, ki, kd },
            b: 1.0,
            c: 0.0,
            min: 0.0,
            max: 100.0,
            epsilon: f64::MIN_POSITIVE,
            kw: 1.0,
            kt: 1.0,
            beta: 0.98,
            dt,
            d: 0.0,
            u1: 0.0,
            u: 0.0,
            m: 0.0,
            manual_input: 0.0,
            i_state: NumaState::default(),
            d_state: NumaState::default(),
            b_state: NumaState::default(),
            theta: NumaState::default(),
            mrac: None,
            tuner: None,
            mode: PidMode::Automatic,
            dir: PidDirection::Forward,
        })
    }

    pub fn from_gains(g: PidGains, dt: f64) -> Result<Self, SetupError> {
        Self::new(g.kc, g.ki, g.kd, dt)
    }

    #[inline]
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn set_gains(&mut self, kc: f64, ki: f64, kd: f64) {
        self.gains = PidGains { kc, ki, kd };
    }

    /// Standard form: `ki = kc/ti`, `kd = kc·td`.
    pub fn set_params(&mut self, kc: f64, ti: f64, td: f64) -> Result<(), SetupError> {
        if ti == 0.0 {
            return Err(SetupError::OutOfRange { name: "ti" });
        }
        self.gains = PidGains { kc, ki: kc / ti, kd: kc * td };
        Ok(())
    }

    /// Convert the current gains to the series (interacting) form.
    pub fn set_series(&mut self) -> Result<(), SetupError> {
        let PidGains { kc, ki, kd } = self.gains;
        if kc == 0.0 || ki == 0.0 {
            return Err(SetupError::OutOfRange { name: "gains" });
        }
        let ti = kc / ki;
        let td = kd / kc;
        let tmp = 1.0 + td / ti;
        let kc = kc * tmp;
        self.gains = PidGains { kc, ki: kc / (ti * tmp), kd: kc * (td / tmp) };
        Ok(())
    }

    /// Anti-windup gain `kw` and manual tracking gain `kt`.
    pub fn set_extra_gains(&mut self, kw: f64, kt: f64) {
        self.kw = kw;
        self.kt = kt;
    }

    /// Setpoint weights for the proportional (`b`) and derivative (`c`) paths,
    /// each clamped to `[0, 1]`.
    pub fn set_reference_weighting(&mut self, b: f64, c: f64) {
        self.b = b.clamp(0.0, 1.0);
        self.c = c.clamp(0.0, 1.0);
    }

    pub fn set_derivative_filter(&mut self, beta: f64) -> Result<(), SetupError> {
        if !(0.0..1.0).contains(&beta) {
            return Err(SetupError::OutOfRange { name: "beta" });
        }
        self.beta = beta;
        Ok(())
    }

    pub fn set_epsilon(&mut self, eps: f64) -> Result<(), SetupError> {
        if !(eps >= 0.0) {
            return Err(SetupError::OutOfRange { name: "epsilon" });
        }
        self.epsilon = eps;
        Ok(())
    }

    pub fn set_saturation(&mut self, min: f64, max: f64) -> Result<(), SetupError> {
        if !(max > min) {
            return Err(SetupError::InvalidLimits);
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    #[inline]
    pub fn set_mode(&mut self, mode: PidMode) {
        self.mode = mode;
    }

    #[inline]
    pub fn mode(&self) -> PidMode {
        self.mode
    }

    #[inline]
    pub fn set_manual_input(&mut self, v: f64) {
        self.manual_input = v;
    }

    #[inline]
    pub fn set_direction(&mut self, d: PidDirection) {
        self.dir = d;
    }

    /// Enable the additive model-reference term with adaptation gain `gamma`
    /// and normalization `alpha` (both `> 0`). Drive it with [`Self::control_mrac`].
    pub fn set_model_reference_control(&mut self, gamma: f64, alpha: f64) -> Result<(), SetupError> {
        if !(gamma > 0.0) {
            return Err(SetupError::OutOfRange { name: "gamma" });
        }
        if !(alpha > 0.0) {
            return Err(SetupError::OutOfRange { name: "alpha" });
        }
        self.theta.init(0.0, 0.0, 0.0);
        self.mrac = Some(Mrac { gamma, alpha });
        Ok(())
    }

    pub fn remove_model_reference_control(&mut self) {
        self.mrac = None;
    }

    /// Clear integrators, filters and the last output.
    pub fn reset(&mut self) {
        for s in [&mut self.i_state, &mut self.d_state, &mut self.b_state, &mut self.theta] {
            s.init(0.0, 0.0, 0.0);
        }
        self.d = 0.0;
        self.u1 = 0.0;
        self.u = 0.0;
        self.m = 0.0;
    }

    /// Control action for setpoint `w` and measurement `y`.
    pub fn control(&mut self, w: f64, y: f64) -> f64 {
        self.step(w, y, None)
    }

    /// [`Self::control`] with the model-reference output `ym`. Without
    /// [`Self::set_model_reference_control`] the reference is ignored.
    pub fn control_mrac(&mut self, w: f64, y: f64, ym: f64) -> f64 {
        self.step(w, y, Some(ym))
    }

    fn step(&mut self, w: f64, y: f64, ym: Option<f64>) -> f64 {
        let PidGains { mut kc, mut ki, mut kd } = self.gains;
        if self.dir == PidDirection::Backward {
            kc = -kc.abs();
            ki = -ki.abs();
            kd = -kd.abs();
        }
        let mut e = w - y;
        if backend::abs(e) <= self.epsilon {
            e = 0.0;
        }
        let ie = self.i_state.integrate(e + self.u1, self.dt);
        let de = self.d_state.derivative(self.c * w - y, self.dt);
        self.d = de + self.beta * (self.d - de);
        let mut v = kc * (self.b * w - y) + ki * ie + kd * self.d;

        if let (Some(mr), Some(ym)) = (self.mrac, ym) {
            // adaptation frozen while the anti-windup term is active
            let theta = if backend::abs(self.u1) <= self.epsilon {
                let em = y - ym;
                let delta = -mr.gamma * em * ym / (mr.alpha + ym * ym);
                self.theta.integrate(delta, self.dt)
            } else {
                0.0
            };
            v += w * theta;
        }

        let bt = self.kt * self.manual_input + self.kw * (self.u - self.m);
        self.m = self.b_state.integrate(bt, self.dt);
        let sw = match self.mode {
            PidMode::Automatic => v,
            PidMode::Manual => self.m,
        };
        let u = sw.clamp(self.min, self.max);
        self.u1 = self.kw * (u - v);
        self.u = u;

        if let Some(t) = self.tuner.as_mut() {
            if t.step(u, y, self.dt) {
                self.gains = t.estimates(self.dt);
            }
        }
        u
    }

    // ------------------------- auto-tuning -------------------------

    /// Start identification. `Some(n)`: apply new gains after `n` valid
    /// estimation steps. `None`: keep estimating without touching the gains.
    ///
    /// The first call seeds the estimator from the current gains.
    pub fn enable_auto_tuning(&mut self, steps: Option<u32>) {
        let (g, dt) = (self.gains, self.dt);
        let t = self.tuner.get_or_insert_with(|| AutoTuner::seeded(g, dt));
        t.countdown = steps.filter(|&n| n > 0);
    }

    pub fn disable_auto_tuning(&mut self) {
        self.tuner = None;
    }

    /// `mu`: estimate smoothing in (0, 1], `alpha`: aggressiveness of the
    /// derived gains in (0, 1], `lambda`: RLS forgetting factor in [0.8, 1].
    pub fn set_auto_tuning_parameters(&mut self, mu: f64, alpha: f64, lambda: f64) -> Result<(), SetupError> {
        let t = self.tuner.as_mut().ok_or(SetupError::NotInitialized)?;
        let unit = |v: f64| v > 0.0 && v <= 1.0;
        if !unit(mu) {
            return Err(SetupError::OutOfRange { name: "mu" });
        }
        if !unit(alpha) {
            return Err(SetupError::OutOfRange { name: "alpha" });
        }
        if !(0.8..=1.0).contains(&lambda) {
            return Err(SetupError::OutOfRange { name: "lambda" });
        }
        t.mu = mu;
        t.speed = alpha;
        t.lambda = lambda;
        Ok(())
    }

    pub fn auto_tuning_complete(&self) -> bool {
        matches!(self.tuner, Some(AutoTuner { countdown: Some(0), .. }))
    }

    /// Identified first-order model `(gain, time constant)`.
    pub fn auto_tuning_model(&self) -> Option<(f64, f64)> {
        self.tuner.as_ref().map(|t| (t.k, t.tau))
    }
}
