//! Numerical integration and differentiation over a sampled signal.
//!
//! A [`NumaState`] keeps the accumulated value plus the two previous input
//! samples, which is all the rectangular, trapezoidal and Simpson rules need.

/// Integration rule applied by [`NumaState::integrate`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IntegrationMethod {
    Rectangular,
    #[default]
    Trapezoidal,
    Simpson,
}

/// Integrator/differentiator state: `x[0]` output, `x[1]`/`x[2]` past inputs.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct NumaState {
    x: [f64; 3],
    method: IntegrationMethod,
}

impl NumaState {
    #[inline]
    pub fn new(x0: f64) -> Self {
        Self { x: [x0, 0.0, 0.0], method: IntegrationMethod::default() }
    }

    /// Set the output value and the two past inputs.
    #[inline]
    pub fn init(&mut self, x0: f64, sn_1: f64, sn_2: f64) {
        self.x = [x0, sn_1, sn_2];
    }

    #[inline]
    pub fn set_method(&mut self, m: IntegrationMethod) {
        self.method = m;
    }

    #[inline]
    pub fn method(&self) -> IntegrationMethod {
        self.method
    }

    /// Accumulate `s` over `dt` and return the running integral.
    #[inline]
    pub fn integrate(&mut self, s: f64, dt: f64) -> f64 {
        match self.method {
            IntegrationMethod::Rectangular => self.x[0] += s * dt,
            IntegrationMethod::Trapezoidal => self.x[0] += 0.5 * (s + self.x[1]) * dt,
            IntegrationMethod::Simpson => {
                self.x[0] += (1.0 / 6.0) * (s + 4.0 * self.x[1] + self.x[2]) * dt;
            }
        }
        self.push(s);
        self.x[0]
    }

    /// Backward difference `(s - s[k-1]) / dt`.
    #[inline]
    pub fn derivative(&mut self, s: f64, dt: f64) -> f64 {
        self.x[0] = (s - self.x[1]) / dt;
        self.push(s);
        self.x[0]
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.x[0]
    }

    #[inline]
    pub(crate) fn set_value(&mut self, v: f64) {
        self.x[0] = v;
    }

    #[inline]
    fn push(&mut self, s: f64) {
        self.x[2] = self.x[1];
        self.x[1] = s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapezoidal_integrates_ramp_exactly() {
        let dt = 0.01;
        let mut st = NumaState::new(0.0);
        let mut y = 0.0;
        for k in 0..=100 {
            y = st.integrate(f64::from(k) * dt, dt);
        }
        // ∫0..1 t dt = 0.5
        assert!((y - 0.5).abs() < 1e-9, "y={}", y);
    }

    #[test]
    fn rectangular_sums_samples() {
        let mut st = NumaState::default();
        st.set_method(IntegrationMethod::Rectangular);
        for _ in 0..10 {
            st.integrate(2.0, 0.5);
        }
        assert!((st.value() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn derivative_of_ramp_is_slope() {
        let mut st = NumaState::default();
        let mut d = 0.0;
        for k in 0..10 {
            d = st.derivative(3.0 * f64::from(k) * 0.1, 0.1);
        }
        assert!((d - 3.0).abs() < 1e-9, "d={}", d);
    }
}
