//! Running RMS estimate.
//!
//! `x² → Expw → sqrt → Mwm2<N> → Lpf1`. The exponential stage gives the
//! mean square, the window and low-pass stages take the ripple out.

use crate::backend;
use crate::error::SetupError;
use crate::smoother::{Expw, Lpf1, Mwm2, Smoother};

#[derive(Copy, Clone, Debug)]
pub struct Rms<const N: usize> {
    expw: Expw,
    mwm: Mwm2<N>,
    lpf: Lpf1,
}

impl<const N: usize> Default for Rms<N> {
    fn default() -> Self {
        let mut expw = Expw::default();
        expw.lambda = 0.99;
        let mut lpf = Lpf1::default();
        lpf.alpha = 0.75;
        Self { expw, mwm: Mwm2::new(), lpf }
    }
}

impl<const N: usize> Rms<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgetting factor of the mean-square stage and smoothing factor of
    /// the output low-pass, both in (0, 1].
    pub fn set_params(&mut self, lambda: f64, alpha: f64) -> Result<(), SetupError> {
        let in_range = |v: f64| v > 0.0 && v <= 1.0;
        if !in_range(lambda) {
            return Err(SetupError::OutOfRange { name: "lambda" });
        }
        if !in_range(alpha) {
            return Err(SetupError::OutOfRange { name: "alpha" });
        }
        self.expw.lambda = lambda;
        self.lpf.alpha = alpha;
        Ok(())
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let y = backend::sqrt(self.expw.smooth(x * x));
        let y = self.mwm.smooth(y);
        self.lpf.smooth(y)
    }

    pub fn reset(&mut self) {
        self.expw.reset();
        self.mwm.reset();
        self.lpf.reset();
    }
}
