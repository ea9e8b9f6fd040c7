//! Plants: anything that turns a control action into one output sample.
//!
//! The simulator owns a plant and calls `reset(dt)` once before the first
//! step, then `step(u)` once per sample.

use qlibs_core::ltisys::LtiSystem;

pub trait Plant {
    /// Called when a simulation (re)starts with its sample time.
    fn reset(&mut self, dt: f64);

    /// Apply `u` for one sample and return the plant output.
    fn step(&mut self, u: f64) -> f64;
}

/// Every LTI system is a plant. Its time step is fixed at setup, so `reset`
/// only clears the states and the input delay line.
impl<T: LtiSystem> Plant for T {
    fn reset(&mut self, _dt: f64) {
        if self.is_initialized() {
            // Cannot fail once the system is initialized.
            let _ = self.set_init_states(None);
        }
        self.flush_delay(0.0);
    }

    #[inline]
    fn step(&mut self, u: f64) -> f64 {
        self.excite(u)
    }
}

/// Plant backed by a closure `f(state, u, dt) -> y`. The state starts at
/// `init` and is restored on every `reset`.
#[derive(Clone, Debug)]
pub struct FnPlant<S: Clone, F> {
    init: S,
    state: S,
    dt: f64,
    f: F,
}

impl<S: Clone, F> FnPlant<S, F>
where
    F: FnMut(&mut S, f64, f64) -> f64,
{
    pub fn new(init: S, f: F) -> Self {
        Self { state: init.clone(), init, dt: 0.0, f }
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S: Clone, F> Plant for FnPlant<S, F>
where
    F: FnMut(&mut S, f64, f64) -> f64,
{
    fn reset(&mut self, dt: f64) {
        self.state = self.init.clone();
        self.dt = dt;
    }

    #[inline]
    fn step(&mut self, u: f64) -> f64 {
        (self.f)(&mut self.state, u, self.dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlibs_core::ltisys::{ContinuousSystem, DiscreteSystem};

    #[test]
    fn lti_plant_reset_clears_states() {
        let mut g: DiscreteSystem<2> = DiscreteSystem::new(&[0.5], &[1.0, -0.5]).unwrap();
        Plant::reset(&mut g, 0.1);
        let first = Plant::step(&mut g, 1.0);
        for _ in 0..10 {
            Plant::step(&mut g, 1.0);
        }
        Plant::reset(&mut g, 0.1);
        assert_eq!(Plant::step(&mut g, 1.0), first);
    }

    #[test]
    fn continuous_plant_settles_to_dc_gain() {
        let mut g: ContinuousSystem<1> = ContinuousSystem::new(&[2.0], &[1.0, 1.0], 0.01).unwrap();
        g.reset(0.01);
        let mut y = 0.0;
        for _ in 0..2000 {
            y = g.step(1.0);
        }
        assert!((y - 2.0).abs() < 1e-2, "y={y}");
    }

    #[test]
    fn closure_plant_integrates_with_dt() {
        let mut p = FnPlant::new(0.0, |x: &mut f64, u, dt| {
            *x += u * dt;
            *x
        });
        p.reset(0.5);
        p.step(1.0);
        assert_eq!(p.step(1.0), 1.0);
        p.reset(0.5);
        assert_eq!(*p.state(), 0.0);
    }
}
