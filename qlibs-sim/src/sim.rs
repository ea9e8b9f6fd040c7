//! Closed-loop driver.
//!
//! `Simulator<P>` owns a [`Plant`], the sample time and the elapsed time.
//! It is generic over the plant so the per-sample path stays monomorphic;
//! allocation only happens when collecting [`Sample`]s.
//!
//! Notes
//! - Measurement noise is uniform in `[-a, a]` and only affects what the
//!   controller sees, never the plant state.
//! - A fixed seed makes noisy runs reproducible.

use qlibs_core::error::SetupError;
use qlibs_core::pid::PidController;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::error::SimError;
use crate::plant::Plant;

/// Plain simulation parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub dt: f64,
    pub steps: usize,
    pub setpoint: f64,
    /// Amplitude of the uniform measurement noise; `0` disables it.
    pub noise: f64,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { dt: 0.01, steps: 1000, setpoint: 1.0, noise: 0.0, seed: None }
    }
}

/// One closed-loop sample: time, reference, control action, measured output.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub w: f64,
    pub u: f64,
    pub y: f64,
}

#[derive(Clone, Debug)]
struct Noise {
    amplitude: f64,
    rng: StdRng,
}

#[derive(Clone, Debug)]
pub struct Simulator<P: Plant> {
    plant: P,
    dt: f64,
    t: f64,
    steps: u64,
    y: f64,
    noise: Option<Noise>,
}

impl<P: Plant> Simulator<P> {
    /// Takes ownership of `plant` and resets it with `dt`.
    pub fn new(mut plant: P, dt: f64) -> Result<Self, SimError> {
        if !(dt > 0.0) {
            return Err(SetupError::InvalidTimeStep.into());
        }
        plant.reset(dt);
        Ok(Self { plant, dt, t: 0.0, steps: 0, y: 0.0, noise: None })
    }

    /// Add uniform measurement noise of the given amplitude. Without a seed
    /// the generator is seeded from the OS.
    pub fn with_noise(mut self, amplitude: f64, seed: Option<u64>) -> Result<Self, SimError> {
        if !(amplitude >= 0.0) || !amplitude.is_finite() {
            return Err(SimError::InvalidConfig("noise amplitude must be finite and >= 0"));
        }
        self.noise = (amplitude > 0.0).then(|| Noise {
            amplitude,
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        });
        Ok(self)
    }

    /// Build from a [`SimConfig`]: time step, noise and seed.
    pub fn from_config(plant: P, cfg: &SimConfig) -> Result<Self, SimError> {
        Self::new(plant, cfg.dt)?.with_noise(cfg.noise, cfg.seed)
    }

    /// Apply `u` for one sample; returns the measured output.
    pub fn step(&mut self, u: f64) -> f64 {
        let y = self.plant.step(u);
        self.t += self.dt;
        self.steps += 1;
        self.y = match self.noise.as_mut() {
            Some(n) => y + n.rng.gen_range(-n.amplitude..=n.amplitude),
            None => y,
        };
        self.y
    }

    /// Regulate towards a constant setpoint.
    pub fn run_closed_loop(&mut self, pid: &mut PidController, setpoint: f64, steps: usize) -> Vec<Sample> {
        self.run_profile(pid, |_| setpoint, steps)
    }

    /// Regulate towards `reference(t)`, evaluated at the start of each sample.
    pub fn run_profile<F>(&mut self, pid: &mut PidController, mut reference: F, steps: usize) -> Vec<Sample>
    where
        F: FnMut(f64) -> f64,
    {
        info!(steps, dt = self.dt, t0 = self.t, "closed-loop run started");
        let mut tuned = pid.auto_tuning_complete();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            let w = reference(self.t);
            let u = pid.control(w, self.y);
            let y = self.step(u);
            trace!(t = self.t, w, u, y, "sample");
            if !tuned && pid.auto_tuning_complete() {
                tuned = true;
                let g = pid.gains();
                debug!(t = self.t, kc = g.kc, ki = g.ki, kd = g.kd, "auto-tuning complete");
            }
            out.push(Sample { t: self.t, w, u, y });
        }
        info!(steps = self.steps, t = self.t, y = self.y, "closed-loop run finished");
        out
    }

    /// Reset the plant and the clock.
    pub fn restart(&mut self) {
        self.plant.reset(self.dt);
        self.t = 0.0;
        self.steps = 0;
        self.y = 0.0;
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.t
    }

    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    #[inline]
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Last measured output.
    #[inline]
    pub fn output(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn plant(&self) -> &P {
        &self.plant
    }

    #[inline]
    pub fn plant_mut(&mut self) -> &mut P {
        &mut self.plant
    }

    pub fn into_plant(self) -> P {
        self.plant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::FnPlant;
    use qlibs_core::ltisys::ContinuousSystem;

    fn lag() -> ContinuousSystem<1> {
        ContinuousSystem::new(&[1.0], &[1.0, 1.0], 0.01).unwrap()
    }

    #[test]
    fn rejects_bad_settings() {
        assert_eq!(Simulator::new(lag(), 0.0).err(), Some(SimError::Setup(SetupError::InvalidTimeStep)));
        let sim = Simulator::new(lag(), 0.01).unwrap();
        assert!(matches!(sim.with_noise(-1.0, None), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn clock_advances_per_step() {
        let mut sim = Simulator::new(FnPlant::new((), |_: &mut (), u, _| u), 0.25).unwrap();
        assert_eq!(sim.step(3.0), 3.0);
        sim.step(1.0);
        assert_eq!(sim.step_count(), 2);
        assert_eq!(sim.time(), 0.5);
        sim.restart();
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.output(), 0.0);
    }

    #[test]
    fn pi_loop_removes_steady_state_error() {
        let mut sim = Simulator::new(lag(), 0.01).unwrap();
        let mut pid = PidController::new(2.0, 1.0, 0.0, 0.01).unwrap();
        pid.set_saturation(-10.0, 10.0).unwrap();
        let samples = sim.run_closed_loop(&mut pid, 1.0, 3000);
        assert_eq!(samples.len(), 3000);
        assert!((samples[0].t - 0.01).abs() < 1e-12);
        let last = samples.last().unwrap();
        assert!((last.y - 1.0).abs() < 1e-2, "y={}", last.y);
        assert!((sim.time() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn seeded_noise_is_bounded_and_reproducible() {
        let run = || {
            let plant = FnPlant::new((), |_: &mut (), _, _| 5.0);
            let mut sim = Simulator::new(plant, 0.1).unwrap().with_noise(0.5, Some(7)).unwrap();
            (0..200).map(|_| sim.step(0.0)).collect::<Vec<_>>()
        };
        let a = run();
        assert_eq!(a, run());
        assert!(a.iter().all(|y| (y - 5.0).abs() <= 0.5));
        assert!(a.iter().any(|&y| y != 5.0));
    }

    #[test]
    fn reference_profile_is_sampled_per_step() {
        let plant = FnPlant::new((), |_: &mut (), u, _| u);
        let mut sim = Simulator::new(plant, 1.0).unwrap();
        let mut pid = PidController::new(1.0, 0.0, 0.0, 1.0).unwrap();
        let s = sim.run_profile(&mut pid, |t| if t < 2.0 { 0.0 } else { 1.0 }, 4);
        let w: Vec<f64> = s.iter().map(|x| x.w).collect();
        assert_eq!(w, [0.0, 0.0, 1.0, 1.0]);
    }
}
