//! Ready-made runs used by the CLI and the integration tests.
//!
//! Contents
//! - `step_response` : PID on a continuous transfer function of order 1..=8
//! - `tipper`        : the classic two-input Mamdani tipping system
//! - `smooth_series` / `make_filter` : run any [`Smoother`] over a series

use qlibs_core::error::{FisError, SetupError};
use qlibs_core::fis::{Fis, FisType, MfShape, Rule};
use qlibs_core::fis_rules;
use qlibs_core::ltisys::ContinuousSystem;
use qlibs_core::pid::{PidController, PidGains};
use qlibs_core::smoother::{
    Alnf, Desf, Expw, Gmwf, Klmn, Lpf1, Lpf2, Mor1, Mor2, Mwm1, Mwm2, Smoother,
};
use tracing::{debug, info};

use crate::error::SimError;
use crate::sim::{Sample, SimConfig, Simulator};

// ----------------------------- Step response -----------------------------

/// PID loop around `num(s)/den(s)`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepConfig {
    pub num: Vec<f64>,
    pub den: Vec<f64>,
    pub gains: PidGains,
    /// Controller output limits.
    pub limits: (f64, f64),
    /// `Some(n)`: identify the plant and retune after `n` steps.
    /// `Some(0)` keeps estimating without retuning.
    pub auto_tune: Option<u32>,
    pub sim: SimConfig,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            num: vec![1.0],
            den: vec![1.0, 1.0],
            gains: PidGains { kc: 2.0, ki: 1.0, kd: 0.0 },
            limits: (-100.0, 100.0),
            auto_tune: None,
            sim: SimConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepResponse {
    pub samples: Vec<Sample>,
    /// Gains at the end of the run (differs from the initial ones after auto-tuning).
    pub gains: PidGains,
    /// Identified `(gain, time constant)` when auto-tuning was on.
    pub model: Option<(f64, f64)>,
}

impl StepResponse {
    pub fn final_output(&self) -> Option<f64> {
        self.samples.last().map(|s| s.y)
    }

    /// Largest measured output.
    pub fn peak(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.y).reduce(f64::max)
    }

    /// Peak above the final setpoint, relative to it. `None` for an empty run
    /// or a zero setpoint.
    pub fn overshoot(&self) -> Option<f64> {
        let w = self.samples.last()?.w;
        if w == 0.0 {
            return None;
        }
        Some(((self.peak()? - w) / w).max(0.0))
    }
}

/// Simulate the closed loop described by `cfg`. The plant order is
/// `den.len() - 1` and must lie in `1..=8`.
pub fn step_response(cfg: &StepConfig) -> Result<StepResponse, SimError> {
    let order = cfg.den.len().saturating_sub(1);
    info!(order, kc = cfg.gains.kc, ki = cfg.gains.ki, kd = cfg.gains.kd, "step response");
    match order {
        1 => run_order::<1>(cfg),
        2 => run_order::<2>(cfg),
        3 => run_order::<3>(cfg),
        4 => run_order::<4>(cfg),
        5 => run_order::<5>(cfg),
        6 => run_order::<6>(cfg),
        7 => run_order::<7>(cfg),
        8 => run_order::<8>(cfg),
        n => Err(SimError::UnsupportedOrder(n)),
    }
}

fn run_order<const N: usize>(cfg: &StepConfig) -> Result<StepResponse, SimError> {
    let dt = cfg.sim.dt;
    let plant: ContinuousSystem<N> = ContinuousSystem::new(&cfg.num, &cfg.den, dt)?;
    let mut pid = PidController::from_gains(cfg.gains, dt)?;
    pid.set_saturation(cfg.limits.0, cfg.limits.1)?;
    if let Some(n) = cfg.auto_tune {
        pid.enable_auto_tuning(Some(n));
    }
    let mut sim = Simulator::from_config(plant, &cfg.sim)?;
    let samples = sim.run_closed_loop(&mut pid, cfg.sim.setpoint, cfg.sim.steps);
    let model = pid.auto_tuning_model();
    if let Some((k, tau)) = model {
        debug!(k, tau, "identified first-order model");
    }
    Ok(StepResponse { samples, gains: pid.gains(), model })
}

// ----------------------------- Tipper -----------------------------

const SERVICE: usize = 0;
const FOOD: usize = 1;
const TIP: usize = 0;

const POOR: usize = 0;
const GOOD: usize = 1;
const EXCELLENT: usize = 2;
const RANCID: usize = 3;
const DELICIOUS: usize = 4;

const CHEAP: usize = 0;
const AVERAGE: usize = 1;
const GENEROUS: usize = 2;

static TIPPER_RULES: [Rule<'static>; 3] = fis_rules! {
    IF SERVICE IS POOR OR FOOD IS RANCID THEN TIP IS CHEAP END
    IF SERVICE IS GOOD THEN TIP IS AVERAGE END
    IF SERVICE IS EXCELLENT OR FOOD IS DELICIOUS THEN TIP IS GENEROUS END
};

/// Tip percentage (0..30) for service and food scores in 0..10. Scores
/// outside that range are clamped.
pub fn tipper(service: f64, food: f64) -> Result<f64, FisError> {
    let mut f: Fis<'static, 2, 1, 5, 3, 3> = Fis::new(FisType::Mamdani, &TIPPER_RULES)?;
    f.setup_input(SERVICE, 0.0, 10.0)?;
    f.setup_input(FOOD, 0.0, 10.0)?;
    f.setup_output(TIP, 0.0, 30.0)?;
    f.set_input_mf(POOR, SERVICE, MfShape::Gauss(1.5, 0.0), 1.0)?;
    f.set_input_mf(GOOD, SERVICE, MfShape::Gauss(1.5, 5.0), 1.0)?;
    f.set_input_mf(EXCELLENT, SERVICE, MfShape::Gauss(1.5, 10.0), 1.0)?;
    f.set_input_mf(RANCID, FOOD, MfShape::Trap(0.0, 0.0, 1.0, 3.0), 1.0)?;
    f.set_input_mf(DELICIOUS, FOOD, MfShape::Trap(7.0, 9.0, 10.0, 10.0), 1.0)?;
    f.set_output_mf(CHEAP, TIP, MfShape::Tri(0.0, 5.0, 10.0), 1.0)?;
    f.set_output_mf(AVERAGE, TIP, MfShape::Tri(10.0, 15.0, 20.0), 1.0)?;
    f.set_output_mf(GENEROUS, TIP, MfShape::Tri(20.0, 25.0, 30.0), 1.0)?;

    f.set_input(SERVICE, service)?;
    f.set_input(FOOD, food)?;
    f.fuzzify();
    let fired = f.inference()?;
    f.defuzzify();
    let tip = f.output(TIP)?;
    debug!(service, food, fired, tip, "tipper");
    Ok(tip)
}

// ----------------------------- Smoothing -----------------------------

/// Window length used by the windowed filters built with [`make_filter`].
pub const FILTER_WINDOW: usize = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Lpf1,
    Lpf2,
    Mwm1,
    Mwm2,
    Mor1,
    Mor2,
    Gmwf,
    Expw,
    Klmn,
    Desf,
    Alnf,
}

impl FilterKind {
    pub const ALL: [FilterKind; 11] = [
        Self::Lpf1,
        Self::Lpf2,
        Self::Mwm1,
        Self::Mwm2,
        Self::Mor1,
        Self::Mor2,
        Self::Gmwf,
        Self::Expw,
        Self::Klmn,
        Self::Desf,
        Self::Alnf,
    ];
}

/// A filter of the given kind with default tuning, boxed behind the
/// object-safe [`Smoother`] trait.
#[allow(clippy::cast_precision_loss)]
pub fn make_filter(kind: FilterKind) -> Result<Box<dyn Smoother>, SetupError> {
    const N: usize = FILTER_WINDOW;
    Ok(match kind {
        FilterKind::Lpf1 => Box::new(Lpf1::new(0.9)?),
        FilterKind::Lpf2 => Box::new(Lpf2::new(0.9)?),
        FilterKind::Mwm1 => Box::new(Mwm1::<N>::new()),
        FilterKind::Mwm2 => Box::new(Mwm2::<N>::new()),
        FilterKind::Mor1 => Box::new(Mor1::<N>::new(0.8)?),
        FilterKind::Mor2 => Box::new(Mor2::<N>::new(0.8)?),
        FilterKind::Gmwf => Box::new(Gmwf::<N>::new(0.5, (N / 2) as f64)?),
        FilterKind::Expw => Box::new(Expw::new(0.8)?),
        FilterKind::Klmn => Box::new(Klmn::new(1.0, 1e-3, 0.1)?),
        FilterKind::Desf => Box::new(Desf::new(0.6, 0.3, 0.0)?),
        FilterKind::Alnf => Box::new(Alnf::<N>::new(0.1, 0.05)?),
    })
}

/// Feed `data` through `filter` sample by sample.
pub fn smooth_series(filter: &mut dyn Smoother, data: &[f64]) -> Vec<f64> {
    data.iter().map(|&x| filter.smooth(x)).collect()
}
