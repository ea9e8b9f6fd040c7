use qlibs_sim::qlibs_core::ltisys::{DiscreteSystem, LtiSystem};
use qlibs_sim::qlibs_core::pid::PidController;
use qlibs_sim::{make_filter, smooth_series, tipper, FilterKind, SimConfig, Simulator};

#[test]
fn discrete_plant_under_pi_control() {
    // y[k] = 0.9 y[k-1] + 0.1 u[k-1]
    let plant: DiscreteSystem<2> = DiscreteSystem::new(&[0.0, 0.1], &[1.0, -0.9]).unwrap();
    let cfg = SimConfig { dt: 0.1, steps: 600, setpoint: 2.0, ..SimConfig::default() };
    let mut sim = Simulator::from_config(plant, &cfg).unwrap();
    let mut pid = PidController::new(1.0, 0.5, 0.0, cfg.dt).unwrap();
    let out = sim.run_closed_loop(&mut pid, cfg.setpoint, cfg.steps);
    let y = out.last().unwrap().y;
    assert!((y - 2.0).abs() < 1e-2, "y={y}");
    assert!(sim.plant().is_initialized());
}

#[test]
fn noisy_run_stays_near_setpoint() {
    let plant: DiscreteSystem<2> = DiscreteSystem::new(&[0.0, 0.1], &[1.0, -0.9]).unwrap();
    let cfg = SimConfig { dt: 0.1, steps: 800, setpoint: 1.0, noise: 0.05, seed: Some(42) };
    let mut sim = Simulator::from_config(plant, &cfg).unwrap();
    let mut pid = PidController::new(1.0, 0.5, 0.0, cfg.dt).unwrap();
    let out = sim.run_closed_loop(&mut pid, cfg.setpoint, cfg.steps);
    let tail = &out[700..];
    let mean = tail.iter().map(|s| s.y).sum::<f64>() / tail.len() as f64;
    assert!((mean - 1.0).abs() < 0.1, "mean={mean}");
}

#[test]
fn tip_grows_with_service() {
    let low = tipper(2.0, 5.0).unwrap();
    let mid = tipper(5.0, 5.0).unwrap();
    let high = tipper(9.0, 5.0).unwrap();
    assert!(low < mid && mid < high, "{low} {mid} {high}");
}

#[test]
fn kalman_reduces_spread() {
    let noisy: Vec<f64> = (0..200).map(|i| 1.0 + if i % 3 == 0 { 0.3 } else { -0.15 }).collect();
    let mut f = make_filter(FilterKind::Klmn).unwrap();
    let out = smooth_series(f.as_mut(), &noisy);
    let spread = |v: &[f64]| v.iter().cloned().fold(f64::MIN, f64::max) - v.iter().cloned().fold(f64::MAX, f64::min);
    assert!(spread(&out[100..]) < spread(&noisy[100..]));
}
