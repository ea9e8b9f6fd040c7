//! qlibs simulation layer.
//!
//! Goals
//! - Drive the `qlibs-core` building blocks in closed loop on the host
//! - Keep the loop generic over the plant so LTI models and ad-hoc closures share one driver
//! - Report every run through `tracing` so the CLI can dial verbosity up or down
//!
//! Contents
//! - [`plant`]     : the [`Plant`] trait, blanket support for any `LtiSystem`, closure plants
//! - [`sim`]       : [`Simulator`] with optional measurement noise, [`SimConfig`], [`Sample`]
//! - [`scenarios`] : PID step response, the fuzzy tipper, smoothing of a series
//! - [`error`]     : [`SimError`]

pub mod error;
pub mod plant;
pub mod scenarios;
pub mod sim;

pub use error::SimError;
pub use plant::{FnPlant, Plant};
pub use scenarios::{
    make_filter, smooth_series, step_response, tipper, FilterKind, StepConfig, StepResponse,
};
pub use sim::{Sample, SimConfig, Simulator};

/// Re-export so downstream users only need one dependency.
pub use qlibs_core;
