#![cfg_attr(not(feature = "std"), no_std)]
//! qlibs core: no_std-ready numeric and control building blocks.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and route transcendentals through `libm`
//! - `micromath`: `micromath` (f32) backend for very small targets
//! - `fast-math`: route transcendentals through the crate's [`ffmath`] approximations
//! - `simd`     : `wide`-based dot products in the FIR/LTI hot path
//!
//! Modules
//! - Numerics  : [`backend`], [`mathex`], [`ffmath`], [`fp16`], [`numa`], [`tdl`], [`mat`], [`algorithm`]
//! - Signals   : [`smoother`], [`rms`], [`interp1`], [`ltisys`]
//! - Control   : [`pid`], [`fis`]
//! - Data      : [`crc`], [`bitfield`]
//!
//! Design
//! - No heap allocations: storage is sized with const generics or borrowed
//! - Setup calls validate and return [`error`] types; per-sample calls never fail
//! - Friendly to embedded / real-time targets

pub mod algorithm;
pub mod backend;
pub mod bitfield;
pub mod crc;
pub mod error;
pub mod ffmath;
pub mod fis;
pub mod fp16;
pub mod interp1;
pub mod ltisys;
pub mod mat;
pub mod mathex;
pub mod numa;
pub mod pid;
pub mod rms;
pub mod smoother;
pub mod tdl;

/// Commonly used types for convenience:
pub mod prelude {
    pub use crate::bitfield::BitField;
    pub use crate::crc::{Crc, CrcParams, Preset};
    pub use crate::error::{BitFieldError, FisError, SetupError};
    pub use crate::fis::{DefuzzMethod, Fis, FisParameter, FisType, FuzzyOp, MfShape, Rule};
    pub use crate::fp16::Fp16;
    pub use crate::interp1::{Interp1, Interp1Method};
    pub use crate::ltisys::{ContinuousSystem, DiscreteSystem, LtiKind, LtiSystem};
    pub use crate::mat::Mat;
    pub use crate::numa::{IntegrationMethod, NumaState};
    pub use crate::pid::{PidController, PidDirection, PidGains, PidMode};
    pub use crate::rms::Rms;
    pub use crate::smoother::{
        Alnf, Desf, Expw, Gmwf, Klmn, Lpf1, Lpf2, Mor1, Mor2, Mwm1, Mwm2, Smoother,
    };
    pub use crate::tdl::Tdl;
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let mut lpf = Lpf1::default();
        let _ = lpf.smooth(0.5);
        let mut pid = PidController::new(1.0, 0.1, 0.0, 0.01).unwrap();
        let _ = pid.control(1.0, 0.0);
        let mut g: DiscreteSystem<2> = DiscreteSystem::new(&[0.5], &[1.0, -0.5]).unwrap();
        let _ = g.excite(1.0);
        assert_eq!(Fp16::from_int(2).to_int(), 2);
        assert_eq!(Mat::<2, 2>::identity().norm_inf(), 1.0);
    }
}
