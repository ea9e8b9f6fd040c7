//! Error types shared across the crate.
//!
//! Everything here is `no_std` friendly: `thiserror` is pulled without default
//! features, so the derived impls target `core::error::Error`.

use thiserror::Error;

/// Rejected configuration of a filter, controller, system or inference engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    #[error("parameter `{name}` out of range")]
    OutOfRange { name: &'static str },
    #[error("time step must be strictly positive")]
    InvalidTimeStep,
    #[error("leading denominator coefficient must be non-zero")]
    ZeroLeadingCoefficient,
    #[error("coefficient slice holds {got} values, at most {max} are supported")]
    TooManyCoefficients { got: usize, max: usize },
    #[error("lower limit must be strictly below the upper limit")]
    InvalidLimits,
    #[error("input vectors differ in length ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("at least {0} points are required")]
    NotEnoughPoints(usize),
    #[error("object used before a successful setup")]
    NotInitialized,
}

/// Out-of-range access on a [`crate::bitfield::BitField`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitFieldError {
    #[error("bit index {index} beyond field of {len} bits")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("width {0} not in 1..=32")]
    InvalidWidth(usize),
}

/// Errors raised by [`crate::fis::Fis`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FisError {
    #[error("input tag {0} does not exist")]
    UnknownInput(usize),
    #[error("output tag {0} does not exist")]
    UnknownOutput(usize),
    #[error("membership function tag {0} does not exist")]
    UnknownMembership(usize),
    #[error("rule {0} references a missing input/output or membership function")]
    InvalidRule(usize),
    #[error("defuzzification method does not match the system type")]
    InvalidDefuzzMethod,
    #[error("membership shape does not fit the system type")]
    InvalidShape,
    #[error(transparent)]
    Setup(#[from] SetupError),
}
