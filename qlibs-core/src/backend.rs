//! Math backend selection shared by every module of the crate.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - One place that decides where `exp`, `sqrt`, `ln`, ... come from
//! - `f64` everywhere; reduced-precision backends widen their results back
//!
//! Priority:
//! - `fast-math` : the crate's own bit-trick approximations in [`crate::ffmath`]
//! - `micromath` : f32 approximations from `micromath`
//! - `no-std`    : `libm`
//! - otherwise   : the standard library
//!
//! Conventions:
//! - Modules never call `f64::exp` & co. directly, they go through here.
//! - `abs`, `floor` and `round` are provided too since they are not in `core`
//!   on the supported toolchain.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    if #[cfg(feature = "fast-math")] {
        use crate::ffmath;
        #[inline] pub fn sin(x: f64) -> f64 { f64::from(ffmath::sin(x as f32)) }
        #[inline] pub fn cos(x: f64) -> f64 { f64::from(ffmath::cos(x as f32)) }
        #[inline] pub fn exp(x: f64) -> f64 { f64::from(ffmath::exp(x as f32)) }
        #[inline] pub fn ln(x: f64) -> f64 { f64::from(ffmath::log(x as f32)) }
        #[inline] pub fn sqrt(x: f64) -> f64 { f64::from(ffmath::sqrt(x as f32)) }
        #[inline] pub fn atan(x: f64) -> f64 { f64::from(ffmath::atan(x as f32)) }
        #[inline] pub fn powf(x: f64, y: f64) -> f64 { f64::from(ffmath::pow(x as f32, y as f32)) }
    } else if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] pub fn sin(x: f64) -> f64 { f64::from((x as f32).sin()) }
        #[inline] pub fn cos(x: f64) -> f64 { f64::from((x as f32).cos()) }
        #[inline] pub fn exp(x: f64) -> f64 { f64::from((x as f32).exp()) }
        #[inline] pub fn ln(x: f64) -> f64 { f64::from((x as f32).ln()) }
        #[inline] pub fn sqrt(x: f64) -> f64 { f64::from((x as f32).sqrt()) }
        #[inline] pub fn atan(x: f64) -> f64 { f64::from((x as f32).atan()) }
        #[inline] pub fn powf(x: f64, y: f64) -> f64 { f64::from((x as f32).powf(y as f32)) }
    } else if #[cfg(feature = "no-std")] {
        #[inline] pub fn sin(x: f64) -> f64 { libm::sin(x) }
        #[inline] pub fn cos(x: f64) -> f64 { libm::cos(x) }
        #[inline] pub fn exp(x: f64) -> f64 { libm::exp(x) }
        #[inline] pub fn ln(x: f64) -> f64 { libm::log(x) }
        #[inline] pub fn sqrt(x: f64) -> f64 { libm::sqrt(x) }
        #[inline] pub fn atan(x: f64) -> f64 { libm::atan(x) }
        #[inline] pub fn powf(x: f64, y: f64) -> f64 { libm::pow(x, y) }
    } else {
        #[inline] pub fn sin(x: f64) -> f64 { x.sin() }
        #[inline] pub fn cos(x: f64) -> f64 { x.cos() }
        #[inline] pub fn exp(x: f64) -> f64 { x.exp() }
        #[inline] pub fn ln(x: f64) -> f64 { x.ln() }
        #[inline] pub fn sqrt(x: f64) -> f64 { x.sqrt() }
        #[inline] pub fn atan(x: f64) -> f64 { x.atan() }
        #[inline] pub fn powf(x: f64, y: f64) -> f64 { x.powf(y) }
    }
}

// --------------------------------- Exact helpers ---------------------------------

#[inline]
pub fn abs(x: f64) -> f64 {
    f64::from_bits(x.to_bits() & !(1u64 << 63))
}

#[inline]
pub fn floor(x: f64) -> f64 {
    let t = trunc(x);
    if t > x { t - 1.0 } else { t }
}

/// Round half away from zero.
#[inline]
pub fn round(x: f64) -> f64 {
    if x < 0.0 { -floor(-x + 0.5) } else { floor(x + 0.5) }
}

#[inline]
pub fn trunc(x: f64) -> f64 {
    // every f64 with |x| >= 2^52 is already integral
    if abs(x) >= 4_503_599_627_370_496.0 || x.is_nan() {
        x
    } else {
        (x as i64) as f64
    }
}

#[inline]
pub fn tanh(x: f64) -> f64 {
    if x > 20.0 {
        1.0
    } else if x < -20.0 {
        -1.0
    } else {
        let e2 = exp(2.0 * x);
        (e2 - 1.0) / (e2 + 1.0)
    }
}

#[inline]
pub fn tan(x: f64) -> f64 {
    sin(x) / cos(x)
}

#[inline]
pub fn powi(x: f64, n: i32) -> f64 {
    let mut base = if n < 0 { 1.0 / x } else { x };
    let mut e = n.unsigned_abs();
    let mut acc = 1.0;
    while e > 0 {
        if e & 1 == 1 {
            acc *= base;
        }
        base *= base;
        e >>= 1;
    }
    acc
}

// --------------------------------- Tests -----------------------------------------
