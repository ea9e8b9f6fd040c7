//! Fast `f32` math built from IEEE-754 bit tricks and short polynomials.
//!
//! Goals
//! - No dependency on a libm: every routine is plain integer/float arithmetic
//! - Predictable cost on FPU-less or single-precision MCUs
//! - Good enough accuracy for control loops (typically 1e-3 relative or better)
//!
//! Contents
//! - classification: [`classify`], [`is_nan`], [`is_inf`], [`is_finite`], [`is_normal`]
//! - roots/reciprocals: [`recip`], [`sqrt`], [`rsqrt`], [`cbrt`], [`rcbrt`]
//! - rounding: [`round`], [`floor`], [`ceil`], [`trunc`], [`frac`], [`rem`], [`modulo`]
//! - trig: [`sin`], [`cos`], [`tan`], [`asin`], [`acos`], [`atan`], [`atan2`]
//! - exponentials: [`exp2`], [`log2`], [`exp`], [`exp10`], [`log`], [`log10`], [`pow`]
//! - hyperbolics, [`erf`]/[`erfc`], gamma family, [`rexp`], [`ldexp`], [`hypot`], [`next_after`]
//! - angle wrapping and interpolation helpers
//!
//! Notes
//! - Rounding tricks rely on the magic constant `1.5 * 2^23` and are exact for
//!   `|x| < 2^22`.
//! - `floor`/`ceil` are computed from [`trunc`] so negative integers are exact.

#![allow(
    clippy::excessive_precision,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use crate::mathex;

// --------------------------------- Constants -------------------------------------

pub mod consts {
    pub const E: f32 = 2.718_281_828_459_045_235_40;
    pub const LOG2E: f32 = 1.442_695_040_888_963_407_40;
    pub const LOG10E: f32 = 0.434_294_481_903_251_827_65;
    pub const LN2: f32 = 0.693_147_180_559_945_309_42;
    pub const LN10: f32 = 2.302_585_092_994_045_684_02;
    pub const PI: f32 = 3.141_592_653_589_793_238_46;
    pub const PI_2: f32 = 1.570_796_326_794_896_619_23;
    pub const PI_4: f32 = 0.785_398_163_397_448_309_62;
    pub const FRAC_1_PI: f32 = 0.318_309_886_183_790_671_54;
    pub const FRAC_2_PI: f32 = 0.636_619_772_367_581_343_08;
    pub const FRAC_2_SQRTPI: f32 = 1.128_379_167_095_512_573_90;
    pub const SQRT2: f32 = 1.414_213_562_373_095_048_80;
    pub const SQRT1_2: f32 = 0.707_106_781_186_547_524_40;
    pub const LN_SQRT_2PI: f32 = 0.918_938_533_204_672_741_780_329_7;
    pub const GAMMA_E: f32 = 0.577_215_664_901_532_860_606_512_090_082_402_4;
}

use consts::{FRAC_1_PI, LN2, LOG2E, PI, PI_2};

const TWO_PI: f32 = 6.283_185_307;

// --------------------------------- Classification --------------------------------

/// IEEE-754 category of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FpClass {
    Zero,
    Subnormal,
    Normal,
    Infinite,
    Nan,
}

#[inline]
pub fn classify(f: f32) -> FpClass {
    let u = f.to_bits() & 0x7FFF_FFFF;
    if u == 0 {
        FpClass::Zero
    } else if u < 0x0080_0000 {
        FpClass::Subnormal
    } else if u < 0x7F80_0000 {
        FpClass::Normal
    } else if u == 0x7F80_0000 {
        FpClass::Infinite
    } else {
        FpClass::Nan
    }
}

#[inline] pub fn is_nan(x: f32) -> bool { classify(x) == FpClass::Nan }
#[inline] pub fn is_inf(x: f32) -> bool { classify(x) == FpClass::Infinite }
#[inline] pub fn is_finite(x: f32) -> bool { classify(x) < FpClass::Infinite }
#[inline] pub fn is_normal(x: f32) -> bool { classify(x) == FpClass::Normal }

#[inline] pub fn get_inf() -> f32 { f32::from_bits(0x7F80_0000) }
#[inline] pub fn get_nan() -> f32 { f32::from_bits(0x7FBF_FFFF) }

/// `|a - b| <= |tol|`.
#[inline]
pub fn is_equal(a: f32, b: f32, tol: f32) -> bool {
    mathex::is_equal(a, b, tol)
}

// --------------------------------- Basic ops -------------------------------------

#[inline]
pub fn abs(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}

/// `-1`, `0` or `1`.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// One Newton step on top of the `0x7EF311C7` reciprocal seed.
#[inline]
pub fn recip(x: f32) -> f32 {
    let z = f32::from_bits(0x7EF3_11C7_u32.wrapping_sub(x.to_bits()));
    z * (2.0 - x * z)
}

#[inline]
pub fn sqrt(x: f32) -> f32 {
    if x < 0.0 {
        get_nan()
    } else if classify(x) == FpClass::Zero {
        0.0
    } else {
        let y = (x.to_bits().wrapping_sub(0x0080_0000) >> 1).wrapping_add(0x2000_0000);
        let z = f32::from_bits(y);
        (x / z + z) * 0.5
    }
}

/// Reciprocal square root with one Newton refinement.
#[inline]
pub fn rsqrt(x: f32) -> f32 {
    if x < 0.0 {
        get_nan()
    } else if classify(x) == FpClass::Zero {
        get_inf()
    } else {
        let z = 0.5 * x;
        let y = f32::from_bits(0x5F37_5A86 - (x.to_bits() >> 1));
        y * (1.5 - z * y * y)
    }
}

fn cbrt_core(x: f32, reciprocal: bool) -> f32 {
    const K: [f32; 3] = [1.752_319_676, 1.250_952_424_5, 0.509_381_829_2];
    let neg = x < 0.0;
    let x = abs(x);
    let mut y = f32::from_bits(0x548C_2B4B - x.to_bits() / 3);
    let mut c = x * y * y * y;
    y *= K[0] - c * (K[1] - K[2] * c);
    let d = x * y * y;
    c = 1.0 - d * y;
    let mut r = 1.0 + 0.333_333_333_333 * c;
    r *= if reciprocal { y } else { d };
    if neg { -r } else { r }
}

#[inline]
pub fn cbrt(x: f32) -> f32 {
    if classify(x) == FpClass::Zero { 0.0 } else { cbrt_core(x, false) }
}

#[inline]
pub fn rcbrt(x: f32) -> f32 {
    if classify(x) == FpClass::Zero { get_inf() } else { cbrt_core(x, true) }
}

// --------------------------------- Rounding --------------------------------------

/// Round to nearest (ties to even) with the `1.5 * 2^23` trick.
#[inline]
pub fn round(x: f32) -> f32 {
    let mut y = x + 12_582_912.0;
    y -= 12_582_912.0;
    y
}

#[inline]
pub fn trunc(x: f32) -> f32 {
    if abs(x) >= 8_388_608.0 || is_nan(x) {
        x
    } else {
        (x as i32) as f32
    }
}

#[inline]
pub fn floor(x: f32) -> f32 {
    let t = trunc(x);
    if t > x { t - 1.0 } else { t }
}

#[inline]
pub fn ceil(x: f32) -> f32 {
    let t = trunc(x);
    if t < x { t + 1.0 } else { t }
}

#[inline]
pub fn frac(x: f32) -> f32 {
    x - trunc(x)
}

/// Remainder with the sign of `y` (floored division).
#[inline]
pub fn rem(x: f32, y: f32) -> f32 {
    x - y * floor(x / y)
}

/// Remainder with the sign of `x` (truncated division). NaN when `x` is zero.
#[inline]
pub fn modulo(x: f32, y: f32) -> f32 {
    if classify(x) == FpClass::Zero { get_nan() } else { x - y * trunc(x / y) }
}

// --------------------------------- Trigonometry ----------------------------------

/// Parabolic sine approximation with range reduction to one period.
#[inline]
pub fn sin(x: f32) -> f32 {
    let mut x = x * -FRAC_1_PI;
    let y = x + 25_165_824.0;
    x -= y - 25_165_824.0;
    x *= abs(x) - 1.0;
    x * (3.584_130_455_389_6 * abs(x) + 3.103_967_386_152_6)
}

#[inline]
pub fn cos(x: f32) -> f32 {
    sin(x + PI_2)
}

#[inline]
pub fn tan(x: f32) -> f32 {
    sin(x) / cos(x)
}

#[inline]
pub fn asin(x: f32) -> f32 {
    let x = sqrt(1.0 + x) - sqrt(1.0 - x);
    x * (0.131_754_508_171 * abs(x) + 0.924_391_722_181)
}

#[inline]
pub fn acos(x: f32) -> f32 {
    PI_2 - asin(x)
}

#[inline]
pub fn atan(x: f32) -> f32 {
    let x = x / (abs(x) + 1.0);
    let ax = abs(x);
    x * (ax * (-1.456_674_989_14 * ax + 2.185_012_483_71) + 0.842_458_832_225)
}

pub fn atan2(y: f32, x: f32) -> f32 {
    let t = PI - if y < 0.0 { TWO_PI } else { 0.0 };
    let f = if abs(x) <= f32::MIN_POSITIVE { 1.0 } else { 0.0 };
    let y = atan(y / (x + f)) + if x < 0.0 { t } else { 0.0 };
    y + f * (0.5 * t - y)
}

// --------------------------------- Exponentials ----------------------------------

pub fn exp2(x: f32) -> f32 {
    if x <= -126.0 {
        0.0
    } else if x > 128.0 {
        get_inf()
    } else {
        let exponent = (x + 127.0) as u32;
        let mut x = x + (127.0 - exponent as f32);
        let y = f32::from_bits(exponent << 23);
        x *= x * 0.339_766_027 + 0.660_233_972;
        y * (x + 1.0)
    }
}

pub fn log2(x: f32) -> f32 {
    if x < 0.0 {
        get_nan()
    } else if classify(x) == FpClass::Zero {
        -get_inf()
    } else {
        let bits = x.to_bits();
        let e = (bits >> 23) as f32;
        let m = f32::from_bits((bits & 0x007F_FFFF) | 0x3F80_0000);
        e - 128.0 + m * (-0.333_333_333 * m + 2.0) - 0.666_666_666
    }
}

#[inline] pub fn exp(x: f32) -> f32 { exp2(LOG2E * x) }
#[inline] pub fn exp10(x: f32) -> f32 { exp2(3.321_928_09 * x) }
#[inline] pub fn log(x: f32) -> f32 { LN2 * log2(x) }
#[inline] pub fn log10(x: f32) -> f32 { 0.301_029_996 * log2(x) }
#[inline] pub fn pow(b: f32, e: f32) -> f32 { exp2(e * log2(b)) }

#[inline]
pub fn sinh(x: f32) -> f32 {
    let e = exp(x);
    (e - 1.0 / e) * 0.5
}

#[inline]
pub fn cosh(x: f32) -> f32 {
    let e = exp(x);
    (e + 1.0 / e) * 0.5
}

#[inline]
pub fn tanh(x: f32) -> f32 {
    let e = exp(-2.0 * x);
    (1.0 - e) / (1.0 + e)
}

#[inline]
pub fn asinh(x: f32) -> f32 {
    log(x + sqrt(x * x + 1.0))
}

#[inline]
pub fn acosh(x: f32) -> f32 {
    if x < 1.0 { get_nan() } else { log(x + sqrt(x * x - 1.0)) }
}

#[inline]
pub fn atanh(x: f32) -> f32 {
    log((1.0 + x) / (1.0 - x)) * 0.5
}

/// Error function (Abramowitz-Stegun 7.1.27, |ε| < 5e-4), saturated past 6.912.
pub fn erf(x: f32) -> f32 {
    if x >= 6.912 {
        return 1.0;
    }
    if x <= -6.912 {
        return -1.0;
    }
    let ax = abs(x);
    let p = 1.0 + ax * (0.278_393 + ax * (0.230_389 + ax * (0.000_972 + ax * 0.078_108)));
    let p2 = p * p;
    let r = 1.0 - 1.0 / (p2 * p2);
    if x < 0.0 { -r } else { r }
}

#[inline]
pub fn erfc(x: f32) -> f32 {
    1.0 - erf(x)
}

// --------------------------------- Gamma family ----------------------------------

// Full-precision ln/exp for the gamma family.
fn ln_series(x: f32) -> f32 {
    let (m, e) = rexp(x);
    let s = (m - 1.0) / (m + 1.0);
    let s2 = s * s;
    let ln_m = 2.0 * s * (1.0 + s2 * (1.0 / 3.0 + s2 * (0.2 + s2 * (1.0 / 7.0 + s2 / 9.0))));
    ln_m + e as f32 * LN2
}

fn exp_series(x: f32) -> f32 {
    let k = round(x * LOG2E);
    let r = x - k * LN2;
    let mut term = 1.0;
    let mut acc = 1.0;
    for n in 1..=8 {
        term *= r / n as f32;
        acc += term;
    }
    ldexp(acc, k as i32)
}

/// Natural log of |Γ(x)| (Stirling series with upward recurrence).
pub fn lgamma(x: f32) -> f32 {
    if x <= 0.0 && frac(x) == 0.0 {
        return get_inf();
    }
    if x < 0.5 {
        // reflection: Γ(x)Γ(1-x) = π / sin(πx)
        let s = abs(sin(PI * x));
        return ln_series(PI / s) - lgamma(1.0 - x);
    }
    let mut x = x;
    let mut prod = 1.0;
    while x < 7.0 {
        prod *= x;
        x += 1.0;
    }
    let r = 1.0 / x;
    let r2 = r * r;
    let series = r * (1.0 / 12.0 - r2 * (1.0 / 360.0 - r2 / 1260.0));
    (x - 0.5) * ln_series(x) - x + consts::LN_SQRT_2PI + series - ln_series(prod)
}

/// Γ(x); NaN at the poles.
pub fn tgamma(x: f32) -> f32 {
    if x <= 0.0 && frac(x) == 0.0 {
        return get_nan();
    }
    let mag = exp_series(lgamma(x));
    // Γ is negative on (-1,0), (-3,-2), ...
    if x < 0.0 && (trunc(x) as i32) % 2 == 0 { -mag } else { mag }
}

/// `x!` through Γ(x + 1). Exact table for small integers.
pub fn factorial(x: f32) -> f32 {
    const TABLE: [f32; 11] = [
        1.0, 1.0, 2.0, 6.0, 24.0, 120.0, 720.0, 5040.0, 40320.0, 362_880.0, 3_628_800.0,
    ];
    if x < 0.0 {
        return get_nan();
    }
    if frac(x) == 0.0 && x <= 10.0 {
        return TABLE[x as usize];
    }
    tgamma(x + 1.0)
}

// --------------------------------- Bit-level helpers -----------------------------

/// Split into mantissa in `[0.5, 1)` and a power of two: `x = m * 2^e`.
#[inline]
pub fn rexp(x: f32) -> (f32, i32) {
    let bits = x.to_bits();
    let e = ((bits >> 23) & 0xFF) as i32 - 0x7E;
    let m = f32::from_bits((bits & 0x807F_FFFF) | 0x3F00_0000);
    (m, e)
}

/// `x * 2^pw2` by adjusting the exponent field.
#[inline]
pub fn ldexp(x: f32, pw2: i32) -> f32 {
    let bits = x.to_bits();
    let e = ((bits >> 23) & 0xFF) as i32 + pw2;
    f32::from_bits((((e as u32) & 0xFF) << 23) | (bits & 0x807F_FFFF))
}

pub fn hypot(x: f32, y: f32) -> f32 {
    if is_finite(x) && is_finite(y) {
        let (x, y) = (abs(x), abs(y));
        if classify(x) == FpClass::Zero && classify(y) == FpClass::Zero {
            return 0.0;
        }
        let (a, b) = if x >= y { (x, y) } else { (y, x) };
        let (an, e) = rexp(a);
        let bn = if classify(b) == FpClass::Zero { 0.0 } else { ldexp(b, -e) };
        ldexp(sqrt(an * an + bn * bn), e)
    } else if is_inf(x) || is_inf(y) {
        get_inf()
    } else {
        get_nan()
    }
}

/// Next representable value after `x` in the direction of `y`.
pub fn next_after(x: f32, y: f32) -> f32 {
    if is_nan(x) || is_nan(y) {
        return get_nan();
    }
    let mut ux = x.to_bits();
    let uy = y.to_bits();
    if ux == uy {
        return y;
    }
    let ax = ux & 0x7FFF_FFFF;
    let ay = uy & 0x7FFF_FFFF;
    if ax == 0 {
        ux = if ay == 0 { uy } else { (uy & 0x8000_0000) | 1 };
    } else if ax > ay || ((ux ^ uy) & 0x8000_0000) != 0 {
        ux -= 1;
    } else {
        ux += 1;
    }
    f32::from_bits(ux)
}

// --------------------------------- Wrapping / interpolation ----------------------

#[inline]
pub fn wrap_to_pi(x: f32) -> f32 {
    rem(x + PI, TWO_PI) - PI
}

#[inline]
pub fn wrap_to_2pi(x: f32) -> f32 {
    rem(x, TWO_PI)
}

#[inline]
pub fn wrap_to_180(x: f32) -> f32 {
    rem(x + 180.0, 360.0) - 180.0
}

#[inline]
pub fn wrap_to_360(x: f32) -> f32 {
    rem(x, 360.0)
}

/// Overflow-free midpoint.
#[inline]
pub fn midpoint(a: f32, b: f32) -> f32 {
    a + 0.5 * (b - a)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[inline]
pub fn map(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    mathex::map_min_max(x, x_min, x_max, y_min, y_max)
}

// --------------------------------- Tests -----------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, rel: f32) -> bool {
        (a - b).abs() <= rel * b.abs().max(1.0)
    }

    #[test]
    fn classification() {
        assert_eq!(classify(0.0), FpClass::Zero);
        assert_eq!(classify(-0.0), FpClass::Zero);
        assert_eq!(classify(1.0e-40), FpClass::Subnormal);
        assert_eq!(classify(1.0), FpClass::Normal);
        assert_eq!(classify(get_inf()), FpClass::Infinite);
        assert!(is_nan(get_nan()));
        assert!(is_finite(3.0) && !is_finite(get_inf()));
    }

    #[test]
    fn roots_and_reciprocals() {
        for x in [0.01_f32, 0.5, 2.0, 9.0, 1234.5] {
            assert!(close(sqrt(x), x.sqrt(), 3e-3), "sqrt x={} y={}", x, sqrt(x));
            assert!(close(rsqrt(x), 1.0 / x.sqrt(), 3e-3), "rsqrt x={}", x);
            assert!(close(recip(x), 1.0 / x, 5e-3), "recip x={}", x);
            assert!(close(cbrt(x), x.cbrt(), 1e-3), "cbrt x={}", x);
        }
        assert!(close(cbrt(-27.0), -3.0, 1e-3));
        assert!(is_nan(sqrt(-1.0)));
        assert!(is_inf(rsqrt(0.0)));
    }

    #[test]
    fn rounding_family() {
        assert_eq!(round(2.4), 2.0);
        assert_eq!(round(-2.6), -3.0);
        assert_eq!(floor(-1.0), -1.0);
        assert_eq!(floor(-1.2), -2.0);
        assert_eq!(ceil(1.2), 2.0);
        assert_eq!(ceil(3.0), 3.0);
        assert_eq!(trunc(-2.7), -2.0);
        assert!((frac(2.75) - 0.75).abs() < 1e-6);
        assert!((rem(-1.0, 3.0) - 2.0).abs() < 1e-6);
        assert!((modulo(-1.0, 3.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn trig_within_tolerance() {
        let mut x = -3.0_f32;
        while x <= 3.0 {
            assert!((sin(x) - x.sin()).abs() < 2e-3, "sin x={}", x);
            assert!((cos(x) - x.cos()).abs() < 2e-3, "cos x={}", x);
            assert!((atan(x) - x.atan()).abs() < 1e-2, "atan x={}", x);
            x += 0.1;
        }
        assert!((tan(0.5) - 0.5_f32.tan()).abs() < 5e-3);
        assert!((asin(0.5) - 0.5_f32.asin()).abs() < 2e-2);
        assert!((acos(0.5) - 0.5_f32.acos()).abs() < 2e-2);
        assert!((atan2(1.0, -1.0) - 1.0_f32.atan2(-1.0)).abs() < 5e-3);
        assert!((atan2(-1.0, -1.0) - (-1.0_f32).atan2(-1.0)).abs() < 5e-3);
        assert!((atan2(1.0, 0.0) - PI_2).abs() < 5e-3);
    }

    #[test]
    fn exponentials() {
        for x in [-5.0_f32, -1.0, 0.0, 0.5, 1.0, 3.0, 10.0] {
            assert!(close(exp(x), x.exp(), 5e-3), "exp x={} y={}", x, exp(x));
        }
        for x in [0.1_f32, 0.5, 1.0, 2.0, 10.0, 1000.0] {
            assert!((log(x) - x.ln()).abs() < 1e-2, "log x={}", x);
            assert!((log2(x) - x.log2()).abs() < 1.5e-2, "log2 x={}", x);
        }
        assert!(close(pow(2.0, 10.0), 1024.0, 1e-2));
        assert_eq!(exp2(-200.0), 0.0);
        assert!(is_inf(exp2(200.0)));
        assert!((sinh(1.0) - 1.0_f32.sinh()).abs() < 1e-2);
        assert!((cosh(1.0) - 1.0_f32.cosh()).abs() < 1e-2);
        assert!((tanh(0.7) - 0.7_f32.tanh()).abs() < 5e-3);
        assert!((asinh(1.0) - 1.0_f32.asinh()).abs() < 1e-2);
        assert!((acosh(2.0) - 2.0_f32.acosh()).abs() < 1e-2);
        assert!((atanh(0.5) - 0.5_f32.atanh()).abs() < 1e-2);
    }

    #[test]
    fn special_functions() {
        assert!((erf(0.5) - 0.520_499_9).abs() < 1e-3);
        assert!((erf(-1.0) + 0.842_700_8).abs() < 1e-3);
        assert_eq!(erf(10.0), 1.0);
        assert!((erfc(0.0) - 1.0).abs() < 1e-3);
        assert_eq!(factorial(5.0), 120.0);
        assert!(close(tgamma(0.5), 1.772_453_9, 5e-3));
        assert!(close(tgamma(4.5), 11.631_728, 5e-3));
        assert!(tgamma(-0.5) < 0.0);
        assert!((lgamma(10.0) - 12.801_827).abs() < 5e-3);
    }

    #[test]
    fn bit_helpers() {
        let (m, e) = rexp(12.0);
        assert_eq!((m, e), (0.75, 4));
        assert_eq!(ldexp(0.75, 4), 12.0);
        assert!(close(hypot(3.0, 4.0), 5.0, 1e-3));
        assert!(close(hypot(-3.0, 4.0), 5.0, 1e-3));
        assert!(is_inf(hypot(get_inf(), 1.0)));
        assert!(next_after(1.0, 2.0) > 1.0);
        assert!(next_after(1.0, 0.0) < 1.0);
        assert_eq!(next_after(0.0, 1.0), f32::from_bits(1));
    }

    #[test]
    fn wrapping() {
        assert!((wrap_to_pi(3.0 * PI) - PI).abs() < 1e-4 || (wrap_to_pi(3.0 * PI) + PI).abs() < 1e-4);
        assert!((wrap_to_180(190.0) + 170.0).abs() < 1e-3);
        assert!((wrap_to_360(-10.0) - 350.0).abs() < 1e-3);
        assert!((wrap_to_2pi(-0.5) - (TWO_PI - 0.5)).abs() < 1e-4);
        assert_eq!(midpoint(2.0, 4.0), 3.0);
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
        assert!((map(5.0, 0.0, 10.0, 0.0, 100.0) - 50.0).abs() < 1e-4);
    }
}
