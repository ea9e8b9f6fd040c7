//! Q16.16 fixed-point arithmetic.
//!
//! [`Fp16`] wraps an `i32` whose low 16 bits hold the fraction, giving a range
//! of about ±32767.99998 with a resolution of 2⁻¹⁶. The raw value `i32::MIN`
//! is reserved as the overflow marker ([`Fp16::OVERFLOW`]).
//!
//! Two process-wide switches change how every operation behaves:
//! - rounding (default on): conversions, `*`, `/` and `sqrt` round to nearest
//! - saturation (default off): results that would overflow clamp to
//!   [`Fp16::MIN`]/[`Fp16::MAX`] instead of yielding the overflow marker
//!
//! Transcendentals are computed entirely in fixed point (Taylor series,
//! Newton iterations and bitwise logarithms), so no float unit is needed.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless
)]

use core::fmt;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use core::sync::atomic::{AtomicBool, Ordering};

static ROUNDING: AtomicBool = AtomicBool::new(true);
static SATURATION: AtomicBool = AtomicBool::new(false);

#[inline]
fn rounding() -> bool {
    ROUNDING.load(Ordering::Relaxed)
}

#[inline]
fn saturation() -> bool {
    SATURATION.load(Ordering::Relaxed)
}

// raw constants
const ONE: i32 = 0x0001_0000;
const ONE_HALF: i32 = 0x0000_8000;
const OVERFLOW: i32 = i32::MIN;
const RAW_MIN: i32 = -i32::MAX;
const RAW_MAX: i32 = i32::MAX;
const EXP_MAX: i32 = 681_391;
const F2: i32 = 131_072;
const F3: i32 = 196_608;
const F16: i32 = 1_048_576;
const F100: i32 = 6_553_600;
const F6_5: i32 = 425_984;
const F_E: i32 = 178_145;
const F_E4: i32 = 3_578_144;
const F_PI: i32 = 205_887;
const F_PI_2: i32 = 102_944;
const F_2PI: i32 = 411_775;
const F_PI_4: i32 = 51_471;
const F_3PI_4: i32 = 154_415;
const F_180_PI: i32 = 3_754_936;
const F_PI_180: i32 = 1_144;
const F_180: i32 = 11_796_480;
const F_360: i32 = 23_592_960;

/// Q16.16 fixed-point number.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fp16(i32);

impl Fp16 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE);
    pub const HALF: Self = Self(ONE_HALF);
    /// Marker returned when a result does not fit.
    pub const OVERFLOW: Self = Self(OVERFLOW);
    pub const MIN: Self = Self(RAW_MIN);
    pub const MAX: Self = Self(RAW_MAX);
    /// Smallest positive step, 2⁻¹⁶.
    pub const EPSILON: Self = Self(1);

    pub const E: Self = Self(F_E);
    pub const LOG2E: Self = Self(94_548);
    pub const LOG10E: Self = Self(28_462);
    pub const LN2: Self = Self(45_426);
    pub const LN10: Self = Self(150_902);
    pub const PI: Self = Self(F_PI);
    pub const PI_2: Self = Self(F_PI_2);
    pub const TWO_PI: Self = Self(F_2PI);
    pub const PI_4: Self = Self(F_PI_4);
    pub const FRAC_1_PI: Self = Self(20_861);
    pub const FRAC_2_PI: Self = Self(41_722);
    pub const FRAC_2_SQRTPI: Self = Self(73_949);
    pub const SQRT2: Self = Self(92_682);
    pub const SQRT1_2: Self = Self(46_341);

    // ------------------------------- Global switches --------------------------

    pub fn set_rounding(enabled: bool) {
        ROUNDING.store(enabled, Ordering::Relaxed);
    }

    pub fn set_saturation(enabled: bool) {
        SATURATION.store(enabled, Ordering::Relaxed);
    }

    pub fn rounding_enabled() -> bool {
        rounding()
    }

    pub fn saturation_enabled() -> bool {
        saturation()
    }

    // ------------------------------- Conversions ------------------------------

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn is_overflow(self) -> bool {
        self.0 == OVERFLOW
    }

    #[inline]
    pub fn from_int(x: i32) -> Self {
        Self(((x as u32) << 16) as i32)
    }

    pub fn from_f32(x: f32) -> Self {
        let mut v = x * ONE as f32;
        if rounding() {
            v += if v >= 0.0 { 0.5 } else { -0.5 };
        }
        Self(v as i32)
    }

    pub fn from_f64(x: f64) -> Self {
        let mut v = x * f64::from(ONE);
        if rounding() {
            v += if v >= 0.0 { 0.5 } else { -0.5 };
        }
        Self(v as i32)
    }

    /// Integer part; rounds half away from zero when rounding is enabled.
    pub fn to_int(self) -> i32 {
        if rounding() {
            if self.0 >= 0 {
                (self.0 + (ONE >> 1)) / ONE
            } else {
                (self.0 - (ONE >> 1)) / ONE
            }
        } else {
            self.0 >> 16
        }
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 * (1.0 / ONE as f32)
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) * (1.0 / f64::from(ONE))
    }

    // ------------------------------- Functions --------------------------------

    pub fn abs(self) -> Self {
        if self.0 == OVERFLOW {
            Self::OVERFLOW
        } else {
            Self(self.0.abs())
        }
    }

    /// Bitwise integer square root of `raw << 16`. Zero maps to zero,
    /// negative inputs overflow.
    pub fn sqrt(self) -> Self {
        if self.0 < 0 {
            return Self::OVERFLOW;
        }
        let mut op = (self.0 as u64) << 16;
        let mut res = 0u64;
        let mut bit = 1u64 << 62;
        while bit > op {
            bit >>= 2;
        }
        while bit != 0 {
            if op >= res + bit {
                op -= res + bit;
                res = (res >> 1) + bit;
            } else {
                res >>= 1;
            }
            bit >>= 2;
        }
        if rounding() && op > res {
            res += 1;
        }
        Self(res as i32)
    }

    /// Taylor series, saturating to [`Fp16::MAX`] above ≈10.3972 and to zero
    /// below ≈-10.3972.
    pub fn exp(self) -> Self {
        let x = self.0;
        if x == 0 {
            return Self::ONE;
        }
        if x == ONE {
            return Self::E;
        }
        if x >= EXP_MAX {
            return Self::MAX;
        }
        if x <= -EXP_MAX {
            return Self::ZERO;
        }
        let neg = x < 0;
        let x = if neg { -x } else { x };
        let mut ret = x + ONE;
        let mut term = x;
        for i in 2..30 {
            term = mul(term, div(x, Self::from_int(i).0));
            ret = ret.wrapping_add(term);
            if term < 500 && (i > 15 || term < 20) {
                break;
            }
        }
        if neg {
            ret = div(ONE, ret);
        }
        Self(ret)
    }

    /// Natural logarithm by Newton iteration on [`Fp16::exp`]. Non-positive
    /// inputs overflow.
    pub fn log(self) -> Self {
        let mut x = self.0;
        if x <= 0 {
            return Self::OVERFLOW;
        }
        let mut scaling = 0;
        while x > F100 {
            x = div(x, F_E4);
            scaling += 4;
        }
        while x < ONE {
            x = mul(x, F_E4);
            scaling -= 4;
        }
        let mut guess = F2;
        let mut count = 0;
        loop {
            let e = Self(guess).exp().0;
            let delta = div(x.wrapping_sub(e), e).min(F3);
            guess = guess.wrapping_add(delta);
            count += 1;
            if count > 10 || (-1..=1).contains(&delta) {
                break;
            }
        }
        Self(guess.wrapping_add(Self::from_int(scaling).0))
    }

    /// Base-2 logarithm from the binary expansion of the mantissa.
    pub fn log2(self) -> Self {
        let x = self.0;
        let ret = if x <= 0 {
            OVERFLOW
        } else if x < ONE {
            if x == 1 {
                -F16
            } else {
                -log2i(div(ONE, x))
            }
        } else {
            log2i(x)
        };
        if saturation() && ret == OVERFLOW {
            Self::MIN
        } else {
            Self(ret)
        }
    }

    /// Wrap an angle into `(-π, π]`.
    pub fn wrap_to_pi(self) -> Self {
        let mut x = self.0;
        if !(-F_PI..=F_PI).contains(&x) {
            while x > F_PI {
                x -= F_2PI;
            }
            while x <= -F_PI {
                x += F_2PI;
            }
        }
        Self(x)
    }

    /// Wrap an angle in degrees into `(-180, 180]`.
    pub fn wrap_to_180(self) -> Self {
        let mut x = self.0;
        if !(-F_180..=F_180).contains(&x) {
            while x > F_180 {
                x -= F_360;
            }
            while x <= -F_180 {
                x += F_360;
            }
        }
        Self(x)
    }

    #[inline]
    pub fn rad2deg(self) -> Self {
        Self(mul(self.wrap_to_pi().0, F_180_PI))
    }

    #[inline]
    pub fn deg2rad(self) -> Self {
        Self(mul(self.wrap_to_180().0, F_PI_180))
    }

    /// Taylor series up to x¹¹ after wrapping to `(-π, π]`.
    pub fn sin(self) -> Self {
        let x = self.wrap_to_pi().0;
        let x2 = mul(x, x);
        let mut term = x;
        let mut ret = x;
        // term(k) = -term(k-1) * x² / ((2k)(2k+1)); no power of x is ever formed
        for k in 1..=5 {
            term = -(mul(term, x2) / ((2 * k) * (2 * k + 1)));
            ret += term;
        }
        Self(ret)
    }

    #[inline]
    pub fn cos(self) -> Self {
        Self(self.0.wrapping_add(F_PI_2)).sin()
    }

    #[inline]
    pub fn tan(self) -> Self {
        Self(div(self.sin().0, self.cos().0))
    }

    /// Polynomial arctangent of `y/x` with quadrant correction.
    pub fn atan2(y: Self, x: Self) -> Self {
        const K1: i32 = 0x0000_FB50;
        const K3: i32 = 0x0000_3240;
        let (y, x) = (y.0, x.0);
        if y == 0 && x == 0 {
            return Self::ZERO;
        }
        let mask = y >> 31;
        let abs_y = y.wrapping_add(mask) ^ mask;
        let (r, mut angle) = if x >= 0 {
            (div(x.wrapping_sub(abs_y), x.wrapping_add(abs_y)), F_PI_4)
        } else {
            (div(x.wrapping_add(abs_y), abs_y.wrapping_sub(x)), F_3PI_4)
        };
        let r3 = mul(mul(r, r), r);
        angle += mul(K3, r3) - mul(K1, r);
        Self(if y < 0 { -angle } else { angle })
    }

    #[inline]
    pub fn atan(self) -> Self {
        Self::atan2(self, Self::ONE)
    }

    /// Defined on `[-1, 1]`; zero outside.
    pub fn asin(self) -> Self {
        let x = self.0;
        if x == ONE {
            return Self::PI_2;
        }
        if x == -ONE {
            return -Self::PI_2;
        }
        if !(-ONE..=ONE).contains(&x) {
            return Self::ZERO;
        }
        let c = Self(ONE - mul(x, x)).sqrt().0;
        Self(div(x, c)).atan()
    }

    #[inline]
    pub fn acos(self) -> Self {
        Self(F_PI_2 - self.asin().0)
    }

    pub fn cosh(self) -> Self {
        let x = self.0;
        if x == 0 {
            return Self::ONE;
        }
        if x >= EXP_MAX || x <= -EXP_MAX {
            return Self::MAX;
        }
        let epx = self.exp().0;
        let enx = (-self).exp().0;
        if epx == OVERFLOW || enx == OVERFLOW {
            Self::OVERFLOW
        } else {
            Self(epx.wrapping_add(enx) >> 1)
        }
    }

    pub fn sinh(self) -> Self {
        let x = self.0;
        if x == 0 {
            return Self::ZERO;
        }
        if x >= EXP_MAX {
            return Self::MAX;
        }
        if x <= -EXP_MAX {
            return Self::MIN;
        }
        let epx = self.exp().0;
        let enx = (-self).exp().0;
        if epx == OVERFLOW || enx == OVERFLOW {
            Self::OVERFLOW
        } else {
            Self(epx.wrapping_sub(enx) >> 1)
        }
    }

    /// Saturates to ±1 beyond ±6.5.
    pub fn tanh(self) -> Self {
        let x = self.0;
        if x == 0 {
            Self::ZERO
        } else if x > F6_5 {
            Self::ONE
        } else if x < -F6_5 {
            -Self::ONE
        } else {
            let a = self.abs();
            let epx = a.exp().0;
            let enx = (-a).exp().0;
            let r = div(epx - enx, epx + enx);
            Self(if x > 0 { r } else { -r })
        }
    }

    /// `x^y`: repeated multiplication for positive integral `y`, otherwise
    /// `exp(y·ln|x|)` carrying the sign of `x`.
    pub fn pow(self, y: Self) -> Self {
        if (y.0 as u32) & 0x0000_FFFF == 0 && y.0 > 0 {
            let n = y.0 >> 16;
            let mut ret = ONE;
            for _ in 0..n {
                ret = mul(self.0, ret);
                if ret == OVERFLOW {
                    break;
                }
            }
            return Self(ret);
        }
        let t = mul(y.0, self.abs().log().0);
        if t == OVERFLOW {
            return Self::OVERFLOW;
        }
        let r = Self(t).exp();
        if self.0 < 0 { -r } else { r }
    }

    /// Render into `buf` with up to 5 decimals and return the written text.
    /// Output that does not fit is truncated.
    pub fn to_ascii(self, buf: &mut [u8], decimals: usize) -> &str {
        let mut w = SliceWriter { buf, len: 0 };
        // SliceWriter never fails, it truncates instead
        let _ = write_fixed(&mut w, self.0, decimals);
        let len = w.len;
        let buf = w.buf;
        core::str::from_utf8(&buf[..len]).unwrap_or("")
    }
}

// ------------------------------- Raw kernels ---------------------------------

fn saturate(ns: i32, x: i32, y: i32) -> i32 {
    if saturation() && ns == OVERFLOW {
        if (x >= 0) == (y >= 0) { RAW_MAX } else { RAW_MIN }
    } else {
        ns
    }
}

fn add(x: i32, y: i32) -> i32 {
    let r = x.wrapping_add(y);
    let ret = if (x ^ y) >= 0 && (x ^ r) < 0 { OVERFLOW } else { r };
    // an overflowing sum always leaves in the direction of `x`
    saturate(ret, x, ONE)
}

fn sub(x: i32, y: i32) -> i32 {
    let r = x.wrapping_sub(y);
    let ret = if (x ^ y) < 0 && (x ^ r) < 0 { OVERFLOW } else { r };
    saturate(ret, x, ONE)
}

fn mul(x: i32, y: i32) -> i32 {
    let p = i64::from(x) * i64::from(y);
    let r = if rounding() { (p + 0x8000 - i64::from(p < 0)) >> 16 } else { p >> 16 };
    let ret = if r > i64::from(RAW_MAX) || r < i64::from(RAW_MIN) { OVERFLOW } else { r as i32 };
    saturate(ret, x, y)
}

fn div(x: i32, y: i32) -> i32 {
    if y == 0 {
        return saturate(OVERFLOW, x, y);
    }
    let n = i64::from(x).abs() << 16;
    let d = i64::from(y).abs();
    let mut q = n / d;
    if rounding() && 2 * (n % d) >= d {
        q += 1;
    }
    let ret = if q > i64::from(RAW_MAX) {
        OVERFLOW
    } else if (x ^ y) < 0 {
        -(q as i32)
    } else {
        q as i32
    };
    saturate(ret, x, y)
}

// halving shift, rounding the dropped bit up
fn rs(x: i32) -> i32 {
    if rounding() { (x >> 1) + (x & 1) } else { x >> 1 }
}

fn log2i(mut x: i32) -> i32 {
    let mut ret = 0;
    while x >= F2 {
        ret += 1;
        x = rs(x);
    }
    if x == 0 {
        return ret << 16;
    }
    for _ in 0..16 {
        x = mul(x, x);
        ret <<= 1;
        if x >= F2 {
            ret |= 1;
            x = rs(x);
        }
    }
    if rounding() {
        x = mul(x, x);
        if x >= F2 {
            ret += 1;
        }
    }
    ret
}

// ------------------------------- Formatting ----------------------------------

struct SliceWriter<'b> {
    buf: &'b mut [u8],
    len: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &b in s.as_bytes() {
            if self.len < self.buf.len() {
                self.buf[self.len] = b;
                self.len += 1;
            }
        }
        Ok(())
    }
}

fn write_fixed<W: fmt::Write>(w: &mut W, raw: i32, decimals: usize) -> fmt::Result {
    const SCALES: [u32; 6] = [1, 10, 100, 1000, 10_000, 100_000];
    if raw == OVERFLOW {
        return w.write_str("overflow");
    }
    let decimals = decimals.min(5);
    let u = raw.unsigned_abs();
    let mut ipart = u >> 16;
    let scale = SCALES[decimals];
    let mut fpart = mul((u & 0xFFFF) as i32, scale as i32) as u32;
    if fpart >= scale {
        ipart += 1;
        fpart -= scale;
    }
    if raw < 0 {
        w.write_char('-')?;
    }
    write!(w, "{ipart}")?;
    if decimals > 0 {
        write!(w, ".{fpart:0width$}", width = decimals)?;
    }
    Ok(())
}

/// Uses the formatter precision (default 5, capped at 5 decimals).
impl fmt::Display for Fp16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0, f.precision().unwrap_or(5))
    }
}

// ------------------------------- Conversions / operators ---------------------

impl From<i32> for Fp16 {
    fn from(x: i32) -> Self {
        Self::from_int(x)
    }
}

impl From<f32> for Fp16 {
    fn from(x: f32) -> Self {
        Self::from_f32(x)
    }
}

impl From<f64> for Fp16 {
    fn from(x: f64) -> Self {
        Self::from_f64(x)
    }
}

impl From<Fp16> for f64 {
    fn from(x: Fp16) -> f64 {
        x.to_f64()
    }
}

impl Add for Fp16 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(add(self.0, rhs.0))
    }
}

impl Sub for Fp16 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(sub(self.0, rhs.0))
    }
}

impl Mul for Fp16 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(mul(self.0, rhs.0))
    }
}

impl Div for Fp16 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self(div(self.0, rhs.0))
    }
}

impl Neg for Fp16 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl AddAssign for Fp16 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fp16 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fp16 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for Fp16 {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

// ------------------------------- Tests ---------------------------------------
