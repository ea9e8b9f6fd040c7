//! Fuzzy inference systems (Mamdani, Sugeno and Tsukamoto).
//!
//! Goals
//! - Fixed storage: inputs, outputs, membership functions and rule strengths
//!   live in arrays sized by const generics, rules are borrowed.
//! - Rules are written with [`fis_rules!`](crate::fis_rules) and checked once
//!   when the system is built.
//!
//! Pipeline
//! ```text
//! set_input(..) -> fuzzify() -> inference() -> defuzzify() -> output(..)
//! ```
//!
//! Notes
//! - Tags are plain `usize` indices; name them with `const`s.
//! - Mamdani outputs are sampled at `points` evenly spaced positions
//!   (`x_k = min + (k + 0.5)·(max - min)/points`).
//! - When no rule contributes to an output, defuzzification falls back to
//!   the middle of the output range.

use crate::backend;
use crate::error::{FisError, SetupError};
use crate::mathex;

/// Inference flavour.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FisType {
    /// Rule consequents are fuzzy sets.
    Mamdani,
    /// Rule consequents are constant or linear functions of the inputs.
    Sugeno,
    /// Rule consequents are monotonic sets inverted at the rule strength.
    Tsukamoto,
}

/// Fuzzy operators. Every result is clamped to `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FuzzyOp {
    Min,
    Prod,
    Max,
    ProbOr,
    Sum,
}

impl FuzzyOp {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        let y = match self {
            FuzzyOp::Min => a.min(b),
            FuzzyOp::Prod => a * b,
            FuzzyOp::Max => a.max(b),
            FuzzyOp::ProbOr => a + b - a * b,
            FuzzyOp::Sum => a + b,
        };
        unit(y)
    }
}

/// Tunables accepted by [`Fis::set_parameter`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FisParameter {
    /// `Min` or `Prod`.
    And(FuzzyOp),
    /// `Max` or `ProbOr`.
    Or(FuzzyOp),
    /// `Min` or `Prod`.
    Implication(FuzzyOp),
    /// `Max`, `ProbOr` or `Sum`.
    Aggregation(FuzzyOp),
    /// Number of samples along each Mamdani output, at least 2.
    EvalPoints(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DefuzzMethod {
    Centroid,
    Bisector,
    /// Middle of maximum.
    Mom,
    /// Largest of maximum.
    Lom,
    /// Smallest of maximum.
    Som,
    WtAver,
    WtSum,
}

impl DefuzzMethod {
    fn fits(self, kind: FisType) -> bool {
        match kind {
            FisType::Mamdani => !matches!(self, DefuzzMethod::WtAver | DefuzzMethod::WtSum),
            FisType::Sugeno => matches!(self, DefuzzMethod::WtAver | DefuzzMethod::WtSum),
            FisType::Tsukamoto => self == DefuzzMethod::WtAver,
        }
    }
}

/// User membership function: `values` holds the evaluated variable (or all
/// inputs for a Sugeno consequent), `params` the attached parameters.
pub type CustomMf = fn(values: &[f64], params: &[f64]) -> f64;

// ----------------------------- Membership shapes -----------------------------

/// Membership function shapes with their parameters.
///
/// `Constant` and `Linear` are Sugeno consequents. The `T*` variants are
/// Tsukamoto consequents: they map a rule strength back onto the output
/// range. `Linear` takes one gain per input followed by a bias.
#[derive(Copy, Clone, Debug)]
pub enum MfShape<'a> {
    Tri(f64, f64, f64),
    Trap(f64, f64, f64, f64),
    /// width, slope, center
    GBell(f64, f64, f64),
    /// sigma, center
    Gauss(f64, f64),
    /// sigma1, center1, sigma2, center2
    Gauss2(f64, f64, f64, f64),
    /// slope, inflection
    Sig(f64, f64),
    DSig(f64, f64, f64, f64),
    PSig(f64, f64, f64, f64),
    Pi(f64, f64, f64, f64),
    S(f64, f64),
    Z(f64, f64),
    Singleton(f64),
    /// inflection, end
    Concave(f64, f64),
    /// width, center
    Spike(f64, f64),
    LinS(f64, f64),
    LinZ(f64, f64),
    /// start, end
    Rect(f64, f64),
    /// center, width
    Cosine(f64, f64),
    Constant(f64),
    Linear(&'a [f64]),
    TLinS(f64, f64),
    TLinZ(f64, f64),
    TConcave(f64, f64),
    TSig(f64, f64),
    TS(f64, f64),
    TZ(f64, f64),
    Custom(CustomMf, &'a [f64]),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Family {
    Fuzzy,
    Sugeno,
    Tsukamoto,
    Any,
}

impl MfShape<'_> {
    fn family(&self) -> Family {
        match self {
            MfShape::Constant(_) | MfShape::Linear(_) => Family::Sugeno,
            MfShape::TLinS(..)
            | MfShape::TLinZ(..)
            | MfShape::TConcave(..)
            | MfShape::TSig(..)
            | MfShape::TS(..)
            | MfShape::TZ(..) => Family::Tsukamoto,
            MfShape::Custom(..) => Family::Any,
            _ => Family::Fuzzy,
        }
    }

    /// Evaluate the shape at `x`. `[min, max]` is the range of the variable
    /// the shape belongs to; only `TSig` reads it.
    pub fn eval(&self, x: f64, min: f64, max: f64) -> f64 {
        match *self {
            MfShape::Tri(a, b, c) => unit(((x - a) / (b - a)).min((c - x) / (c - b))),
            MfShape::Trap(a, b, c, d) => unit(((x - a) / (b - a)).min(1.0).min((d - x) / (d - c))),
            MfShape::GBell(a, b, c) => 1.0 / (1.0 + backend::powf(backend::abs((x - c) / a), 2.0 * b)),
            MfShape::Gauss(s, c) => gauss(x, s, c),
            MfShape::Gauss2(s1, c1, s2, c2) => {
                let left = if x <= c1 { gauss(x, s1, c1) } else { 1.0 };
                let right = if x >= c2 { gauss(x, s2, c2) } else { 1.0 };
                left * right
            }
            MfShape::Sig(a, c) => sig(x, a, c),
            MfShape::DSig(a1, c1, a2, c2) => backend::abs(sig(x, a1, c1) - sig(x, a2, c2)),
            MfShape::PSig(a1, c1, a2, c2) => backend::abs(sig(x, a1, c1) * sig(x, a2, c2)),
            MfShape::Pi(a, b, c, d) => backend::abs(smf(x, a, b) * zmf(x, c, d)),
            MfShape::S(a, b) => smf(x, a, b),
            MfShape::Z(a, b) => zmf(x, a, b),
            MfShape::Singleton(a) => {
                if mathex::is_equal(x, a, f64::EPSILON) {
                    1.0
                } else {
                    0.0
                }
            }
            MfShape::Concave(i, e) => concave(x, i, e),
            MfShape::Spike(w, c) => backend::exp(-backend::abs(10.0 * (x - c) / w)),
            MfShape::LinS(a, b) => lin_s(x, a, b),
            MfShape::LinZ(a, b) => 1.0 - lin_s(x, a, b),
            MfShape::Rect(s, e) => {
                if x >= s && x <= e {
                    1.0
                } else {
                    0.0
                }
            }
            MfShape::Cosine(c, w) => {
                if x < c - 0.5 * w || x > c + 0.5 * w {
                    0.0
                } else {
                    0.5 * (1.0 + backend::cos(2.0 * core::f64::consts::PI * (x - c) / w))
                }
            }
            MfShape::Constant(k) => k,
            MfShape::Linear(coeffs) => linear(&[x], coeffs),
            MfShape::TLinS(a, b) => (b - a) * x + a,
            MfShape::TLinZ(a, b) => a - (a - b) * x,
            MfShape::TConcave(i, e) => (i - e) / x + 2.0 * e - i,
            MfShape::TSig(a, c) => {
                if mathex::is_equal(x, 1.0, f64::EPSILON) {
                    if a >= 0.0 { max } else { min }
                } else if mathex::is_equal(x, 0.0, f64::EPSILON) {
                    if a >= 0.0 { min } else { max }
                } else {
                    c - backend::ln(1.0 / x - 1.0) / a
                }
            }
            MfShape::TS(a, b) => {
                let half = 0.5 * (b - a) * (b - a);
                let lo = a + backend::sqrt(x * half);
                let hi = b - backend::sqrt((1.0 - x) * half);
                closest(x, lo, hi, |t| smf(t, a, b))
            }
            MfShape::TZ(a, b) => {
                let half = 0.5 * (b - a) * (b - a);
                let lo = a + backend::sqrt((1.0 - x) * half);
                let hi = b - backend::sqrt(x * half);
                closest(x, lo, hi, |t| zmf(t, a, b))
            }
            MfShape::Custom(f, params) => f(&[x], params),
        }
    }

    /// Evaluate a Sugeno consequent on the full input vector.
    fn eval_inputs(&self, inputs: &[f64]) -> f64 {
        match *self {
            MfShape::Constant(k) => k,
            MfShape::Linear(coeffs) => linear(inputs, coeffs),
            MfShape::Custom(f, params) => f(inputs, params),
            _ => 0.0,
        }
    }
}

#[inline]
fn unit(y: f64) -> f64 {
    y.max(0.0).min(1.0)
}

#[inline]
fn gauss(x: f64, s: f64, c: f64) -> f64 {
    let t = (x - c) / s;
    backend::exp(-0.5 * t * t)
}

#[inline]
fn sig(x: f64, a: f64, c: f64) -> f64 {
    1.0 / (1.0 + backend::exp(-a * (x - c)))
}

fn smf(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        0.0
    } else if x >= b {
        1.0
    } else if x <= 0.5 * (a + b) {
        let t = (x - a) / (b - a);
        2.0 * t * t
    } else {
        let t = (x - b) / (b - a);
        1.0 - 2.0 * t * t
    }
}

#[inline]
fn zmf(x: f64, a: f64, b: f64) -> f64 {
    1.0 - smf(x, a, b)
}

fn concave(x: f64, i: f64, e: f64) -> f64 {
    if i <= e && x < e {
        (e - i) / (2.0 * e - i - x)
    } else if i > e && x > e {
        (i - e) / (i + x - 2.0 * e)
    } else {
        1.0
    }
}

/// Linear ramp from 0 at `a` to 1 at `b`.
fn lin_s(x: f64, a: f64, b: f64) -> f64 {
    if mathex::is_equal(a, b, f64::EPSILON) {
        return if x < a { 0.0 } else { 1.0 };
    }
    unit((x - a) / (b - a))
}

fn linear(values: &[f64], coeffs: &[f64]) -> f64 {
    match coeffs.split_last() {
        Some((bias, gains)) => values.iter().zip(gains).map(|(v, g)| v * g).sum::<f64>() + bias,
        None => 0.0,
    }
}

/// Pick the inverse candidate whose forward value lands closest to `y`.
fn closest(y: f64, lo: f64, hi: f64, forward: impl Fn(f64) -> f64) -> f64 {
    if backend::abs(y - forward(lo)) < backend::abs(y - forward(hi)) {
        lo
    } else {
        hi
    }
}

// ----------------------------- Rules -----------------------------

/// How a clause joins the strength accumulated so far.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Join {
    If,
    And,
    Or,
}

/// `io IS mf` (or `IS_NOT` when `negated`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Term {
    pub io: usize,
    pub mf: usize,
    pub negated: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    pub join: Join,
    pub term: Term,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rule<'a> {
    pub antecedent: &'a [Clause],
    pub consequent: &'a [Term],
}

/// Build a rule table.
///
/// ```
/// use qlibs_core::fis::Rule;
/// use qlibs_core::fis_rules;
///
/// const ERR: usize = 0;
/// const RATE: usize = 1;
/// const PUSH: usize = 0;
/// const NEG: usize = 0;
/// const POS: usize = 1;
/// const SLOW: usize = 2;
/// const BACK: usize = 0;
/// const AHEAD: usize = 1;
///
/// static RULES: [Rule<'static>; 2] = fis_rules! {
///     IF ERR IS NEG AND RATE IS_NOT SLOW THEN PUSH IS BACK END
///     IF ERR IS POS OR RATE IS SLOW THEN PUSH IS AHEAD END
/// };
/// assert_eq!(RULES[0].antecedent.len(), 2);
/// assert!(RULES[0].antecedent[1].term.negated);
/// ```
#[macro_export]
macro_rules! fis_rules {
    ($($body:tt)*) => {
        $crate::__fis_rules!(@rules [] $($body)*)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __fis_rules {
    (@rules [$($done:tt)*]) => {
        [$($done)*]
    };
    (@rules $done:tt IF $io:tt IS $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@ante $done [$crate::__fis_rules!(@clause If $io $mf false),] $($rest)*)
    };
    (@rules $done:tt IF $io:tt IS_NOT $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@ante $done [$crate::__fis_rules!(@clause If $io $mf true),] $($rest)*)
    };
    (@ante $done:tt [$($a:tt)*] AND $io:tt IS $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@ante $done [$($a)* $crate::__fis_rules!(@clause And $io $mf false),] $($rest)*)
    };
    (@ante $done:tt [$($a:tt)*] AND $io:tt IS_NOT $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@ante $done [$($a)* $crate::__fis_rules!(@clause And $io $mf true),] $($rest)*)
    };
    (@ante $done:tt [$($a:tt)*] OR $io:tt IS $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@ante $done [$($a)* $crate::__fis_rules!(@clause Or $io $mf false),] $($rest)*)
    };
    (@ante $done:tt [$($a:tt)*] OR $io:tt IS_NOT $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@ante $done [$($a)* $crate::__fis_rules!(@clause Or $io $mf true),] $($rest)*)
    };
    (@ante $done:tt $ante:tt THEN $io:tt IS $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@cons $done $ante [$crate::__fis_rules!(@term $io $mf false),] $($rest)*)
    };
    (@ante $done:tt $ante:tt THEN $io:tt IS_NOT $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@cons $done $ante [$crate::__fis_rules!(@term $io $mf true),] $($rest)*)
    };
    (@cons $done:tt $ante:tt [$($c:tt)*] AND $io:tt IS $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@cons $done $ante [$($c)* $crate::__fis_rules!(@term $io $mf false),] $($rest)*)
    };
    (@cons $done:tt $ante:tt [$($c:tt)*] AND $io:tt IS_NOT $mf:tt $($rest:tt)*) => {
        $crate::__fis_rules!(@cons $done $ante [$($c)* $crate::__fis_rules!(@term $io $mf true),] $($rest)*)
    };
    (@cons [$($done:tt)*] [$($a:tt)*] [$($c:tt)*] END $($rest:tt)*) => {
        $crate::__fis_rules!(@rules [$($done)* $crate::fis::Rule { antecedent: &[$($a)*], consequent: &[$($c)*] },] $($rest)*)
    };
    (@clause $join:ident $io:tt $mf:tt $neg:literal) => {
        $crate::fis::Clause { join: $crate::fis::Join::$join, term: $crate::__fis_rules!(@term $io $mf $neg) }
    };
    (@term $io:tt $mf:tt $neg:literal) => {
        $crate::fis::Term { io: $io, mf: $mf, negated: $neg }
    };
}

// ----------------------------- Inference engine -----------------------------

#[derive(Copy, Clone, Debug)]
struct Variable {
    min: f64,
    max: f64,
    value: f64,
}

impl Variable {
    const UNIT: Self = Self { min: 0.0, max: 1.0, value: 0.0 };

    #[inline]
    fn mid(&self) -> f64 {
        0.5 * (self.min + self.max)
    }
}

#[derive(Copy, Clone, Debug)]
struct Membership<'a> {
    io: usize,
    shape: MfShape<'a>,
    h: f64,
    fx: f64,
}

/// Fuzzy inference system with `NI` inputs, `NO` outputs, `NMI`/`NMO` input
/// and output membership functions and `NR` rules.
#[derive(Copy, Clone, Debug)]
pub struct Fis<'a, const NI: usize, const NO: usize, const NMI: usize, const NMO: usize, const NR: usize> {
    kind: FisType,
    rules: &'a [Rule<'a>; NR],
    inputs: [Variable; NI],
    outputs: [Variable; NO],
    in_mf: [Option<Membership<'a>>; NMI],
    out_mf: [Option<Membership<'a>>; NMO],
    strength: [f64; NR],
    weights: [f64; NR],
    and_op: FuzzyOp,
    or_op: FuzzyOp,
    implication: FuzzyOp,
    aggregation: FuzzyOp,
    points: usize,
    defuzz: DefuzzMethod,
}

impl<'a, const NI: usize, const NO: usize, const NMI: usize, const NMO: usize, const NR: usize>
    Fis<'a, NI, NO, NMI, NMO, NR>
{
    /// Build a system over `rules`. Every rule must start with an `IF`
    /// clause and reference existing inputs, outputs and membership slots.
    pub fn new(kind: FisType, rules: &'a [Rule<'a>; NR]) -> Result<Self, FisError> {
        const { assert!(NI > 0 && NO > 0 && NR > 0, "a fuzzy system needs inputs, outputs and rules") };
        if let Some(bad) = rules.iter().position(|r| !Self::rule_is_valid(r)) {
            return Err(FisError::InvalidRule(bad));
        }
        Ok(Self {
            kind,
            rules,
            inputs: [Variable::UNIT; NI],
            outputs: [Variable::UNIT; NO],
            in_mf: [None; NMI],
            out_mf: [None; NMO],
            strength: [0.0; NR],
            weights: [1.0; NR],
            and_op: FuzzyOp::Min,
            or_op: FuzzyOp::Max,
            implication: FuzzyOp::Min,
            aggregation: FuzzyOp::Max,
            points: 100,
            defuzz: match kind {
                FisType::Mamdani => DefuzzMethod::Centroid,
                FisType::Sugeno | FisType::Tsukamoto => DefuzzMethod::WtAver,
            },
        })
    }

    fn rule_is_valid(rule: &Rule<'_>) -> bool {
        let Some((first, rest)) = rule.antecedent.split_first() else {
            return false;
        };
        first.join == Join::If
            && rest.iter().all(|c| c.join != Join::If)
            && rule.antecedent.iter().all(|c| c.term.io < NI && c.term.mf < NMI)
            && !rule.consequent.is_empty()
            && rule.consequent.iter().all(|t| t.io < NO && t.mf < NMO)
    }

    #[inline]
    pub fn kind(&self) -> FisType {
        self.kind
    }

    pub fn setup_input(&mut self, tag: usize, min: f64, max: f64) -> Result<(), FisError> {
        let v = self.inputs.get_mut(tag).ok_or(FisError::UnknownInput(tag))?;
        if !(min < max) {
            return Err(SetupError::InvalidLimits.into());
        }
        *v = Variable { min, max, value: v.value.max(min).min(max) };
        Ok(())
    }

    pub fn setup_output(&mut self, tag: usize, min: f64, max: f64) -> Result<(), FisError> {
        let v = self.outputs.get_mut(tag).ok_or(FisError::UnknownOutput(tag))?;
        if !(min < max) {
            return Err(SetupError::InvalidLimits.into());
        }
        *v = Variable { min, max, value: 0.5 * (min + max) };
        Ok(())
    }

    /// Attach membership function `mf` to input `io`. The height `h` is
    /// clamped to `[0, 1]`.
    pub fn set_input_mf(&mut self, mf: usize, io: usize, shape: MfShape<'a>, h: f64) -> Result<(), FisError> {
        if io >= NI {
            return Err(FisError::UnknownInput(io));
        }
        if !matches!(shape.family(), Family::Fuzzy | Family::Any) {
            return Err(FisError::InvalidShape);
        }
        let slot = self.in_mf.get_mut(mf).ok_or(FisError::UnknownMembership(mf))?;
        *slot = Some(Membership { io, shape, h: unit(h), fx: 0.0 });
        Ok(())
    }

    /// Attach membership function `mf` to output `io`. The shape must suit
    /// the system type; a `Linear` consequent needs `NI + 1` coefficients.
    pub fn set_output_mf(&mut self, mf: usize, io: usize, shape: MfShape<'a>, h: f64) -> Result<(), FisError> {
        if io >= NO {
            return Err(FisError::UnknownOutput(io));
        }
        let wanted = match self.kind {
            FisType::Mamdani => Family::Fuzzy,
            FisType::Sugeno => Family::Sugeno,
            FisType::Tsukamoto => Family::Tsukamoto,
        };
        let family = shape.family();
        if family != wanted && family != Family::Any {
            return Err(FisError::InvalidShape);
        }
        if let MfShape::Linear(coeffs) = shape {
            if coeffs.len() != NI + 1 {
                return Err(SetupError::LengthMismatch(coeffs.len(), NI + 1).into());
            }
        }
        let slot = self.out_mf.get_mut(mf).ok_or(FisError::UnknownMembership(mf))?;
        *slot = Some(Membership { io, shape, h: unit(h), fx: 0.0 });
        Ok(())
    }

    pub fn set_parameter(&mut self, param: FisParameter) -> Result<(), FisError> {
        use FuzzyOp::*;
        match param {
            FisParameter::And(op @ (Min | Prod)) => self.and_op = op,
            FisParameter::Or(op @ (Max | ProbOr)) => self.or_op = op,
            FisParameter::Implication(op @ (Min | Prod)) => self.implication = op,
            FisParameter::Aggregation(op @ (Max | ProbOr | Sum)) => self.aggregation = op,
            FisParameter::EvalPoints(n) if n >= 2 => self.points = n,
            FisParameter::And(_) => return Err(SetupError::OutOfRange { name: "and" }.into()),
            FisParameter::Or(_) => return Err(SetupError::OutOfRange { name: "or" }.into()),
            FisParameter::Implication(_) => return Err(SetupError::OutOfRange { name: "implication" }.into()),
            FisParameter::Aggregation(_) => return Err(SetupError::OutOfRange { name: "aggregation" }.into()),
            FisParameter::EvalPoints(_) => return Err(SetupError::OutOfRange { name: "points" }.into()),
        }
        Ok(())
    }

    pub fn set_defuzz_method(&mut self, method: DefuzzMethod) -> Result<(), FisError> {
        if !method.fits(self.kind) {
            return Err(FisError::InvalidDefuzzMethod);
        }
        self.defuzz = method;
        Ok(())
    }

    #[inline]
    pub fn defuzz_method(&self) -> DefuzzMethod {
        self.defuzz
    }

    /// Scale each rule strength by a weight clamped to `[0, 1]`.
    pub fn set_rule_weights(&mut self, weights: &[f64; NR]) {
        for (dst, &w) in self.weights.iter_mut().zip(weights) {
            *dst = unit(w);
        }
    }

    /// Set a crisp input; the value is clamped to the input range.
    pub fn set_input(&mut self, tag: usize, value: f64) -> Result<(), FisError> {
        let v = self.inputs.get_mut(tag).ok_or(FisError::UnknownInput(tag))?;
        v.value = value.max(v.min).min(v.max);
        Ok(())
    }

    pub fn input(&self, tag: usize) -> Result<f64, FisError> {
        self.inputs.get(tag).map(|v| v.value).ok_or(FisError::UnknownInput(tag))
    }

    /// Crisp value of an output after [`Fis::defuzzify`].
    pub fn output(&self, tag: usize) -> Result<f64, FisError> {
        self.outputs.get(tag).map(|v| v.value).ok_or(FisError::UnknownOutput(tag))
    }

    /// Firing strength of each rule from the last [`Fis::inference`].
    #[inline]
    pub fn rule_strengths(&self) -> &[f64; NR] {
        &self.strength
    }

    /// Evaluate every input membership function at the current inputs.
    pub fn fuzzify(&mut self) {
        for m in self.in_mf.iter_mut().flatten() {
            let v = self.inputs[m.io];
            m.fx = m.h * m.shape.eval(v.value, v.min, v.max);
        }
    }

    /// Compute rule strengths. Returns `Ok(false)` when no rule fires.
    ///
    /// Fails when a rule clause names an unset membership function or one
    /// bound to another input.
    pub fn inference(&mut self) -> Result<bool, FisError> {
        let rules = self.rules;
        let mut fired = false;
        for (r, rule) in rules.iter().enumerate() {
            let mut s = 0.0;
            for clause in rule.antecedent {
                let m = self.in_mf[clause.term.mf]
                    .filter(|m| m.io == clause.term.io)
                    .ok_or(FisError::InvalidRule(r))?;
                let mu = unit(m.fx);
                let mu = if clause.term.negated { 1.0 - mu } else { mu };
                let op = match clause.join {
                    Join::If => FuzzyOp::Sum,
                    Join::And => self.and_op,
                    Join::Or => self.or_op,
                };
                s = op.apply(s, mu);
            }
            let w = s * self.weights[r];
            self.strength[r] = w;
            fired |= w > 0.0;
        }
        Ok(fired)
    }

    /// Turn rule strengths into crisp outputs, each clamped to its range.
    pub fn defuzzify(&mut self) {
        for o in 0..NO {
            let value = match self.kind {
                FisType::Mamdani => self.defuzz_sampled(o),
                FisType::Sugeno | FisType::Tsukamoto => self.defuzz_weighted(o),
            };
            let out = &mut self.outputs[o];
            out.value = value.max(out.min).min(out.max);
        }
    }

    /// Height of the aggregated Mamdani region of `output` at `x`, built from
    /// the strengths of the last [`Fis::inference`].
    pub fn aggregated_at(&self, output: usize, x: f64) -> Result<f64, FisError> {
        if output >= NO {
            return Err(FisError::UnknownOutput(output));
        }
        Ok(self.aggregate(output, x))
    }

    fn aggregate(&self, o: usize, x: f64) -> f64 {
        let out = self.outputs[o];
        let mut y = 0.0;
        for (rule, &w) in self.rules.iter().zip(&self.strength) {
            if w <= 0.0 {
                continue;
            }
            for t in rule.consequent.iter().filter(|t| t.io == o) {
                let Some(m) = self.out_mf[t.mf] else { continue };
                let v = m.h * m.shape.eval(x, out.min, out.max);
                let v = if t.negated { 1.0 - v } else { v };
                y = self.aggregation.apply(y, self.implication.apply(w, v));
            }
        }
        y
    }

    fn defuzz_sampled(&self, o: usize) -> f64 {
        let out = self.outputs[o];
        let res = (out.max - out.min) / self.points as f64;
        let xs = (0..self.points).map(|k| out.min + (k as f64 + 0.5) * res);
        let samples = xs.map(|x| (x, self.aggregate(o, x)));

        match self.defuzz {
            DefuzzMethod::Centroid => {
                let (sxy, sy) = samples.fold((0.0, 0.0), |(sxy, sy), (x, y)| (sxy + x * y, sy + y));
                if sy > 0.0 { sxy / sy } else { out.mid() }
            }
            DefuzzMethod::Bisector => {
                let total: f64 = samples.clone().map(|(_, y)| y).sum();
                if total <= 0.0 {
                    return out.mid();
                }
                let half = 0.5 * total;
                let mut area = 0.0;
                for (x, y) in samples {
                    area += y;
                    if area >= half {
                        return x;
                    }
                }
                out.max
            }
            DefuzzMethod::Lom => {
                let (mut y_max, mut at) = (-1.0, out.max);
                for (x, y) in samples {
                    if y >= y_max {
                        y_max = y;
                        at = x;
                    }
                }
                at
            }
            DefuzzMethod::Som => {
                let (mut y_max, mut at) = (-1.0, out.min);
                for (x, y) in samples {
                    if y > y_max {
                        y_max = y;
                        at = x;
                    }
                }
                at
            }
            DefuzzMethod::Mom => {
                let (mut y_max, mut lo, mut hi) = (-1.0, out.min, out.max);
                let mut on_plateau = false;
                for (x, y) in samples {
                    if y > y_max {
                        y_max = y;
                        lo = x;
                        hi = x;
                        on_plateau = true;
                    } else if on_plateau && mathex::is_equal(y, y_max, f64::EPSILON) {
                        hi = x;
                    } else if y < y_max {
                        on_plateau = false;
                    }
                }
                0.5 * (lo + hi)
            }
            // rejected by `set_defuzz_method` for Mamdani systems
            DefuzzMethod::WtAver | DefuzzMethod::WtSum => out.mid(),
        }
    }

    fn defuzz_weighted(&self, o: usize) -> f64 {
        let out = self.outputs[o];
        let inputs: [f64; NI] = core::array::from_fn(|i| self.inputs[i].value);
        let (mut wz, mut sw) = (0.0, 0.0);
        for (rule, &w) in self.rules.iter().zip(&self.strength) {
            if w <= 0.0 {
                continue;
            }
            for t in rule.consequent.iter().filter(|t| t.io == o) {
                let Some(m) = self.out_mf[t.mf] else { continue };
                let z = match self.kind {
                    FisType::Tsukamoto => m.shape.eval(w, out.min, out.max),
                    _ => m.shape.eval_inputs(&inputs),
                };
                wz += z * w;
                sw += w;
            }
        }
        match self.defuzz {
            DefuzzMethod::WtSum => wz,
            _ if sw > 0.0 => wz / sw,
            _ => out.mid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    static TIPPER: [Rule<'static>; 3] = fis_rules! {
        IF SERVICE IS POOR OR FOOD IS RANCID THEN TIP IS CHEAP END
        IF SERVICE IS GOOD THEN TIP IS AVERAGE END
        IF SERVICE IS EXCELLENT OR FOOD IS DELICIOUS THEN TIP IS GENEROUS END
    };

    fn tipper() -> Fis<'static, 2, 1, 5, 3, 3> {
        let mut f = Fis::new(FisType::Mamdani, &TIPPER).unwrap();
        f.setup_input(SERVICE, 0.0, 10.0).unwrap();
        f.setup_input(FOOD, 0.0, 10.0).unwrap();
        f.setup_output(TIP, 0.0, 30.0).unwrap();
        f.set_input_mf(POOR, SERVICE, MfShape::Gauss(1.5, 0.0), 1.0).unwrap();
        f.set_input_mf(GOOD, SERVICE, MfShape::Gauss(1.5, 5.0), 1.0).unwrap();
        f.set_input_mf(EXCELLENT, SERVICE, MfShape::Gauss(1.5, 10.0), 1.0).unwrap();
        f.set_input_mf(RANCID, FOOD, MfShape::Trap(0.0, 0.0, 1.0, 3.0), 1.0).unwrap();
        f.set_input_mf(DELICIOUS, FOOD, MfShape::Trap(7.0, 9.0, 10.0, 10.0), 1.0).unwrap();
        f.set_output_mf(CHEAP, TIP, MfShape::Tri(0.0, 5.0, 10.0), 1.0).unwrap();
        f.set_output_mf(AVERAGE, TIP, MfShape::Tri(10.0, 15.0, 20.0), 1.0).unwrap();
        f.set_output_mf(GENEROUS, TIP, MfShape::Tri(20.0, 25.0, 30.0), 1.0).unwrap();
        f
    }

    fn run(f: &mut Fis<'static, 2, 1, 5, 3, 3>, service: f64, food: f64) -> f64 {
        f.set_input(SERVICE, service).unwrap();
        f.set_input(FOOD, food).unwrap();
        f.fuzzify();
        assert!(f.inference().unwrap());
        f.defuzzify();
        f.output(TIP).unwrap()
    }

    #[test]
    fn macro_builds_the_expected_rule_table() {
        assert_eq!(TIPPER[0].antecedent.len(), 2);
        assert_eq!(TIPPER[0].antecedent[1].join, Join::Or);
        assert_eq!(TIPPER[1].consequent, &[Term { io: TIP, mf: AVERAGE, negated: false }]);
        static NEGATED: [Rule<'static>; 1] = fis_rules! {
            IF 0 IS_NOT 1 AND 1 IS 0 THEN 0 IS 2 AND 1 IS_NOT 0 END
        };
        let r = NEGATED[0];
        assert!(r.antecedent[0].term.negated && !r.antecedent[1].term.negated);
        assert_eq!(r.antecedent[1].join, Join::And);
        assert_eq!(r.consequent.len(), 2);
        assert!(r.consequent[1].negated);
    }

    #[test]
    fn tipper_centroid() {
        let mut f = tipper();
        let cases = [(1.0, 9.0, 15.1977), (5.0, 5.0, 15.0), (10.0, 10.0, 24.9228)];
        for (service, food, want) in cases {
            let tip = run(&mut f, service, food);
            assert!((tip - want).abs() < 1e-3, "service={service} food={food} tip={tip} want={want}");
        }
    }

    #[test]
    fn aggregated_region_follows_clipped_consequents() {
        let mut f = tipper();
        run(&mut f, 1.0, 9.0);
        let poor = (-0.5 * (1.0_f64 / 1.5).powi(2)).exp();
        assert!((f.aggregated_at(TIP, 5.0).unwrap() - poor).abs() < 1e-9);
        assert!((f.aggregated_at(TIP, 25.0).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(f.aggregated_at(1, 0.0), Err(FisError::UnknownOutput(1)));
    }

    #[test]
    fn inputs_are_clamped() {
        let mut f = tipper();
        f.set_input(SERVICE, 42.0).unwrap();
        assert_eq!(f.input(SERVICE).unwrap(), 10.0);
        f.set_input(FOOD, -3.0).unwrap();
        assert_eq!(f.input(FOOD).unwrap(), 0.0);
        assert_eq!(f.set_input(7, 0.0), Err(FisError::UnknownInput(7)));
    }

    #[test]
    fn rule_weights_scale_strengths() {
        let mut f = tipper();
        f.set_rule_weights(&[1.0, 0.5, 2.0]);
        f.set_input(SERVICE, 5.0).unwrap();
        f.set_input(FOOD, 5.0).unwrap();
        f.fuzzify();
        f.inference().unwrap();
        let s = f.rule_strengths();
        assert!((s[1] - 0.5).abs() < 1e-12, "strength={}", s[1]);
    }

    #[test]
    fn bad_rules_and_settings_are_rejected() {
        static OUT_OF_RANGE: [Rule<'static>; 1] = fis_rules! { IF 2 IS 0 THEN 0 IS 0 END };
        let r = Fis::<2, 1, 5, 3, 1>::new(FisType::Mamdani, &OUT_OF_RANGE);
        assert_eq!(r.err(), Some(FisError::InvalidRule(0)));

        let mut f = tipper();
        assert_eq!(f.set_defuzz_method(DefuzzMethod::WtAver), Err(FisError::InvalidDefuzzMethod));
        assert!(f.set_defuzz_method(DefuzzMethod::Bisector).is_ok());
        assert!(f.set_parameter(FisParameter::And(FuzzyOp::Prod)).is_ok());
        assert!(f.set_parameter(FisParameter::And(FuzzyOp::Max)).is_err());
        assert!(f.set_parameter(FisParameter::Aggregation(FuzzyOp::Sum)).is_ok());
        assert!(f.set_parameter(FisParameter::EvalPoints(1)).is_err());
        assert_eq!(f.set_output_mf(0, TIP, MfShape::Constant(1.0), 1.0), Err(FisError::InvalidShape));
        assert_eq!(f.set_input_mf(9, SERVICE, MfShape::Tri(0.0, 1.0, 2.0), 1.0), Err(FisError::UnknownMembership(9)));
        assert_eq!(f.setup_input(SERVICE, 3.0, 3.0), Err(FisError::Setup(SetupError::InvalidLimits)));
    }

    #[test]
    fn unset_membership_fails_inference() {
        let mut f = Fis::<2, 1, 5, 3, 3>::new(FisType::Mamdani, &TIPPER).unwrap();
        f.fuzzify();
        assert_eq!(f.inference(), Err(FisError::InvalidRule(0)));
    }

    static PLATEAU: [Rule<'static>; 1] = fis_rules! { IF 0 IS 0 THEN 0 IS 0 END };

    fn plateau(method: DefuzzMethod) -> f64 {
        let mut f = Fis::<1, 1, 1, 1, 1>::new(FisType::Mamdani, &PLATEAU).unwrap();
        f.setup_output(0, 0.0, 30.0).unwrap();
        f.set_input_mf(0, 0, MfShape::Rect(0.0, 1.0), 1.0).unwrap();
        f.set_output_mf(0, 0, MfShape::Rect(10.0, 20.0), 1.0).unwrap();
        f.set_defuzz_method(method).unwrap();
        f.set_input(0, 0.5).unwrap();
        f.fuzzify();
        assert!(f.inference().unwrap());
        f.defuzzify();
        f.output(0).unwrap()
    }

    #[test]
    fn maximum_based_defuzzifiers_on_a_plateau() {
        assert!((plateau(DefuzzMethod::Som) - 10.05).abs() < 1e-6);
        assert!((plateau(DefuzzMethod::Lom) - 19.95).abs() < 1e-6);
        assert!((plateau(DefuzzMethod::Mom) - 15.0).abs() < 1e-6);
        assert!((plateau(DefuzzMethod::Centroid) - 15.0).abs() < 1e-6);
        assert!((plateau(DefuzzMethod::Bisector) - 15.0).abs() < 0.31);
    }

    static LOW_HIGH: [Rule<'static>; 2] = fis_rules! {
        IF 0 IS 0 THEN 0 IS 0 END
        IF 0 IS 1 THEN 0 IS 1 END
    };

    fn low_high(kind: FisType, lo: MfShape<'static>, hi: MfShape<'static>, x: f64) -> f64 {
        let mut f = Fis::<1, 1, 2, 2, 2>::new(kind, &LOW_HIGH).unwrap();
        f.setup_output(0, 0.0, 10.0).unwrap();
        f.set_input_mf(0, 0, MfShape::LinZ(0.0, 1.0), 1.0).unwrap();
        f.set_input_mf(1, 0, MfShape::LinS(0.0, 1.0), 1.0).unwrap();
        f.set_output_mf(0, 0, lo, 1.0).unwrap();
        f.set_output_mf(1, 0, hi, 1.0).unwrap();
        f.set_input(0, x).unwrap();
        f.fuzzify();
        assert!(f.inference().unwrap());
        f.defuzzify();
        f.output(0).unwrap()
    }

    #[test]
    fn sugeno_weighted_average() {
        let y = low_high(FisType::Sugeno, MfShape::Constant(0.0), MfShape::Constant(10.0), 0.3);
        assert!((y - 3.0).abs() < 1e-12, "y={y}");
        static GAINS: [f64; 2] = [4.0, 1.0];
        let y = low_high(FisType::Sugeno, MfShape::Constant(1.0), MfShape::Linear(&GAINS), 0.5);
        // 0.5·1 + 0.5·(4·0.5 + 1)
        assert!((y - 2.0).abs() < 1e-12, "y={y}");
    }

    #[test]
    fn tsukamoto_inverts_monotonic_consequents() {
        let y = low_high(FisType::Tsukamoto, MfShape::TLinZ(10.0, 0.0), MfShape::TLinS(0.0, 10.0), 0.3);
        assert!((y - 3.0).abs() < 1e-12, "y={y}");
    }

    #[test]
    fn nothing_fires_reports_false() {
        let mut f = Fis::<1, 1, 1, 1, 1>::new(FisType::Mamdani, &PLATEAU).unwrap();
        f.set_input_mf(0, 0, MfShape::Rect(0.6, 1.0), 1.0).unwrap();
        f.set_output_mf(0, 0, MfShape::Tri(0.0, 0.5, 1.0), 1.0).unwrap();
        f.set_input(0, 0.2).unwrap();
        f.fuzzify();
        assert_eq!(f.inference(), Ok(false));
        f.defuzzify();
        assert_eq!(f.output(0).unwrap(), 0.5);
    }

    #[test]
    fn shapes() {
        let at = |s: MfShape<'static>, x: f64| s.eval(x, 0.0, 1.0);
        assert_eq!(at(MfShape::Tri(0.0, 1.0, 2.0), 0.5), 0.5);
        assert_eq!(at(MfShape::Tri(0.0, 1.0, 2.0), 3.0), 0.0);
        assert_eq!(at(MfShape::Trap(0.0, 1.0, 2.0, 3.0), 1.5), 1.0);
        assert_eq!(at(MfShape::Gauss(1.0, 2.0), 2.0), 1.0);
        assert_eq!(at(MfShape::GBell(1.0, 2.0, 0.0), 1.0), 0.5);
        assert_eq!(at(MfShape::Sig(3.0, 1.0), 1.0), 0.5);
        assert_eq!(at(MfShape::S(0.0, 2.0), 1.0), 0.5);
        assert_eq!(at(MfShape::Z(0.0, 2.0), 1.0), 0.5);
        assert_eq!(at(MfShape::Singleton(0.25), 0.25), 1.0);
        assert_eq!(at(MfShape::Rect(0.0, 1.0), 1.5), 0.0);
        assert!((at(MfShape::Cosine(0.0, 2.0), 0.0) - 1.0).abs() < 1e-12);
        assert_eq!(at(MfShape::LinS(0.0, 4.0), 1.0), 0.25);
        assert_eq!(at(MfShape::LinZ(0.0, 4.0), 1.0), 0.75);
        assert!((at(MfShape::Gauss2(1.0, 1.0, 1.0, 2.0), 1.5) - 1.0).abs() < 1e-12);
        assert!((at(MfShape::Spike(1.0, 0.0), 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tsukamoto_shapes_invert_their_forward_curves() {
        for w in [0.1, 0.3, 0.6, 0.9] {
            let t = MfShape::TS(2.0, 6.0).eval(w, 0.0, 10.0);
            assert!((smf(t, 2.0, 6.0) - w).abs() < 1e-9, "w={w} t={t}");
            let t = MfShape::TZ(2.0, 6.0).eval(w, 0.0, 10.0);
            assert!((zmf(t, 2.0, 6.0) - w).abs() < 1e-9, "w={w} t={t}");
            let t = MfShape::TSig(2.0, 5.0).eval(w, 0.0, 10.0);
            assert!((sig(t, 2.0, 5.0) - w).abs() < 1e-9, "w={w} t={t}");
            let t = MfShape::TConcave(2.0, 6.0).eval(w, 0.0, 10.0);
            assert!((concave(t, 2.0, 6.0) - w).abs() < 1e-9, "w={w} t={t}");
        }
    }

    #[test]
    fn inverse_candidates_tie_to_the_upper_branch() {
        assert_eq!(closest(0.5, 0.25, 0.75, |t| t), 0.75);
        assert_eq!(closest(0.5, 0.4, 0.75, |t| t), 0.4);
        assert_eq!(closest(0.5, 0.2, 0.6, |t| t), 0.6);
    }
}
