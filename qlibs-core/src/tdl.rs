//! Tapped delay line: a fixed-size ring of the most recent samples.
//!
//! Index `0` is the most recent sample, `N - 1` the oldest one. The line is
//! always full; [`Tdl::flush`] refills every tap with a constant.

use core::ops::Index;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tdl<const N: usize> {
    taps: [f64; N],
    // slot holding the most recent sample
    head: usize,
}

impl<const N: usize> Default for Tdl<N> {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<const N: usize> Tdl<N> {
    /// New line with every tap set to `init`.
    #[inline]
    pub fn new(init: f64) -> Self {
        Self { taps: [init; N], head: 0 }
    }

    #[inline]
    pub fn flush(&mut self, init: f64) {
        self.taps = [init; N];
        self.head = 0;
    }

    /// Push `sample` as the most recent tap, dropping the oldest.
    #[inline]
    pub fn insert(&mut self, sample: f64) {
        if N == 0 {
            return;
        }
        self.head = if self.head + 1 >= N { 0 } else { self.head + 1 };
        self.taps[self.head] = sample;
    }

    #[inline]
    pub fn recent(&self) -> f64 {
        self.get(0).unwrap_or(f64::NAN)
    }

    #[inline]
    pub fn oldest(&self) -> f64 {
        N.checked_sub(1).and_then(|i| self.get(i)).unwrap_or(f64::NAN)
    }

    /// Tap `i` samples in the past, `None` beyond the line length.
    #[inline]
    pub fn get(&self, i: usize) -> Option<f64> {
        if i < N {
            Some(self.taps[(self.head + N - i) % N])
        } else {
            None
        }
    }

    /// Signed access: `-1` is the oldest tap, anything else out of range is NaN.
    #[inline]
    pub fn get_signed(&self, index: isize) -> f64 {
        match usize::try_from(index) {
            Ok(i) => self.get(i).unwrap_or(f64::NAN),
            Err(_) if index == -1 => self.oldest(),
            Err(_) => f64::NAN,
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

const UNDEFINED: f64 = f64::NAN;

impl<const N: usize> Index<usize> for Tdl<N> {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        if i < N {
            &self.taps[(self.head + N - i) % N]
        } else {
            &UNDEFINED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_n_samples() {
        let mut d: Tdl<10> = Tdl::new(0.0);
        for x in [3.5, 5.0, 5.0, 0.5, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5] {
            d.insert(x);
        }
        assert_eq!(d[0], 8.5);
        assert_eq!(d[1], 7.5);
        assert_eq!(d.get_signed(-1), 5.0);
        assert_eq!(d.oldest(), 5.0);
        assert!(d[100].is_nan());
        assert!(d.get_signed(-2).is_nan());
    }

    #[test]
    fn flush_resets_every_tap() {
        let mut d: Tdl<4> = Tdl::new(1.0);
        d.insert(9.0);
        d.flush(-2.0);
        for i in 0..4 {
            assert_eq!(d.get(i), Some(-2.0));
        }
        d.insert(3.0);
        assert_eq!(d.recent(), 3.0);
        assert_eq!(d.oldest(), -2.0);
    }
}
