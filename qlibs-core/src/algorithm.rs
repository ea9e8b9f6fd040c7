//! Allocation-free slice algorithms.
//!
//! Everything works on plain `&mut [T]` and only needs `PartialOrd` /
//! `PartialEq`, so `f64` slices are first-class citizens.

use core::cmp::Ordering;
use core::ops::{ControlFlow, Range};

/// Deferred ranges never exceed `log2(len)` because the smaller half is
/// always processed first.
const SORT_STACK: usize = usize::BITS as usize;

/// In-place iterative quicksort, ascending by `PartialOrd`. Incomparable
/// pairs (NaN) are treated as "not less".
pub fn sort<T: PartialOrd>(v: &mut [T]) {
    sort_by(v, |a, b| a < b);
}

/// In-place iterative quicksort with a custom strict "less than".
pub fn sort_by<T, F>(v: &mut [T], mut less: F)
where
    F: FnMut(&T, &T) -> bool,
{
    let mut stack = [(0usize, 0usize); SORT_STACK];
    let mut top = 0;
    let (mut lo, mut hi) = (0, v.len());
    loop {
        while hi - lo > 1 {
            let p = lo + partition(&mut v[lo..hi], &mut less);
            let (left, right) = ((lo, p), (p + 1, hi));
            let (small, large) = if p - lo < hi - p - 1 { (left, right) } else { (right, left) };
            stack[top] = large;
            top += 1;
            (lo, hi) = small;
        }
        if top == 0 {
            break;
        }
        top -= 1;
        (lo, hi) = stack[top];
    }
}

/// Lomuto partition around the middle element; returns its final index.
fn partition<T, F>(v: &mut [T], less: &mut F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    let last = v.len() - 1;
    v.swap(v.len() / 2, last);
    let mut store = 0;
    for i in 0..last {
        if less(&v[i], &v[last]) {
            v.swap(i, store);
            store += 1;
        }
    }
    v.swap(store, last);
    store
}

/// Reverse `v[range]`. Returns `false` (and leaves `v` alone) when the
/// range does not fit.
pub fn reverse_range<T>(v: &mut [T], range: Range<usize>) -> bool {
    match v.get_mut(range) {
        Some(part) => {
            part.reverse();
            true
        }
        None => false,
    }
}

/// Rotate by `k` positions: positive moves elements to the right, negative
/// to the left. `|k|` wraps modulo the length.
pub fn rotate<T>(v: &mut [T], k: isize) {
    let n = v.len();
    if n == 0 {
        return;
    }
    let r = k.unsigned_abs() % n;
    if k > 0 {
        v.rotate_right(r);
    } else {
        v.rotate_left(r);
    }
}

#[inline]
pub fn set<T: Clone>(v: &mut [T], value: T) {
    v.fill(value);
}

/// Index of the first element equal to `key`.
pub fn lsearch<T: PartialEq>(v: &[T], key: &T) -> Option<usize> {
    v.iter().position(|x| x == key)
}

/// Binary search over an ascending slice. With duplicates any matching
/// index may be returned.
pub fn bsearch<T: PartialOrd>(v: &[T], key: &T) -> Option<usize> {
    let (mut lo, mut hi) = (0, v.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match v[mid].partial_cmp(key)? {
            Ordering::Equal => return Some(mid),
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }
    None
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Visit every element with its index in the given direction. The visit
/// stops at the first `ControlFlow::Break`, which is returned.
pub fn for_each<T, B, F>(v: &mut [T], dir: Direction, mut f: F) -> ControlFlow<B>
where
    F: FnMut(usize, &mut T) -> ControlFlow<B>,
{
    match dir {
        Direction::Forward => v.iter_mut().enumerate().try_for_each(|(i, x)| f(i, x)),
        Direction::Backward => v.iter_mut().enumerate().rev().try_for_each(|(i, x)| f(i, x)),
    }
}
