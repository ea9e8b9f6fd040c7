//! Fixed-size `f64` matrices.
//!
//! `Mat<R, C>` is a plain row-major `[[f64; C]; R]`: `Copy`, no allocation,
//! shapes checked by the type system. Products only compile when the inner
//! dimensions agree.

use core::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mat<const R: usize, const C: usize> {
    m: [[f64; C]; R],
}

impl<const R: usize, const C: usize> Default for Mat<R, C> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const R: usize, const C: usize> Mat<R, C> {
    pub const ROWS: usize = R;
    pub const COLS: usize = C;

    #[inline]
    pub const fn zeros() -> Self {
        Self::filled(0.0)
    }

    #[inline]
    pub const fn filled(v: f64) -> Self {
        Self { m: [[v; C]; R] }
    }

    #[inline]
    pub const fn from_rows(rows: [[f64; C]; R]) -> Self {
        Self { m: rows }
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; C]; R] {
        &self.m
    }

    /// Row-major view of all elements.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.m.as_flattened()
    }

    pub fn transpose(&self) -> Mat<C, R> {
        let mut t = Mat::<C, R>::zeros();
        for (i, row) in self.m.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                t.m[j][i] = v;
            }
        }
        t
    }

    /// Infinity norm: the largest absolute row sum.
    pub fn norm_inf(&self) -> f64 {
        self.m
            .iter()
            .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    #[inline]
    fn map(mut self, f: impl Fn(f64) -> f64) -> Self {
        self.m.as_flattened_mut().iter_mut().for_each(|v| *v = f(*v));
        self
    }

    #[inline]
    fn zip(mut self, rhs: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        for (a, &b) in self.m.as_flattened_mut().iter_mut().zip(rhs.m.as_flattened()) {
            *a = f(*a, b);
        }
        self
    }
}

impl<const N: usize> Mat<N, N> {
    pub fn identity() -> Self {
        let mut i = Self::zeros();
        for k in 0..N {
            i.m[k][k] = 1.0;
        }
        i
    }

    /// Gauss-Jordan elimination with partial pivoting. `None` when the
    /// matrix is singular (no pivot larger than `f64::EPSILON` in magnitude).
    pub fn inverse(&self) -> Option<Self> {
        let mut x = *self;
        let mut inv = Self::identity();
        for col in 0..N {
            let pivot_row = (col..N).max_by(|&a, &b| x.m[a][col].abs().total_cmp(&x.m[b][col].abs()))?;
            let pivot = x.m[pivot_row][col];
            if pivot.abs() <= f64::EPSILON {
                return None;
            }
            x.m.swap(col, pivot_row);
            inv.m.swap(col, pivot_row);
            for k in 0..N {
                x.m[col][k] /= pivot;
                inv.m[col][k] /= pivot;
            }
            for row in (0..N).filter(|&r| r != col) {
                let factor = x.m[row][col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..N {
                    x.m[row][k] -= factor * x.m[col][k];
                    inv.m[row][k] -= factor * inv.m[col][k];
                }
            }
        }
        Some(inv)
    }
}

// ----------------------------- Indexing -----------------------------

impl<const R: usize, const C: usize> Index<(usize, usize)> for Mat<R, C> {
    type Output = f64;
    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        &self.m[r][c]
    }
}

impl<const R: usize, const C: usize> IndexMut<(usize, usize)> for Mat<R, C> {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        &mut self.m[r][c]
    }
}

/// Row-major linear index.
impl<const R: usize, const C: usize> Index<usize> for Mat<R, C> {
    type Output = f64;
    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.m.as_flattened()[i]
    }
}

impl<const R: usize, const C: usize> IndexMut<usize> for Mat<R, C> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.m.as_flattened_mut()[i]
    }
}

// ----------------------------- Arithmetic -----------------------------

macro_rules! elementwise {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $sym:tt) => {
        impl<const R: usize, const C: usize> $Op for Mat<R, C> {
            type Output = Self;
            #[inline]
            fn $op(self, rhs: Self) -> Self {
                self.zip(&rhs, |a, b| a $sym b)
            }
        }

        impl<const R: usize, const C: usize> $Op<f64> for Mat<R, C> {
            type Output = Self;
            #[inline]
            fn $op(self, rhs: f64) -> Self {
                self.map(|a| a $sym rhs)
            }
        }

        impl<const R: usize, const C: usize> $Op<Mat<R, C>> for f64 {
            type Output = Mat<R, C>;
            #[inline]
            fn $op(self, rhs: Mat<R, C>) -> Mat<R, C> {
                rhs.map(|b| self $sym b)
            }
        }

        impl<const R: usize, const C: usize> $OpAssign for Mat<R, C> {
            #[inline]
            fn $op_assign(&mut self, rhs: Self) {
                *self = self.zip(&rhs, |a, b| a $sym b);
            }
        }

        impl<const R: usize, const C: usize> $OpAssign<f64> for Mat<R, C> {
            #[inline]
            fn $op_assign(&mut self, rhs: f64) {
                *self = self.map(|a| a $sym rhs);
            }
        }
    };
}

elementwise!(Add, add, AddAssign, add_assign, +);
elementwise!(Sub, sub, SubAssign, sub_assign, -);

impl<const R: usize, const C: usize> Mul<f64> for Mat<R, C> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.map(|a| a * rhs)
    }
}

impl<const R: usize, const C: usize> Mul<Mat<R, C>> for f64 {
    type Output = Mat<R, C>;
    #[inline]
    fn mul(self, rhs: Mat<R, C>) -> Mat<R, C> {
        rhs * self
    }
}

impl<const R: usize, const C: usize> MulAssign<f64> for Mat<R, C> {
    #[inline]
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl<const R: usize, const C: usize> Div<f64> for Mat<R, C> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        self.map(|a| a / rhs)
    }
}

impl<const R: usize, const C: usize> DivAssign<f64> for Mat<R, C> {
    #[inline]
    fn div_assign(&mut self, rhs: f64) {
        *self = *self / rhs;
    }
}

impl<const R: usize, const C: usize, const K: usize> Mul<Mat<C, K>> for Mat<R, C> {
    type Output = Mat<R, K>;
    fn mul(self, rhs: Mat<C, K>) -> Mat<R, K> {
        let mut out = Mat::<R, K>::zeros();
        for i in 0..R {
            for j in 0..K {
                out.m[i][j] = (0..C).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        out
    }
}

impl<const R: usize, const C: usize> MulAssign<Mat<C, C>> for Mat<R, C> {
    #[inline]
    fn mul_assign(&mut self, rhs: Mat<C, C>) {
        *self = *self * rhs;
    }
}

impl<const R: usize, const C: usize> Neg for Mat<R, C> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}
