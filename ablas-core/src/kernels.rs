//! Numeric Kernels
//!
//! Plain loops over row-major slices. The scheduler treats every call as an
//! opaque unit of work; callers validate sizes before spawning them.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

/// Element type of vectors and matrices. `Default` is the zero value.
pub trait Element:
    Copy
    + Default
    + PartialEq
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + AddAssign
    + MulAssign
{
}

impl<T> Element for T where
    T: Copy
        + Default
        + PartialEq
        + Debug
        + Send
        + Sync
        + 'static
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Div<Output = T>
        + AddAssign
        + MulAssign
{
}

/// `x_i = value`
pub fn fill<T: Element>(x: &mut [T], value: T) {
    x.iter_mut().for_each(|xi| *xi = value);
}

/// `x_i *= t`
pub fn scale<T: Element>(x: &mut [T], t: T) {
    x.iter_mut().for_each(|xi| *xi *= t);
}

/// `x_i += t`
pub fn add_scalar<T: Element>(x: &mut [T], t: T) {
    x.iter_mut().for_each(|xi| *xi += t);
}

/// `x_i = alpha * v_i`
pub fn assign<T: Element>(x: &mut [T], v: &[T], alpha: T) {
    debug_assert_eq!(x.len(), v.len());
    for (xi, &vi) in x.iter_mut().zip(v) {
        *xi = alpha * vi;
    }
}

/// `x_i += alpha * v_i`
pub fn plus_assign<T: Element>(x: &mut [T], v: &[T], alpha: T) {
    debug_assert_eq!(x.len(), v.len());
    for (xi, &vi) in x.iter_mut().zip(v) {
        *xi += alpha * vi;
    }
}

/// `sum_i x_i * y_i`
pub fn dot<T: Element>(x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .fold(T::default(), |acc, (&xi, &yi)| acc + xi * yi)
}

/// `y += alpha * A x` for a `rows x cols` matrix `a`.
pub fn gemv<T: Element>(y: &mut [T], a: &[T], cols: usize, x: &[T], alpha: T) {
    debug_assert_eq!(a.len(), y.len() * cols);
    debug_assert_eq!(x.len(), cols);
    if cols == 0 {
        return;
    }
    for (yi, row) in y.iter_mut().zip(a.chunks_exact(cols)) {
        *yi += alpha * dot(row, x);
    }
}

/// `C += alpha * A B` with `A: m x k`, `B: k x n`, `C: m x n`.
pub fn gemm<T: Element>(c: &mut [T], a: &[T], b: &[T], k: usize, n: usize, alpha: T) {
    debug_assert_eq!(b.len(), k * n);
    if k == 0 || n == 0 {
        return;
    }
    // i-k-j order keeps the inner loop on contiguous rows of B and C.
    for (c_row, a_row) in c.chunks_exact_mut(n).zip(a.chunks_exact(k)) {
        for (&a_ik, b_row) in a_row.iter().zip(b.chunks_exact(n)) {
            let scaled = alpha * a_ik;
            for (c_ij, &b_kj) in c_row.iter_mut().zip(b_row) {
                *c_ij += scaled * b_kj;
            }
        }
    }
}

/// `C = A B` with `A: m x k`, `B: k x n`, `C: m x n`.
pub fn matmul<T: Element>(c: &mut [T], a: &[T], b: &[T], k: usize, n: usize) {
    fill(c, T::default());
    if k == 0 || n == 0 {
        return;
    }
    for (c_row, a_row) in c.chunks_exact_mut(n).zip(a.chunks_exact(k)) {
        for (&a_ik, b_row) in a_row.iter().zip(b.chunks_exact(n)) {
            for (c_ij, &b_kj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ik * b_kj;
            }
        }
    }
}

/// Solve `L x = b` in place for the lower triangle of the `n x n` matrix `a`.
pub fn trsv_lower<T: Element>(a: &[T], b: &mut [T]) {
    let n = b.len();
    debug_assert_eq!(a.len(), n * n);
    for i in 0..n {
        let row = &a[i * n..i * n + i];
        let partial = dot(row, &b[..i]);
        b[i] = (b[i] - partial) / a[i * n + i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementwise_kernels() {
        let mut x = vec![1.0, 2.0, 3.0];
        scale(&mut x, 2.0);
        assert_eq!(x, vec![2.0, 4.0, 6.0]);
        add_scalar(&mut x, 1.0);
        assert_eq!(x, vec![3.0, 5.0, 7.0]);
        plus_assign(&mut x, &[1.0, 1.0, 1.0], -3.0);
        assert_eq!(x, vec![0.0, 2.0, 4.0]);
        assign(&mut x, &[1.0, 2.0, 3.0], 0.5);
        assert_eq!(x, vec![0.5, 1.0, 1.5]);
        fill(&mut x, 0.0);
        assert_eq!(x, vec![0.0; 3]);
    }

    #[test]
    fn dot_product() {
        assert_eq!(dot(&[1, 2, 3], &[4, 5, 6]), 32);
        assert_eq!(dot::<f64>(&[], &[]), 0.0);
    }

    #[test]
    fn matrix_vector_product() {
        // [1 2; 3 4; 5 6] * [1, 1]
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut y = vec![1.0; 3];
        gemv(&mut y, &a, 2, &[1.0, 1.0], 2.0);
        assert_eq!(y, vec![7.0, 15.0, 23.0]);
    }

    #[test]
    fn matrix_matrix_product() {
        // [1 2; 3 4] * [5 6; 7 8] = [19 22; 43 50]
        let a = [1, 2, 3, 4];
        let b = [5, 6, 7, 8];
        let mut c = vec![0; 4];
        gemm(&mut c, &a, &b, 2, 2, 1);
        assert_eq!(c, vec![19, 22, 43, 50]);
        gemm(&mut c, &a, &b, 2, 2, -1);
        assert_eq!(c, vec![0; 4]);

        let mut stale = vec![9; 4];
        matmul(&mut stale, &a, &b, 2, 2);
        assert_eq!(stale, vec![19, 22, 43, 50]);
    }

    #[test]
    fn lower_triangular_solve() {
        // [2 0; 1 4] x = [4, 6] -> x = [2, 1]
        let a = [2.0, 99.0, 1.0, 4.0];
        let mut b = vec![4.0, 6.0];
        trsv_lower(&a, &mut b);
        assert_eq!(b, vec![2.0, 1.0]);
    }
}
