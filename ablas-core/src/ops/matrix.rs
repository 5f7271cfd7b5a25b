//! Matrix operations. All matrices are row-major.

use crate::closure::Tracked;
use crate::dense::{check_operands, check_size, Matrix, Vector};
use crate::error::Result;
use crate::graph::WorkId;
use crate::kernels::{self, Element};

fn check_shape<T: Element>(op: &'static str, x: &Matrix<T>, v: &Matrix<T>) -> Result<()> {
    check_size(op, x.rows(), v.rows())?;
    check_size(op, x.cols(), v.cols())
}

/// `X = alpha * V`
pub fn assign<T: Element>(x: &mut Matrix<T>, v: &Matrix<T>, alpha: T) -> Result<WorkId> {
    check_operands("assign", &x.storage, &[&v.storage])?;
    check_shape("assign", x, v)?;
    let (dst, src) = (x.closure(), v.closure());
    Ok(x.scheduler().spawn(
        move || kernels::assign(&mut dst.write(), &src.read(), alpha),
        x.dependencies(),
        &[v.dependencies()],
    ))
}

/// `X += alpha * V`
pub fn plus_assign<T: Element>(x: &mut Matrix<T>, v: &Matrix<T>, alpha: T) -> Result<WorkId> {
    check_operands("plus_assign", &x.storage, &[&v.storage])?;
    check_shape("plus_assign", x, v)?;
    let (dst, src) = (x.closure(), v.closure());
    Ok(x.scheduler().spawn(
        move || kernels::plus_assign(&mut dst.write(), &src.read(), alpha),
        x.dependencies(),
        &[v.dependencies()],
    ))
}

/// `y += alpha * A x`
pub fn gemv<T: Element>(
    y: &mut Vector<T>,
    a: &Matrix<T>,
    x: &Vector<T>,
    alpha: T,
) -> Result<WorkId> {
    check_operands("gemv", &y.storage, &[&a.storage, &x.storage])?;
    check_size("gemv", a.rows(), y.len())?;
    check_size("gemv", a.cols(), x.len())?;
    let cols = a.cols();
    let (out, lhs, rhs) = (y.closure(), a.closure(), x.closure());
    Ok(y.scheduler().spawn(
        move || kernels::gemv(&mut out.write(), &lhs.read(), cols, &rhs.read(), alpha),
        y.dependencies(),
        &[a.dependencies(), x.dependencies()],
    ))
}

/// `C += alpha * A B`
///
/// `A` and `B` may be the same matrix.
pub fn gemm<T: Element>(
    c: &mut Matrix<T>,
    a: &Matrix<T>,
    b: &Matrix<T>,
    alpha: T,
) -> Result<WorkId> {
    check_operands("gemm", &c.storage, &[&a.storage, &b.storage])?;
    check_size("gemm", a.cols(), b.rows())?;
    check_size("gemm", a.rows(), c.rows())?;
    check_size("gemm", b.cols(), c.cols())?;
    let (k, n) = (a.cols(), b.cols());
    let (out, lhs, rhs) = (c.closure(), a.closure(), b.closure());
    Ok(c.scheduler().spawn(
        move || {
            if lhs.dependencies().ptr_eq(rhs.dependencies()) {
                let a = lhs.read();
                kernels::gemm(&mut out.write(), &a, &a, k, n, alpha);
            } else {
                kernels::gemm(&mut out.write(), &lhs.read(), &rhs.read(), k, n, alpha);
            }
        },
        c.dependencies(),
        &[a.dependencies(), b.dependencies()],
    ))
}

/// Schedule `A B` into a new matrix. Does not wait for the product.
pub fn prod_async<T: Element>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
    check_operands("prod_async", &a.storage, &[&b.storage])?;
    check_size("prod_async", a.cols(), b.rows())?;
    let c = Matrix::new_in(a.scheduler(), a.rows(), b.cols());
    let (k, n) = (a.cols(), b.cols());
    let (out, lhs, rhs) = (c.closure(), a.closure(), b.closure());
    a.scheduler().spawn(
        move || {
            if lhs.dependencies().ptr_eq(rhs.dependencies()) {
                let a = lhs.read();
                kernels::matmul(&mut out.write(), &a, &a, k, n);
            } else {
                kernels::matmul(&mut out.write(), &lhs.read(), &rhs.read(), k, n);
            }
        },
        c.dependencies(),
        &[a.dependencies(), b.dependencies()],
    );
    Ok(c)
}

/// Solve `L x = b` in place, `L` being the lower triangle of `a`.
pub fn trsv_lower<T: Element>(a: &Matrix<T>, b: &mut Vector<T>) -> Result<WorkId> {
    check_operands("trsv_lower", &b.storage, &[&a.storage])?;
    check_size("trsv_lower", a.rows(), a.cols())?;
    check_size("trsv_lower", a.rows(), b.len())?;
    let (lhs, rhs) = (a.closure(), b.closure());
    Ok(b.scheduler().spawn(
        move || kernels::trsv_lower(&lhs.read(), &mut rhs.write()),
        b.dependencies(),
        &[a.dependencies()],
    ))
}
