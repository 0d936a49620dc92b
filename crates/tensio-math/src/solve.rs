//! Linear system solvers.
//!
//! Direct solves go through a triangular factorization followed by
//! forward/back substitution. The `*_prefactored` variants accept factors
//! the caller already holds, e.g. the Cholesky factor returned by
//! [`hessian_modification`](crate::decomposition::hessian_modification) or
//! the constant Projective Dynamics system factor.
//!
//! Jacobi and Gauss-Seidel are fixed-point iterations controlled by a
//! [`Termination`] rule.

use serde::{Deserialize, Serialize};
use tensio_types::{TensioError, TensioResult};

use crate::decomposition;
use crate::matrix::Matrix;
use crate::vector::Vector;

/// Default residual tolerance for iterative solves (on the squared norm).
pub const DEFAULT_ITERATIVE_TOLERANCE: f64 = 1.0e-3;

/// Hard ceiling on sweeps in tolerance mode.
pub const MAX_ITERATIVE_SWEEPS: usize = 10_000;

fn check_system(a: &Matrix, b: &Vector, operation: &'static str) -> TensioResult<()> {
    if !a.is_square() || a.height() != b.len() {
        return Err(TensioError::shape(operation, a.shape(), b.shape()));
    }
    Ok(())
}

/// Solves `L·y = b` for lower-triangular `L`.
pub fn forward_substitution(l: &Matrix, b: &Vector) -> TensioResult<Vector> {
    check_system(l, b, "forward_substitution")?;
    let n = b.len();
    let mut y = Vector::zeros(n);
    for i in 0..n {
        let mut s = b[i];
        for j in 0..i {
            s -= l.get(i, j) * y[j];
        }
        let d = l.get(i, i);
        if d == 0.0 {
            return Err(TensioError::SingularMatrix(format!("zero diagonal at row {i}")));
        }
        y[i] = s / d;
    }
    Ok(y)
}

/// Solves `U·x = y` for upper-triangular `U`.
pub fn back_substitution(u: &Matrix, y: &Vector) -> TensioResult<Vector> {
    check_system(u, y, "back_substitution")?;
    let n = y.len();
    let mut x = Vector::zeros(n);
    for i in (0..n).rev() {
        let mut s = y[i];
        for j in i + 1..n {
            s -= u.get(i, j) * x[j];
        }
        let d = u.get(i, i);
        if d == 0.0 {
            return Err(TensioError::SingularMatrix(format!("zero diagonal at row {i}")));
        }
        x[i] = s / d;
    }
    Ok(x)
}

/// Solves `Lᵀ·x = y` for lower-triangular `L` without forming the transpose.
pub fn back_substitution_transposed(l: &Matrix, y: &Vector) -> TensioResult<Vector> {
    check_system(l, y, "back_substitution_transposed")?;
    let n = y.len();
    let mut x = Vector::zeros(n);
    for i in (0..n).rev() {
        let mut s = y[i];
        for j in i + 1..n {
            s -= l.get(j, i) * x[j];
        }
        let d = l.get(i, i);
        if d == 0.0 {
            return Err(TensioError::SingularMatrix(format!("zero diagonal at row {i}")));
        }
        x[i] = s / d;
    }
    Ok(x)
}

/// Solves `A·x = b` by Cholesky factorization.
pub fn cholesky(a: &Matrix, b: &Vector) -> TensioResult<Vector> {
    check_system(a, b, "cholesky")?;
    let l = decomposition::cholesky(a)?;
    cholesky_prefactored(&l, b)
}

/// Solves `L·Lᵀ·x = b` given the Cholesky factor `L`.
pub fn cholesky_prefactored(l: &Matrix, b: &Vector) -> TensioResult<Vector> {
    let y = forward_substitution(l, b)?;
    back_substitution_transposed(l, &y)
}

/// Solves `A·x = b` by LU factorization.
///
/// With `permutation`, row `i` of the system takes `b[permutation[i]]`,
/// for callers that pre-permuted `A` to avoid zero pivots.
pub fn lu(a: &Matrix, b: &Vector, permutation: Option<&[usize]>) -> TensioResult<Vector> {
    check_system(a, b, "lu")?;
    let (l, u) = decomposition::lu(a)?;
    lu_prefactored(&l, &u, b, permutation)
}

/// Solves `L·U·x = P·b` given the factors.
pub fn lu_prefactored(
    l: &Matrix,
    u: &Matrix,
    b: &Vector,
    permutation: Option<&[usize]>,
) -> TensioResult<Vector> {
    let rhs = match permutation {
        Some(p) => {
            if p.len() != b.len() {
                return Err(TensioError::shape("lu_permutation", (p.len(), 1), b.shape()));
            }
            let mut permuted = Vector::zeros(b.len());
            for (i, &src) in p.iter().enumerate() {
                if src >= b.len() {
                    return Err(TensioError::shape("lu_permutation", (src + 1, 1), b.shape()));
                }
                permuted[i] = b[src];
            }
            permuted
        }
        None => b.clone(),
    };
    let y = forward_substitution(l, &rhs)?;
    back_substitution(u, &y)
}

/// `b − A·x`.
pub fn residual(a: &Matrix, x: &Vector, b: &Vector) -> TensioResult<Vector> {
    let mut r = b.clone();
    r.subtract(&a.multiply_vector(x)?)?;
    Ok(r)
}

/// When an iterative solve stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Run exactly this many sweeps; the residual is not checked.
    Sweeps(usize),
    /// Stop once `‖b − A·x‖² < tolerance`, at most [`MAX_ITERATIVE_SWEEPS`].
    Tolerance(f64),
}

impl Default for Termination {
    fn default() -> Self {
        Self::Tolerance(DEFAULT_ITERATIVE_TOLERANCE)
    }
}

/// Outcome of an iterative solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// Sweeps performed.
    pub sweeps: usize,
    /// Final `‖b − A·x‖²`.
    pub residual_squared: f64,
    /// Whether the tolerance was met (always true for `Sweeps`).
    pub converged: bool,
}

fn diagonal_of(a: &Matrix) -> TensioResult<Vec<f64>> {
    let diag = a.diagonal();
    if let Some(i) = diag.iter().position(|&d| d == 0.0) {
        return Err(TensioError::SingularMatrix(format!("zero diagonal at row {i}")));
    }
    Ok(diag)
}

fn iterate<F>(
    a: &Matrix,
    x: &mut Vector,
    b: &Vector,
    termination: Termination,
    mut sweep: F,
) -> TensioResult<IterationReport>
where
    F: FnMut(&mut Vector),
{
    check_system(a, b, "iterative_solve")?;
    if x.len() != b.len() {
        return Err(TensioError::shape("iterative_solve", x.shape(), b.shape()));
    }

    match termination {
        Termination::Sweeps(count) => {
            for _ in 0..count {
                sweep(x);
            }
            Ok(IterationReport {
                sweeps: count,
                residual_squared: residual(a, x, b)?.squared_norm(),
                converged: true,
            })
        }
        Termination::Tolerance(tolerance) => {
            let mut residual_squared = residual(a, x, b)?.squared_norm();
            let mut sweeps = 0;
            while !(residual_squared < tolerance) {
                if sweeps == MAX_ITERATIVE_SWEEPS || !residual_squared.is_finite() {
                    tracing::warn!(sweeps, residual_squared, "iterative solve did not converge");
                    return Err(TensioError::SolverDivergence {
                        iterations: sweeps as u32,
                        residual: residual_squared.sqrt(),
                    });
                }
                sweep(x);
                sweeps += 1;
                residual_squared = residual(a, x, b)?.squared_norm();
            }
            Ok(IterationReport {
                sweeps,
                residual_squared,
                converged: true,
            })
        }
    }
}

/// Jacobi iteration for `A·x = b`, updating `x` in place.
pub fn jacobi(
    a: &Matrix,
    x: &mut Vector,
    b: &Vector,
    termination: Termination,
) -> TensioResult<IterationReport> {
    let diag = diagonal_of(a)?;
    let n = diag.len();
    let mut next = vec![0.0; n];
    iterate(a, x, b, termination, |x| {
        for i in 0..n {
            let mut s = b[i];
            for j in 0..n {
                if j != i {
                    s -= a.get(i, j) * x[j];
                }
            }
            next[i] = s / diag[i];
        }
        x.as_mut_slice().copy_from_slice(&next);
    })
}

/// Gauss-Seidel iteration for `A·x = b`, updating `x` in place.
pub fn gauss_seidel(
    a: &Matrix,
    x: &mut Vector,
    b: &Vector,
    termination: Termination,
) -> TensioResult<IterationReport> {
    let diag = diagonal_of(a)?;
    let n = diag.len();
    iterate(a, x, b, termination, |x| {
        for i in 0..n {
            let mut s = b[i];
            for j in 0..n {
                if j != i {
                    s -= a.get(i, j) * x[j];
                }
            }
            x[i] = s / diag[i];
        }
    })
}
