//! Dense matrix decompositions.
//!
//! Provides the factorizations the solver stack relies on:
//! - Cholesky `A = L·Lᵀ` for symmetric positive definite systems
//! - Doolittle LU `A = L·U` without pivoting
//! - QR by classical Gram-Schmidt
//! - Householder reduction to upper-Hessenberg form
//! - Hessian modification (shifted Cholesky forcing positive definiteness)
//!
//! Failures that a caller may recover from (a vanished pivot, an indefinite
//! matrix) come back as [`TensioError::SingularMatrix`] and
//! [`TensioError::NotPositiveDefinite`]; shape problems are
//! [`TensioError::ShapeMismatch`].

use tensio_types::constants::EPSILON;
use tensio_types::{TensioError, TensioResult};

use crate::matrix::Matrix;

/// Default initial shift β for [`hessian_modification`].
pub const DEFAULT_FIRST_SHIFT: f64 = 1.0e-3;

/// Default growth factor of the shift in [`hessian_modification`].
pub const DEFAULT_SHIFT_STEP: f64 = 2.0;

/// Upper bound on shifted Cholesky attempts.
pub const MAX_SHIFT_ATTEMPTS: usize = 64;

fn require_square(a: &Matrix, operation: &'static str) -> TensioResult<()> {
    if !a.is_square() {
        return Err(TensioError::shape(operation, a.shape(), (a.height(), a.height())));
    }
    Ok(())
}

/// Cholesky factorization `A = L·Lᵀ`, reading the lower triangle of `A`.
///
/// Fails with `NotPositiveDefinite` at the first non-positive (or NaN)
/// diagonal residual.
pub fn cholesky(a: &Matrix) -> TensioResult<Matrix> {
    require_square(a, "cholesky")?;
    let n = a.height();
    let mut l = Matrix::zeros(n, n);

    for j in 0..n {
        let mut diag = a.get(j, j);
        for k in 0..j {
            diag -= l.get(j, k) * l.get(j, k);
        }
        // Also rejects NaN.
        if !(diag > 0.0) {
            return Err(TensioError::NotPositiveDefinite { index: j });
        }
        let ljj = diag.sqrt();
        l.set(j, j, ljj);

        for i in j + 1..n {
            let mut s = a.get(i, j);
            for k in 0..j {
                s -= l.get(i, k) * l.get(j, k);
            }
            l.set(i, j, s / ljj);
        }
    }

    Ok(l)
}

/// Doolittle LU factorization without pivoting.
///
/// `L` has a unit diagonal. A pivot of magnitude below [`EPSILON`] fails
/// with `SingularMatrix`; callers that need pivoting must permute first.
pub fn lu(a: &Matrix) -> TensioResult<(Matrix, Matrix)> {
    require_square(a, "lu")?;
    let n = a.height();
    let mut l = Matrix::identity(n);
    let mut u = Matrix::zeros(n, n);

    for i in 0..n {
        for k in i..n {
            let mut s = a.get(i, k);
            for j in 0..i {
                s -= l.get(i, j) * u.get(j, k);
            }
            u.set(i, k, s);
        }

        let pivot = u.get(i, i);
        if pivot.abs() < EPSILON || !pivot.is_finite() {
            return Err(TensioError::SingularMatrix(format!(
                "zero pivot at row {i} during LU elimination"
            )));
        }

        for k in i + 1..n {
            let mut s = a.get(k, i);
            for j in 0..i {
                s -= l.get(k, j) * u.get(j, i);
            }
            l.set(k, i, s / pivot);
        }
    }

    Ok((l, u))
}

/// QR factorization by classical Gram-Schmidt on the columns of `A`.
///
/// For an `h × w` input (`h ≥ w`) returns `Q` (`h × w`, orthonormal columns)
/// and `R` (`w × w`, upper triangular). A column that is numerically
/// dependent on its predecessors gets a zero `R` diagonal and a zero `Q`
/// column. No re-orthogonalization is done, which is acceptable for the
/// small, well-conditioned systems here.
pub fn qr(a: &Matrix) -> TensioResult<(Matrix, Matrix)> {
    let (h, w) = a.shape();
    if h < w {
        return Err(TensioError::shape("qr", a.shape(), (w, w)));
    }
    let mut q = Matrix::zeros(h, w);
    let mut r = Matrix::zeros(w, w);

    for j in 0..w {
        let mut v: Vec<f64> = (0..h).map(|i| a.get(i, j)).collect();
        for k in 0..j {
            let rkj: f64 = (0..h).map(|i| q.get(i, k) * a.get(i, j)).sum();
            r.set(k, j, rkj);
            for (i, vi) in v.iter_mut().enumerate() {
                *vi -= rkj * q.get(i, k);
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        r.set(j, j, norm);
        if norm > EPSILON {
            for (i, vi) in v.iter().enumerate() {
                q.set(i, j, vi / norm);
            }
        }
    }

    Ok((q, r))
}

/// Householder similarity reduction to upper-Hessenberg form.
///
/// The result has the same eigenvalues as `A` and zeros below the first
/// subdiagonal; a symmetric input comes back tridiagonal.
pub fn hessenberg(a: &Matrix) -> TensioResult<Matrix> {
    require_square(a, "hessenberg")?;
    let n = a.height();
    let mut h = a.clone();

    for k in 0..n.saturating_sub(2) {
        let x: Vec<f64> = (k + 1..n).map(|i| h.get(i, k)).collect();
        let x_norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        if x_norm < EPSILON {
            continue;
        }
        let alpha = if x[0] >= 0.0 { -x_norm } else { x_norm };

        let mut v = x;
        v[0] -= alpha;
        let v_norm = v.iter().map(|c| c * c).sum::<f64>().sqrt();
        if v_norm < EPSILON {
            continue;
        }
        for c in &mut v {
            *c /= v_norm;
        }

        // H ← P·H with P = I − 2vvᵀ acting on rows k+1..n.
        for j in 0..n {
            let s: f64 = v.iter().enumerate().map(|(i, vi)| vi * h.get(k + 1 + i, j)).sum();
            for (i, vi) in v.iter().enumerate() {
                h.add_at(k + 1 + i, j, -2.0 * vi * s);
            }
        }
        // H ← H·P acting on columns k+1..n.
        for i in 0..n {
            let s: f64 = v.iter().enumerate().map(|(j, vj)| h.get(i, k + 1 + j) * vj).sum();
            for (j, vj) in v.iter().enumerate() {
                h.add_at(i, k + 1 + j, -2.0 * s * vj);
            }
        }

        h.set(k + 1, k, alpha);
        for i in k + 2..n {
            h.set(i, k, 0.0);
        }
    }

    Ok(h)
}

/// Cholesky factor of `A + τI` for the smallest tried `τ ≥ 0` that makes it
/// positive definite.
///
/// Starts at `τ = 0` when every diagonal entry is positive, otherwise at
/// `first_shift − min(diag)`, and grows `τ ← max(step·τ, first_shift)`
/// after every failed attempt. Gives up after [`MAX_SHIFT_ATTEMPTS`].
pub fn hessian_modification(a: &Matrix, first_shift: f64, step: f64) -> TensioResult<Matrix> {
    require_square(a, "hessian_modification")?;
    if first_shift <= 0.0 || step <= 1.0 {
        return Err(TensioError::InvalidConfig(format!(
            "hessian modification needs first_shift > 0 and step > 1 (got {first_shift}, {step})"
        )));
    }

    let min_diag = a.diagonal().into_iter().fold(f64::INFINITY, f64::min);
    let mut tau = if min_diag > 0.0 {
        0.0
    } else {
        first_shift - min_diag
    };

    let mut last_index = 0;
    for attempt in 0..MAX_SHIFT_ATTEMPTS {
        let mut shifted = a.clone();
        if tau != 0.0 {
            shifted.add_diagonal(tau)?;
        }
        match cholesky(&shifted) {
            Ok(l) => {
                if tau != 0.0 {
                    tracing::trace!(attempt, shift = tau, "hessian modified");
                }
                return Ok(l);
            }
            Err(TensioError::NotPositiveDefinite { index }) => {
                last_index = index;
                tau = (step * tau).max(first_shift);
            }
            Err(other) => return Err(other),
        }
    }

    Err(TensioError::NotPositiveDefinite { index: last_index })
}

/// [`hessian_modification`] with the default shift schedule.
pub fn hessian_modification_default(a: &Matrix) -> TensioResult<Matrix> {
    hessian_modification(a, DEFAULT_FIRST_SHIFT, DEFAULT_SHIFT_STEP)
}
