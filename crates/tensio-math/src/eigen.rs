//! Eigenvalues by shifted QR iteration and eigenvectors by inverse iteration.
//!
//! Intended for the real symmetric matrices the simulator produces
//! (Hessians). A non-symmetric input with a complex eigenvalue pair never
//! deflates and ends in [`TensioError::SolverDivergence`].

use tensio_types::{TensioError, TensioResult};

use crate::decomposition::{self, hessenberg, qr};
use crate::matrix::Matrix;
use crate::solve;
use crate::vector::Vector;

/// Default deflation tolerance on the trailing subdiagonal entry.
pub const DEFAULT_EIGEN_TOLERANCE: f64 = 1.0e-2;

/// Fixed number of unshifted QR sweeps applied to the final 2×2 block.
pub const UNSHIFTED_QR_SWEEPS: usize = 70;

/// Ceiling on shifted QR sweeps spent on a single deflation.
pub const MAX_SHIFTED_QR_SWEEPS: usize = 500;

/// Default clamp keeping the inverse-iteration shift away from zero.
pub const DEFAULT_APPROXIMATE_ZERO: f64 = 1.0e-6;

/// Residual `‖A·x − λ·x‖` at which inverse iteration stops.
pub const EIGENVECTOR_RESIDUAL: f64 = 1.0e-2;

/// Ceiling on inverse-iteration steps.
pub const MAX_INVERSE_ITERATIONS: usize = 1_000;

/// Eigenvalue of the trailing 2×2 block closest to its last diagonal entry.
fn wilkinson_shift(h: &Matrix) -> f64 {
    let m = h.height();
    let a = h.get(m - 2, m - 2);
    let b = h.get(m - 2, m - 1);
    let c = h.get(m - 1, m - 2);
    let d = h.get(m - 1, m - 1);

    let delta = 0.5 * (a - d);
    let disc = delta * delta + b * c;
    if disc < 0.0 {
        // Complex pair: fall back to the Rayleigh shift.
        return d;
    }
    let sign = if delta >= 0.0 { 1.0 } else { -1.0 };
    let denom = delta + sign * disc.sqrt();
    if denom == 0.0 {
        d
    } else {
        d - b * c / denom
    }
}

/// Real eigenvalues of a 2×2 block in closed form, `None` for a complex
/// pair.
fn eigenvalues_2x2(h: &Matrix) -> Option<(f64, f64)> {
    let (a, b, c, d) = (h.get(0, 0), h.get(0, 1), h.get(1, 0), h.get(1, 1));
    let mean = 0.5 * (a + d);
    let delta = 0.5 * (a - d);
    let disc = delta * delta + b * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    Some((mean + root, mean - root))
}

/// One QR sweep `H ← R·Q + μI` on `H − μI`.
fn qr_sweep(h: &Matrix, shift: f64) -> TensioResult<Matrix> {
    let mut shifted = h.clone();
    if shift != 0.0 {
        shifted.add_diagonal(-shift)?;
    }
    let (q, r) = qr(&shifted)?;
    let mut next = r.multiply(&q)?;
    if shift != 0.0 {
        next.add_diagonal(shift)?;
    }
    Ok(next)
}

/// Eigenvalues of a square matrix, sorted descending.
///
/// Reduces to Hessenberg form, then runs Wilkinson-shifted QR, deflating
/// the last row and column once its subdiagonal falls below `tolerance`.
/// The final 2×2 block gets [`UNSHIFTED_QR_SWEEPS`] plain QR sweeps; if its
/// subdiagonal is still above `tolerance` the pair is solved in closed form.
pub fn eigenvalues(a: &Matrix, tolerance: f64) -> TensioResult<Vec<f64>> {
    if !a.is_square() {
        return Err(TensioError::shape("eigenvalues", a.shape(), (a.height(), a.height())));
    }
    let n = a.height();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut h = hessenberg(a)?;
    let mut values = Vec::with_capacity(n);

    while h.height() > 2 {
        let m = h.height();
        let mut sweeps = 0;
        while h.get(m - 1, m - 2).abs() >= tolerance {
            if sweeps == MAX_SHIFTED_QR_SWEEPS {
                return Err(TensioError::SolverDivergence {
                    iterations: sweeps as u32,
                    residual: h.get(m - 1, m - 2).abs(),
                });
            }
            let shift = wilkinson_shift(&h);
            h = qr_sweep(&h, shift)?;
            sweeps += 1;
        }
        tracing::trace!(size = m, sweeps, "eigenvalue deflated");
        values.push(h.get(m - 1, m - 1));
        h = h.submatrix(0, 0, m - 1, m - 1)?;
    }

    if h.height() == 2 {
        for _ in 0..UNSHIFTED_QR_SWEEPS {
            h = qr_sweep(&h, 0.0)?;
        }
        if h.get(1, 0).abs() < tolerance {
            values.push(h.get(1, 1));
            values.push(h.get(0, 0));
        } else {
            let (high, low) = eigenvalues_2x2(&h).ok_or(TensioError::SolverDivergence {
                iterations: UNSHIFTED_QR_SWEEPS as u32,
                residual: h.get(1, 0).abs(),
            })?;
            values.push(high);
            values.push(low);
        }
    } else {
        values.push(h.get(0, 0));
    }

    values.sort_by(|x, y| y.total_cmp(x));
    Ok(values)
}

/// Unit eigenvector of `A` for `eigenvalue`, by inverse iteration.
///
/// Starts from the normalized all-ones vector. The shift is clamped to at
/// least `approximate_zero_by` in magnitude and nudged by that amount while
/// `A − μI` has a zero LU pivot. Stops when `‖A·x − λ·x‖` drops below
/// [`EIGENVECTOR_RESIDUAL`].
pub fn eigenvector_of(a: &Matrix, eigenvalue: f64, approximate_zero_by: f64) -> TensioResult<Vector> {
    if !a.is_square() {
        return Err(TensioError::shape("eigenvector_of", a.shape(), (a.height(), a.height())));
    }
    let n = a.height();
    if n == 0 {
        return Ok(Vector::zeros(0));
    }

    let mut shift = if eigenvalue.abs() < approximate_zero_by {
        if eigenvalue < 0.0 {
            -approximate_zero_by
        } else {
            approximate_zero_by
        }
    } else {
        eigenvalue
    };

    let mut factors = None;
    for _ in 0..8 {
        let mut shifted = a.clone();
        shifted.add_diagonal(-shift)?;
        match decomposition::lu(&shifted) {
            Ok(lu) => {
                factors = Some(lu);
                break;
            }
            Err(TensioError::SingularMatrix(_)) => shift += approximate_zero_by,
            Err(other) => return Err(other),
        }
    }
    let (l, u) = factors.ok_or_else(|| {
        TensioError::SingularMatrix(format!("A - {shift}I stayed singular during inverse iteration"))
    })?;

    let mut x = Vector::ones(n);
    x.normalize();
    let mut residual = f64::INFINITY;

    for _ in 0..MAX_INVERSE_ITERATIONS {
        let mut y = solve::lu_prefactored(&l, &u, &x, None)?;
        let norm = y.norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(TensioError::SingularMatrix(
                "inverse iteration produced a degenerate vector".into(),
            ));
        }
        y.multiply_scalar(1.0 / norm);
        x = y;

        let mut r = a.multiply_vector(&x)?;
        r.add_scaled(&x, -eigenvalue)?;
        residual = r.norm();
        if residual < EIGENVECTOR_RESIDUAL {
            return Ok(x);
        }
    }

    Err(TensioError::SolverDivergence {
        iterations: MAX_INVERSE_ITERATIONS as u32,
        residual,
    })
}
