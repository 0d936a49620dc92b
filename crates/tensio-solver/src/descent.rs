//! Descent-method optimizers.
//!
//! Each simulation step minimizes an energy in the positions. The
//! [`Objective`] trait is the seam: the simulator implements it (see
//! [`SystemObjective`](crate::assembly::SystemObjective)) and the updates
//! here only see energy, gradient and Hessian.
//!
//! Numerical failures in a linear solve are not errors for the caller:
//! the update is skipped for this frame and reported as
//! [`NewtonStep::Skipped`]. Shape errors still propagate.

use serde::{Deserialize, Serialize};
use tensio_accel::AccelContext;
use tensio_math::decomposition::hessian_modification_default;
use tensio_math::eigen::{eigenvalues, eigenvector_of, DEFAULT_APPROXIMATE_ZERO, DEFAULT_EIGEN_TOLERANCE};
use tensio_math::{find_stepsize_by_wolfe_conditions, solve, Matrix, Vector, WolfeParams};
use tensio_types::constants::DEGENERATE_GRADIENT;
use tensio_types::TensioResult;

use crate::multigrid::Multigrid;

/// A twice-differentiable energy over a flat coordinate vector.
pub trait Objective {
    fn energy(&self, x: &Vector) -> TensioResult<f64>;
    fn gradient(&self, x: &Vector) -> TensioResult<Vector>;
    fn hessian(&self, x: &Vector) -> TensioResult<Matrix>;
}

/// Options of [`update_by_newton_raphson`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewtonOptions {
    /// Take the full Newton step instead of searching for a stepsize.
    pub simulates_inertia: bool,
    /// Negative-curvature directions tried when the gradient vanishes.
    pub tries_orthogonal_directions: usize,
}

/// Why an update left `x` untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Factorization or linear solve failed.
    SolveFailed,
    /// The search direction had zero norm.
    ZeroDirection,
    /// The direction or the result was not finite.
    NonFinite,
    /// The line search found no decrease along the direction.
    NoDescent,
    /// Critical point with no energy-lowering curvature direction.
    CriticalPoint,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SolveFailed => "solve_failed",
            SkipReason::ZeroDirection => "zero_direction",
            SkipReason::NonFinite => "non_finite",
            SkipReason::NoDescent => "no_descent",
            SkipReason::CriticalPoint => "critical_point",
        }
    }

    /// True when the skip means `x` is already at a minimum rather than a
    /// numerical failure.
    pub fn is_at_rest(&self) -> bool {
        matches!(self, SkipReason::ZeroDirection)
    }
}

/// Outcome of one descent update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewtonStep {
    /// `x` moved by `stepsize` along a direction of norm `direction_norm`.
    Applied { stepsize: f64, direction_norm: f64 },
    /// `x` was left as it was.
    Skipped(SkipReason),
}

impl NewtonStep {
    pub fn is_applied(&self) -> bool {
        matches!(self, NewtonStep::Applied { .. })
    }
}

/// Turns a recoverable numerical failure into a skip.
fn recover<T>(result: TensioResult<T>) -> TensioResult<Result<T, SkipReason>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_recoverable() => {
            tracing::warn!(error = %e, "descent update skipped");
            Ok(Err(SkipReason::SolveFailed))
        }
        Err(e) => Err(e),
    }
}

/// Energy at `x + α·p`; evaluation failures read as +∞ so the line search
/// rejects them.
fn energy_along<O: Objective + ?Sized>(objective: &O, x: &Vector, p: &Vector, alpha: f64) -> f64 {
    let mut trial = x.clone();
    if trial.add_scaled(p, alpha).is_err() {
        return f64::INFINITY;
    }
    objective.energy(&trial).unwrap_or(f64::INFINITY)
}

fn slope_along<O: Objective + ?Sized>(objective: &O, x: &Vector, p: &Vector, alpha: f64) -> f64 {
    let mut trial = x.clone();
    if trial.add_scaled(p, alpha).is_err() {
        return f64::NAN;
    }
    objective
        .gradient(&trial)
        .and_then(|g| g.dot(p))
        .unwrap_or(f64::NAN)
}

/// One Newton-Raphson update of `x` in place.
///
/// Solves `(H + τI)·p = −g` through
/// [`hessian_modification`](tensio_math::decomposition::hessian_modification)
/// so `p` is a descent direction, then moves `x` by `α·p` with `α = 1`
/// when simulating inertia and a strong Wolfe stepsize otherwise.
///
/// When `tries_orthogonal_directions > 0` and the gradient norm is below
/// [`DEGENERATE_GRADIENT`], the step instead tries up to that many
/// eigenvectors of negative Hessian eigenvalues (both signs) and takes the
/// first one that lowers the energy. Degenerate gradient entries are never
/// zero-replaced; this eigenvector search is the saddle guard instead.
pub fn update_by_newton_raphson<O: Objective + ?Sized>(
    x: &mut Vector,
    objective: &O,
    options: NewtonOptions,
    accel: &AccelContext,
) -> TensioResult<NewtonStep> {
    let gradient = objective.gradient(x)?;
    let hessian = objective.hessian(x)?;

    if options.tries_orthogonal_directions > 0 && gradient.norm() < DEGENERATE_GRADIENT {
        return escape_saddle(x, objective, &hessian, options.tries_orthogonal_directions, accel);
    }

    let factor = match recover(hessian_modification_default(&hessian))? {
        Ok(l) => l,
        Err(reason) => return Ok(NewtonStep::Skipped(reason)),
    };
    let rhs = gradient.multiply_scalar_new(-1.0);
    let direction = match recover(solve::cholesky_prefactored(&factor, &rhs))? {
        Ok(p) => p,
        Err(reason) => return Ok(NewtonStep::Skipped(reason)),
    };

    let direction_norm = direction.norm();
    if !direction_norm.is_finite() {
        return Ok(NewtonStep::Skipped(SkipReason::NonFinite));
    }
    if direction_norm == 0.0 {
        return Ok(NewtonStep::Skipped(SkipReason::ZeroDirection));
    }

    let stepsize = if options.simulates_inertia {
        1.0
    } else {
        let point = x.clone();
        let alpha = find_stepsize_by_wolfe_conditions(
            |a| energy_along(objective, &point, &direction, a),
            |a| slope_along(objective, &point, &direction, a),
            WolfeParams::default(),
        );
        tracing::trace!(stepsize = alpha, "wolfe stepsize");
        alpha
    };
    if stepsize == 0.0 {
        return Ok(NewtonStep::Skipped(SkipReason::NoDescent));
    }

    x.add_scaled_with(&direction, stepsize, accel)?;
    Ok(NewtonStep::Applied {
        stepsize,
        direction_norm,
    })
}

fn escape_saddle<O: Objective + ?Sized>(
    x: &mut Vector,
    objective: &O,
    hessian: &Matrix,
    tries: usize,
    accel: &AccelContext,
) -> TensioResult<NewtonStep> {
    let values = match recover(eigenvalues(hessian, DEFAULT_EIGEN_TOLERANCE))? {
        Ok(values) => values,
        Err(reason) => return Ok(NewtonStep::Skipped(reason)),
    };
    let current = objective.energy(x)?;

    // Most negative curvature first.
    for &lambda in values.iter().rev().filter(|&&l| l < 0.0).take(tries) {
        let v = match eigenvector_of(hessian, lambda, DEFAULT_APPROXIMATE_ZERO) {
            Ok(v) => v,
            Err(e) if e.is_recoverable() => continue,
            Err(e) => return Err(e),
        };
        for sign in [1.0, -1.0] {
            if energy_along(objective, x, &v, sign) < current {
                tracing::trace!(eigenvalue = lambda, sign, "escaping critical point");
                x.add_scaled_with(&v, sign, accel)?;
                return Ok(NewtonStep::Applied {
                    stepsize: 1.0,
                    direction_norm: v.norm(),
                });
            }
        }
    }

    Ok(NewtonStep::Skipped(SkipReason::CriticalPoint))
}

/// Newton update solved by a multigrid V-cycle.
///
/// Moves `x` to the inertial prediction `x + v·dt`, rebuilds the level
/// systems from the Hessian there, solves `H·p = −g` approximately and
/// applies `x += p`.
///
/// The V-cycle result is accepted only if it is finite, reduces the linear
/// residual below `‖g‖` and is a descent direction (`g·p < 0`). Otherwise
/// `x` is restored to its value on entry and the update is reported as a
/// skip.
pub fn update_by_newton_multigrid<O: Objective + ?Sized>(
    multigrid: &mut Multigrid,
    x: &mut Vector,
    objective: &O,
    velocity: &Vector,
    timestep: f64,
    accel: &AccelContext,
) -> TensioResult<NewtonStep> {
    let start = x.clone();
    x.add_scaled_with(velocity, timestep, accel)?;

    match multigrid_direction(multigrid, x, objective)? {
        Ok(direction) => {
            let direction_norm = direction.norm();
            x.add_scaled_with(&direction, 1.0, accel)?;
            Ok(NewtonStep::Applied {
                stepsize: 1.0,
                direction_norm,
            })
        }
        Err(reason) => {
            x.copy_from(&start)?;
            Ok(NewtonStep::Skipped(reason))
        }
    }
}

/// Approximate Newton direction at `x`, or why it was rejected.
fn multigrid_direction<O: Objective + ?Sized>(
    multigrid: &mut Multigrid,
    x: &Vector,
    objective: &O,
) -> TensioResult<Result<Vector, SkipReason>> {
    let hessian = objective.hessian(x)?;
    let gradient = objective.gradient(x)?;
    let rhs = gradient.multiply_scalar_new(-1.0);
    if let Err(reason) = recover(multigrid.set_system(&hessian))? {
        return Ok(Err(reason));
    }

    let mut direction = Vector::zeros(x.len());
    if let Err(reason) = recover(multigrid.solve(&mut direction, &rhs))? {
        return Ok(Err(reason));
    }

    if !direction.is_finite() {
        return Ok(Err(SkipReason::NonFinite));
    }
    if direction.norm() == 0.0 {
        return Ok(Err(SkipReason::ZeroDirection));
    }

    let residual = solve::residual(&hessian, &direction, &rhs)?.norm();
    if !(residual <= rhs.norm()) {
        tracing::debug!(residual, rhs = rhs.norm(), "multigrid correction rejected");
        return Ok(Err(SkipReason::SolveFailed));
    }
    if !(gradient.dot(&direction)? < 0.0) {
        return Ok(Err(SkipReason::NoDescent));
    }

    Ok(Ok(direction))
}
