//! Strong Wolfe line search.
//!
//! Bracket-and-zoom over a one-dimensional restriction `φ(α) = f(x + α·p)`
//! (Nocedal & Wright, algorithms 3.5 and 3.6). The caller supplies `φ` and
//! its derivative `φ'` as closures.

use serde::{Deserialize, Serialize};

/// Maximum expansions of the bracketing phase.
const MAX_BRACKET_STEPS: usize = 50;

/// Maximum refinements inside `zoom`.
const MAX_ZOOM_STEPS: usize = 60;

/// Bracket width below which `zoom` returns its low end.
const BRACKET_COLLAPSE: f64 = 1.0e-12;

/// Parameters of [`find_stepsize_by_wolfe_conditions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WolfeParams {
    /// Largest stepsize the bracketing phase may try.
    pub upper_bound: f64,
    /// Sufficient-decrease constant.
    pub c1: f64,
    /// Curvature constant, `c1 < c2 < 1`.
    pub c2: f64,
    /// First trial step; `1.0` (clamped to `upper_bound`) when absent.
    pub initial_step: Option<f64>,
}

impl Default for WolfeParams {
    fn default() -> Self {
        Self {
            upper_bound: 1.0e9,
            c1: 0.1,
            c2: 0.9,
            initial_step: None,
        }
    }
}

struct Sample {
    alpha: f64,
    value: f64,
    slope: f64,
}

/// Returns a stepsize satisfying the strong Wolfe conditions for `φ`.
///
/// `f(α)` evaluates `φ` and `df(α)` its derivative. Returns `0.0` when
/// `φ'(0) ≥ 0` (not a descent direction). If the search runs out of
/// refinements or the bracket collapses, the best low end found is returned.
pub fn find_stepsize_by_wolfe_conditions<F, D>(mut f: F, mut df: D, params: WolfeParams) -> f64
where
    F: FnMut(f64) -> f64,
    D: FnMut(f64) -> f64,
{
    let phi0 = f(0.0);
    let slope0 = df(0.0);
    if !(slope0 < 0.0) || !phi0.is_finite() {
        return 0.0;
    }

    let sufficient = |alpha: f64, value: f64| value <= phi0 + params.c1 * alpha * slope0;
    let curvature = |slope: f64| slope.abs() <= -params.c2 * slope0;

    let mut prev = Sample {
        alpha: 0.0,
        value: phi0,
        slope: slope0,
    };
    let mut alpha = params.initial_step.unwrap_or(1.0).min(params.upper_bound);

    for i in 0..MAX_BRACKET_STEPS {
        let value = f(alpha);
        tracing::trace!(alpha, value, "wolfe bracket");

        if !sufficient(alpha, value) || (i > 0 && value >= prev.value) {
            return zoom(&mut f, &mut df, prev, alpha, value, phi0, slope0, params);
        }

        let slope = df(alpha);
        if curvature(slope) {
            return alpha;
        }
        if slope >= 0.0 {
            let lo = Sample { alpha, value, slope };
            return zoom(&mut f, &mut df, lo, prev.alpha, prev.value, phi0, slope0, params);
        }

        if alpha >= params.upper_bound {
            return alpha;
        }
        prev = Sample { alpha, value, slope };
        alpha = (2.0 * alpha).min(params.upper_bound);
    }

    prev.alpha
}

/// Refines the bracket `[lo, hi]` (in either order) until a strong Wolfe
/// point is found. `lo` always satisfies sufficient decrease and has the
/// lowest value seen so far.
#[allow(clippy::too_many_arguments)]
fn zoom<F, D>(
    f: &mut F,
    df: &mut D,
    mut lo: Sample,
    mut hi: f64,
    mut hi_value: f64,
    phi0: f64,
    slope0: f64,
    params: WolfeParams,
) -> f64
where
    F: FnMut(f64) -> f64,
    D: FnMut(f64) -> f64,
{
    for _ in 0..MAX_ZOOM_STEPS {
        let width = hi - lo.alpha;
        if width.abs() < BRACKET_COLLAPSE {
            break;
        }

        // Quadratic through φ(lo), φ'(lo) and φ(hi).
        let curvature = (hi_value - lo.value - lo.slope * width) / (width * width);
        let mut trial = if curvature > 0.0 {
            lo.alpha - lo.slope / (2.0 * curvature)
        } else {
            f64::NAN
        };
        let (left, right) = if lo.alpha < hi { (lo.alpha, hi) } else { (hi, lo.alpha) };
        if !trial.is_finite() || trial <= left || trial >= right {
            trial = 0.5 * (lo.alpha + hi);
        }

        let value = f(trial);
        tracing::trace!(alpha = trial, value, "wolfe zoom");

        if value > phi0 + params.c1 * trial * slope0 || value >= lo.value {
            hi = trial;
            hi_value = value;
            continue;
        }

        let slope = df(trial);
        if slope.abs() <= -params.c2 * slope0 {
            return trial;
        }
        if slope * (hi - lo.alpha) >= 0.0 {
            hi = lo.alpha;
            hi_value = lo.value;
        }
        lo = Sample {
            alpha: trial,
            value,
            slope,
        };
    }

    lo.alpha
}
