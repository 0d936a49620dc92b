//! Geometric multigrid over the point set.
//!
//! The hierarchy is built once from the rest positions:
//!
//! 1. **Coarsening**: level `l` keeps `ceil(n / 2^l)` points chosen by
//!    furthest-point sampling over level `l − 1`, starting from its first
//!    index. Each level is a strict subset of the previous one.
//! 2. **Interpolation**: every fine point follows its nearest coarse point.
//!    A coarse point carries 12 affine DOFs (a 3×3 matrix and a
//!    translation); the finest operator uses the 3×12 block
//!    `[(p − c)ᵀ, 1] ⊗ I₃`, deeper ones copy the 12 DOFs (identity block).
//! 3. **Restriction**: the transpose of interpolation.
//!
//! Only the per-level systems change afterwards: [`Multigrid::set_system`]
//! recomputes them from each new Hessian by Galerkin projection.

use glam::DVec3;
use tensio_math::decomposition::{self, hessian_modification_default};
use tensio_math::solve::{self, Termination};
use tensio_math::{Matrix, Vector};
use tensio_types::{TensioError, TensioResult};

use crate::config::MultigridConfig;

/// Relative diagonal shift on coarse systems, for affine modes no fine
/// point constrains.
pub const COARSE_REGULARIZATION: f64 = 1.0e-8;

/// Affine DOFs per coarse point.
pub const AFFINE_DOFS: usize = 12;

/// Relative residual above which the coarsest LU solve is rejected.
const COARSE_RESIDUAL_TOLERANCE: f64 = 1.0e-6;

/// A multigrid hierarchy with per-level systems.
#[derive(Debug, Clone)]
pub struct Multigrid {
    grids: Vec<Vec<usize>>,
    interpolations: Vec<Matrix>,
    restrictions: Vec<Matrix>,
    systems: Vec<Matrix>,
    config: MultigridConfig,
}

impl Multigrid {
    /// Builds the hierarchy for `points` with up to `config.levels` levels.
    pub fn build(points: &[DVec3], config: MultigridConfig) -> TensioResult<Self> {
        if points.is_empty() {
            return Err(TensioError::InvalidScene("multigrid needs at least one point".into()));
        }
        if config.levels == 0 {
            return Err(TensioError::InvalidConfig("multigrid needs at least one level".into()));
        }

        let n = points.len();
        let mut grids: Vec<Vec<usize>> = vec![(0..n).collect()];
        for level in 1..config.levels {
            let target = n.div_ceil(1usize << level.min(usize::BITS as usize - 1));
            let previous = &grids[level - 1];
            if target >= previous.len() {
                break;
            }
            let coarse = furthest_point_sampling(points, previous, target);
            grids.push(coarse);
        }

        let mut interpolations = Vec::with_capacity(grids.len() - 1);
        for level in 0..grids.len() - 1 {
            interpolations.push(interpolation(points, &grids[level], &grids[level + 1], level == 0));
        }
        let restrictions = interpolations.iter().map(Matrix::transpose).collect();

        tracing::debug!(
            levels = grids.len(),
            coarsest = grids.last().map_or(0, Vec::len),
            "multigrid hierarchy built"
        );

        Ok(Self {
            grids,
            interpolations,
            restrictions,
            systems: Vec::new(),
            config,
        })
    }

    /// Number of levels actually built (at most `config.levels`).
    pub fn levels(&self) -> usize {
        self.grids.len()
    }

    /// Point indices kept at each level; level 0 holds every point.
    pub fn grids(&self) -> &[Vec<usize>] {
        &self.grids
    }

    /// Prolongation from level `level + 1` to level `level`.
    pub fn interpolation(&self, level: usize) -> Option<&Matrix> {
        self.interpolations.get(level)
    }

    /// Restriction from level `level` to level `level + 1`.
    pub fn restriction(&self, level: usize) -> Option<&Matrix> {
        self.restrictions.get(level)
    }

    /// System matrix of a level, once [`set_system`](Self::set_system) ran.
    pub fn system(&self, level: usize) -> Option<&Matrix> {
        self.systems.get(level)
    }

    pub fn config(&self) -> &MultigridConfig {
        &self.config
    }

    /// Installs `hessian` as the finest system and projects it down.
    pub fn set_system(&mut self, hessian: &Matrix) -> TensioResult<()> {
        let dofs = 3 * self.grids[0].len();
        if hessian.shape() != (dofs, dofs) {
            return Err(TensioError::shape("multigrid_system", hessian.shape(), (dofs, dofs)));
        }

        let mut systems = Vec::with_capacity(self.levels());
        systems.push(hessian.clone());
        for (u, r) in self.interpolations.iter().zip(&self.restrictions) {
            let fine = systems.last().ok_or_else(|| {
                TensioError::InvalidConfig("multigrid hierarchy has no finest level".into())
            })?;
            let mut coarse = r.multiply(&fine.multiply(u)?)?;
            let shift = COARSE_REGULARIZATION * coarse.diagonal().into_iter().fold(0.0, f64::max);
            if shift > 0.0 {
                coarse.add_diagonal(shift)?;
            }
            systems.push(coarse);
        }
        self.systems = systems;
        Ok(())
    }

    /// Runs `config.iterations` V-cycles on `A·x = b`, improving `x` in place.
    pub fn solve(&self, x: &mut Vector, b: &Vector) -> TensioResult<()> {
        self.solve_with(x, b, self.config.iterations, self.config.smooth_sweeps)
    }

    /// [`solve`](Self::solve) with explicit cycle and smoothing counts.
    pub fn solve_with(&self, x: &mut Vector, b: &Vector, iterations: usize, smooth: usize) -> TensioResult<()> {
        if self.systems.len() != self.levels() {
            return Err(TensioError::InvalidConfig(
                "multigrid solve called before set_system".into(),
            ));
        }
        for _ in 0..iterations {
            self.v_cycle(0, x, b, smooth)?;
        }
        Ok(())
    }

    fn v_cycle(&self, level: usize, x: &mut Vector, b: &Vector, smooth: usize) -> TensioResult<()> {
        let a = &self.systems[level];
        if level + 1 == self.levels() {
            let solution = solve_coarsest(a, b)?;
            return x.copy_from(&solution);
        }

        solve::gauss_seidel(a, x, b, Termination::Sweeps(smooth))?;

        let residual = solve::residual(a, x, b)?;
        let coarse_rhs = self.restrictions[level].multiply_vector(&residual)?;
        let mut correction = Vector::zeros(coarse_rhs.len());
        self.v_cycle(level + 1, &mut correction, &coarse_rhs, smooth)?;
        x.add(&self.interpolations[level].multiply_vector(&correction)?)?;

        solve::gauss_seidel(a, x, b, Termination::Sweeps(smooth))?;
        Ok(())
    }
}

/// Direct solve at the coarsest level: LU first, shifted Cholesky when LU
/// fails or returns a poor solution.
fn solve_coarsest(a: &Matrix, b: &Vector) -> TensioResult<Vector> {
    let tolerance = COARSE_RESIDUAL_TOLERANCE * b.norm().max(1.0);
    match decomposition::lu(a).and_then(|(l, u)| solve::lu_prefactored(&l, &u, b, None)) {
        Ok(x) => {
            if x.is_finite() && solve::residual(a, &x, b)?.norm() <= tolerance {
                return Ok(x);
            }
            tracing::trace!("coarse LU solve inaccurate, falling back to Cholesky");
        }
        Err(e) if e.is_recoverable() => tracing::trace!(error = %e, "coarse LU failed, falling back to Cholesky"),
        Err(e) => return Err(e),
    }
    let l = hessian_modification_default(a)?;
    solve::cholesky_prefactored(&l, b)
}

/// Greedy furthest-point subset of `candidates` of size `target`, seeded
/// with the first candidate.
pub fn furthest_point_sampling(points: &[DVec3], candidates: &[usize], target: usize) -> Vec<usize> {
    let target = target.min(candidates.len());
    let mut chosen = Vec::with_capacity(target);
    let Some(&seed) = candidates.first() else {
        return chosen;
    };
    chosen.push(seed);

    let mut nearest: Vec<f64> = candidates
        .iter()
        .map(|&c| points[c].distance_squared(points[seed]))
        .collect();

    while chosen.len() < target {
        let mut best = 0;
        for (k, &d) in nearest.iter().enumerate() {
            if d > nearest[best] {
                best = k;
            }
        }
        let pick = candidates[best];
        chosen.push(pick);
        for (k, &c) in candidates.iter().enumerate() {
            nearest[k] = nearest[k].min(points[c].distance_squared(points[pick]));
        }
    }

    chosen
}

fn nearest_in(points: &[DVec3], grid: &[usize], p: DVec3) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (k, &c) in grid.iter().enumerate() {
        let d = points[c].distance_squared(p);
        if d < best_distance {
            best_distance = d;
            best = k;
        }
    }
    best
}

/// Prolongation from `coarse` to `fine`.
fn interpolation(points: &[DVec3], fine: &[usize], coarse: &[usize], finest: bool) -> Matrix {
    let fine_dofs = if finest { 3 } else { AFFINE_DOFS };
    let mut u = Matrix::zeros(fine_dofs * fine.len(), AFFINE_DOFS * coarse.len());

    for (row, &f) in fine.iter().enumerate() {
        let col = nearest_in(points, coarse, points[f]);
        let (r0, c0) = (fine_dofs * row, AFFINE_DOFS * col);
        if finest {
            let offset = points[f] - points[coarse[col]];
            let weights = [offset.x, offset.y, offset.z, 1.0];
            for (j, &w) in weights.iter().enumerate() {
                for axis in 0..3 {
                    u.set(r0 + axis, c0 + 3 * j + axis, w);
                }
            }
        } else {
            for k in 0..AFFINE_DOFS {
                u.set(r0 + k, c0 + k, 1.0);
            }
        }
    }

    u
}
