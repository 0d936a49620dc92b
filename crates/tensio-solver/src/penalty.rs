//! Quadratic penalty pinning fixed points to their rest positions.
//!
//! `E = ½ k Σ_fixed ‖xᵢ − x̄ᵢ‖²`. Only the Newton update uses it; the other
//! modes re-pin fixed points after the update instead.

use tensio_math::{Matrix, Vector};

/// Penalty parameters borrowed from the simulation state.
#[derive(Debug, Clone, Copy)]
pub struct FixedPointPenalty<'a> {
    pub stiffness: f64,
    pub rest: &'a Vector,
    pub is_fixed: &'a [bool],
}

impl FixedPointPenalty<'_> {
    fn fixed_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.is_fixed
            .iter()
            .enumerate()
            .filter(|(_, fixed)| **fixed)
            .flat_map(|(i, _)| 3 * i..3 * i + 3)
    }

    pub fn energy(&self, x: &Vector) -> f64 {
        self.fixed_dofs()
            .map(|i| {
                let d = x[i] - self.rest[i];
                0.5 * self.stiffness * d * d
            })
            .sum()
    }

    pub fn add_gradient(&self, x: &Vector, gradient: &mut Vector) {
        for i in self.fixed_dofs() {
            gradient[i] += self.stiffness * (x[i] - self.rest[i]);
        }
    }

    pub fn add_hessian(&self, hessian: &mut Matrix) {
        for i in self.fixed_dofs() {
            hessian.add_at(i, i, self.stiffness);
        }
    }
}
