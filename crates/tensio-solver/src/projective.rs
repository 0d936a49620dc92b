//! Projective Dynamics solver.
//!
//! Implements the local-global iteration loop:
//! 1. **Predict**: inertial position `y = x + h·v`
//! 2. **Local step**: project each spring onto its rest length (closed form)
//! 3. **Global step**: solve the constant SPD system `A·x = rhs`
//! 4. **Repeat** steps 2–3 for a fixed number of rounds
//!
//! The system matrix depends only on masses, stiffnesses and the timestep,
//! so it is factored once at construction.

use glam::DVec3;
use tensio_accel::AccelContext;
use tensio_math::decomposition::hessian_modification_default;
use tensio_math::{solve, Matrix};
use tensio_types::TensioResult;

use crate::assembly::{assemble_projective_rhs, assemble_projective_system};
use crate::gravity;
use crate::spring::SpringData;
use crate::state::SimulationState;

/// Prefactored Projective Dynamics system.
#[derive(Debug, Clone)]
pub struct ProjectiveDynamics {
    /// Cholesky factor of the system matrix.
    factor: Matrix,
    timestep: f64,
}

/// Outcome of one Projective Dynamics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectiveReport {
    /// Local/global rounds performed.
    pub iterations: u32,
    /// Relative change of the positions in the last round.
    pub final_change: f64,
}

impl ProjectiveDynamics {
    /// Assembles and factors the system matrix.
    pub fn new(mass3: &tensio_math::Vector, springs: &[SpringData], timestep: f64) -> TensioResult<Self> {
        let system = assemble_projective_system(mass3, springs, timestep);
        let factor = hessian_modification_default(&system)?;
        tracing::debug!(dofs = mass3.len(), springs = springs.len(), "projective dynamics prefactored");
        Ok(Self { factor, timestep })
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Advances `state.positions` by one step of `iterations` rounds.
    ///
    /// Fixed points move freely here; the caller re-pins them afterwards.
    pub fn step(
        &self,
        state: &mut SimulationState,
        springs: &[SpringData],
        gravity: f64,
        iterations: u32,
        accel: &AccelContext,
    ) -> TensioResult<ProjectiveReport> {
        let dt = self.timestep;
        let mut predicted = state.positions.clone();
        predicted.add_scaled_with(&state.velocities, dt, accel)?;
        let external = gravity::force(&state.mass3, gravity);

        let mut x = predicted.clone();
        let mut targets = vec![DVec3::ZERO; springs.len()];
        let mut final_change = 0.0;

        for iteration in 0..iterations {
            // Local step
            for (target, spring) in targets.iter_mut().zip(springs) {
                *target = spring.project(x.block3(spring.origin.index()), x.block3(spring.end.index()));
            }

            // Global step
            let rhs = assemble_projective_rhs(&state.mass3, dt, &predicted, &external, springs, &targets)?;
            let next = solve::cholesky_prefactored(&self.factor, &rhs)?;

            let scale = x.norm().max(1.0);
            final_change = next.subtract_new(&x)?.norm() / scale;
            x = next;
            tracing::trace!(iteration, change = final_change, "projective dynamics round");
        }

        state.positions.copy_from(&x)?;
        Ok(ProjectiveReport {
            iterations,
            final_change,
        })
    }
}
