//! Simulation state: per-point buffers stored as point-major 3n vectors.
//!
//! This is the primary mutable data structure during simulation. The
//! update strategies read and write `positions`; the simulator maintains
//! the rest of the buffers around them each step.

use glam::DVec3;
use tensio_math::Vector;
use tensio_types::TensioResult;

use crate::kinetic;
use crate::scene::Scene;

/// Per-point state of the mass-spring network.
///
/// # Layout
///
/// Every vector has length `3n`:
/// ```text
/// positions: [x0, y0, z0, x1, y1, z1, ...]
/// mass3:     [m0, m0, m0, m1, m1, m1, ...]
/// ```
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Current positions.
    pub positions: Vector,
    /// Rest pose, the target of the fixed-point penalty.
    pub original_positions: Vector,
    /// Snapshot taken at the start of each step.
    pub previous_positions: Vector,
    pub velocities: Vector,
    /// Mass replicated per axis.
    pub mass3: Vector,
    /// Per-point fixed flags (length `n`).
    pub is_fixed: Vec<bool>,
}

impl SimulationState {
    /// Initialize state from a validated scene. Velocities start at zero.
    pub fn from_scene(scene: &Scene) -> TensioResult<Self> {
        scene.validate()?;
        let n = scene.point_count();
        let positions = Vector::from_slice(&scene.positions);
        let mass3 = Vector::from_vec(scene.masses.iter().flat_map(|&m| [m, m, m]).collect());
        Ok(Self {
            original_positions: positions.clone(),
            previous_positions: positions.clone(),
            positions,
            velocities: Vector::zeros(3 * n),
            mass3,
            is_fixed: (0..n).map(|i| scene.is_fixed(i)).collect(),
        })
    }

    pub fn point_count(&self) -> usize {
        self.is_fixed.len()
    }

    pub fn position(&self, i: usize) -> DVec3 {
        self.positions.block3(i)
    }

    pub fn velocity(&self, i: usize) -> DVec3 {
        self.velocities.block3(i)
    }

    pub fn mass(&self, i: usize) -> f64 {
        self.mass3[3 * i]
    }

    /// Save current positions as "previous" for this step.
    pub fn save_previous(&mut self) {
        self.previous_positions
            .as_mut_slice()
            .copy_from_slice(self.positions.as_slice());
    }

    /// Puts fixed points back where they were at the start of the step.
    pub fn unmove_fixed_points(&mut self) {
        for i in 0..self.point_count() {
            if self.is_fixed[i] {
                let p = self.previous_positions.block3(i);
                self.positions.set_block3(i, p);
            }
        }
    }

    /// `v = (x − x_prev)/dt · (1 − air_resistance)`.
    pub fn update_velocities(&mut self, dt: f64, air_resistance: f64) {
        let factor = (1.0 - air_resistance) / dt;
        let x = self.positions.as_slice();
        let x0 = self.previous_positions.as_slice();
        for ((v, a), b) in self.velocities.as_mut_slice().iter_mut().zip(x).zip(x0) {
            *v = (a - b) * factor;
        }
    }

    /// Largest per-point displacement since the start of the step.
    pub fn max_displacement(&self) -> f64 {
        (0..self.point_count())
            .map(|i| self.positions.block3(i).distance(self.previous_positions.block3(i)))
            .fold(0.0, f64::max)
    }

    /// Compute total kinetic energy: 0.5 * Σ m_i * ||v_i||².
    pub fn kinetic_energy(&self) -> f64 {
        kinetic::kinetic_energy(&self.velocities, &self.mass3)
    }
}
