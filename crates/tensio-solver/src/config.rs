//! Simulator configuration.
//!
//! Parameters that control the update strategy, the physical model and
//! collision handling. Loaded from TOML by the CLI; every field has a
//! default so partial files are accepted.

use serde::{Deserialize, Serialize};
use tensio_types::constants::{
    DEFAULT_ACCEL_THRESHOLD, DEFAULT_FIXED_POINT_STIFFNESS, DEFAULT_GROUND_HEIGHT,
    DEFAULT_PD_ITERATIONS, DEFAULT_SPRING_CONSTANT, DEFAULT_TIMESTEP, GRAVITY,
};
use tensio_types::{TensioError, TensioResult};

use crate::strategy::UpdateMode;

/// Shape and effort of the multigrid hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultigridConfig {
    /// Number of levels including the finest one.
    pub levels: usize,
    /// V-cycles per solve.
    pub iterations: usize,
    /// Gauss-Seidel sweeps before and after each coarse correction.
    pub smooth_sweeps: usize,
}

impl Default for MultigridConfig {
    fn default() -> Self {
        Self {
            levels: 2,
            iterations: 4,
            smooth_sweeps: 2,
        }
    }
}

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Update strategy.
    pub mode: UpdateMode,

    /// Timestep (seconds).
    pub timestep: f64,

    /// Gravitational acceleration along −z (m/s²).
    pub gravity: f64,

    /// Fraction of velocity removed each step, in `[0, 1]`.
    pub air_resistance: f64,

    /// Height of the ground plane (z coordinate).
    pub ground_height: f64,

    /// Fraction of downward velocity reflected on ground contact, in `[0, 1]`.
    pub constant_of_restitution: f64,

    /// Penalty stiffness holding fixed points at rest (Newton mode only).
    pub fixed_point_stiffness: f64,

    /// Stiffness for springs the scene does not specify.
    pub default_spring_constant: f64,

    /// Newton updates per step.
    pub newton_iterations: u32,

    /// Include the inertial term; without it Newton uses a Wolfe line search.
    pub simulates_inertia: bool,

    /// Negative-curvature directions tried at a critical point (0 disables).
    pub tries_orthogonal_directions: usize,

    /// Local/global rounds per Projective Dynamics step.
    pub pd_iterations: u32,

    /// Multigrid hierarchy settings.
    pub multigrid: MultigridConfig,

    /// Vector length above which elementwise updates run in parallel.
    pub accel_threshold: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            mode: UpdateMode::Newton,
            timestep: DEFAULT_TIMESTEP,
            gravity: GRAVITY,
            air_resistance: 0.01,
            ground_height: DEFAULT_GROUND_HEIGHT,
            constant_of_restitution: 0.5,
            fixed_point_stiffness: DEFAULT_FIXED_POINT_STIFFNESS,
            default_spring_constant: DEFAULT_SPRING_CONSTANT,
            newton_iterations: 1,
            simulates_inertia: true,
            tries_orthogonal_directions: 0,
            pd_iterations: DEFAULT_PD_ITERATIONS,
            multigrid: MultigridConfig::default(),
            accel_threshold: DEFAULT_ACCEL_THRESHOLD,
        }
    }
}

impl SimulatorConfig {
    /// Creates a config for debugging (cheap steps, heavy damping).
    pub fn debug() -> Self {
        Self {
            air_resistance: 0.1,
            pd_iterations: 3,
            multigrid: MultigridConfig {
                iterations: 1,
                ..MultigridConfig::default()
            },
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more iterations per step).
    pub fn high_quality() -> Self {
        Self {
            newton_iterations: 3,
            pd_iterations: 30,
            multigrid: MultigridConfig {
                levels: 3,
                iterations: 8,
                smooth_sweeps: 3,
            },
            ..Default::default()
        }
    }

    /// Same config with a different update mode.
    pub fn with_mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> TensioResult<()> {
        fn invalid(message: String) -> TensioResult<()> {
            Err(TensioError::InvalidConfig(message))
        }

        if !(self.timestep > 0.0 && self.timestep.is_finite()) {
            return invalid(format!("timestep must be positive, got {}", self.timestep));
        }
        if !self.gravity.is_finite() {
            return invalid("gravity must be finite".into());
        }
        if !(0.0..=1.0).contains(&self.air_resistance) {
            return invalid(format!(
                "air_resistance must be in [0, 1], got {}",
                self.air_resistance
            ));
        }
        if !self.ground_height.is_finite() {
            return invalid("ground_height must be finite".into());
        }
        if !(0.0..=1.0).contains(&self.constant_of_restitution) {
            return invalid(format!(
                "constant_of_restitution must be in [0, 1], got {}",
                self.constant_of_restitution
            ));
        }
        if !(self.fixed_point_stiffness > 0.0) {
            return invalid("fixed_point_stiffness must be positive".into());
        }
        if !(self.default_spring_constant > 0.0) {
            return invalid("default_spring_constant must be positive".into());
        }
        if self.newton_iterations == 0 {
            return invalid("newton_iterations must be at least 1".into());
        }
        if self.pd_iterations == 0 {
            return invalid("pd_iterations must be at least 1".into());
        }
        if self.multigrid.levels == 0 || self.multigrid.iterations == 0 {
            return invalid("multigrid levels and iterations must be at least 1".into());
        }
        Ok(())
    }
}
