//! Update strategies and per-step results.
//!
//! The simulator advances positions with one of three strategies, selected
//! per scene through [`UpdateMode`]. Every call to
//! [`Simulator::simulate`](crate::simulator::Simulator::simulate) reports
//! what happened in a [`StepResult`].

use serde::{Deserialize, Serialize};

use tensio_types::TensioError;

/// Which numerical strategy advances the positions each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Newton-Raphson on the full energy with a Cholesky solve.
    #[default]
    Newton,
    /// Local/global Projective Dynamics with a prefactored system.
    ProjectiveDynamics,
    /// Newton step solved by a multigrid V-cycle.
    Multigrid,
}

impl UpdateMode {
    /// All modes, in declaration order.
    pub const ALL: [UpdateMode; 3] = [
        UpdateMode::Newton,
        UpdateMode::ProjectiveDynamics,
        UpdateMode::Multigrid,
    ];

    /// Stable lowercase name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            UpdateMode::Newton => "newton",
            UpdateMode::ProjectiveDynamics => "projective_dynamics",
            UpdateMode::Multigrid => "multigrid",
        }
    }

    /// Whether fixed points are held by the energy penalty rather than
    /// re-pinned after the update.
    pub fn uses_fixed_penalty(&self) -> bool {
        matches!(self, UpdateMode::Newton)
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for UpdateMode {
    type Err = TensioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newton" => Ok(UpdateMode::Newton),
            "projective_dynamics" | "pd" => Ok(UpdateMode::ProjectiveDynamics),
            "multigrid" | "mg" => Ok(UpdateMode::Multigrid),
            other => Err(TensioError::InvalidConfig(format!("unknown update mode '{other}'"))),
        }
    }
}

/// Result of a simulation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Strategy that produced this step.
    pub mode: UpdateMode,
    /// Newton updates or local/global rounds performed.
    pub iterations: u32,
    /// Updates skipped because the linear solve failed.
    pub skipped: u32,
    /// Total energy after the step (kinetic + gravity + elastic + penalty).
    pub energy: f64,
    /// Points clamped to the ground plane this step.
    pub collisions: u32,
    /// Wall-clock time for this step (seconds).
    pub wall_time: f64,
}
