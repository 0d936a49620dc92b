//! Ground plane collision.
//!
//! A horizontal plane at `z = height`. Free points that end a step below
//! it are projected onto it, and a downward velocity is reflected and
//! scaled by the restitution constant.

use serde::{Deserialize, Serialize};

use crate::state::SimulationState;

/// Result of ground contact resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactResult {
    /// Number of points clamped to the plane.
    pub resolved_count: u32,
    /// Deepest penetration found before clamping.
    pub max_penetration: f64,
}

/// Ground plane collision at a fixed z height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    /// Height of the plane (z coordinate).
    pub height: f64,
    /// Fraction of the downward speed kept after impact, in `[0, 1]`.
    pub restitution: f64,
}

impl GroundPlane {
    pub fn new(height: f64, restitution: f64) -> Self {
        Self { height, restitution }
    }

    /// Clamp penetrating free points and reflect their downward velocity.
    pub fn resolve(&self, state: &mut SimulationState) -> ContactResult {
        let mut result = ContactResult::default();

        for i in 0..state.point_count() {
            if state.is_fixed[i] {
                continue;
            }
            let z = 3 * i + 2;
            let depth = self.height - state.positions[z];
            if depth > 0.0 {
                state.positions[z] = self.height;
                if state.velocities[z] < 0.0 {
                    state.velocities[z] *= -self.restitution;
                }
                result.resolved_count += 1;
                result.max_penetration = result.max_penetration.max(depth);
            }
        }

        result
    }
}
