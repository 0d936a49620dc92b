//! Simulation event types.
//!
//! Events are small value types tagged with the step they belong to.

use serde::{Deserialize, Serialize};

/// An event emitted while advancing a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Step number (0-indexed).
    pub step: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Step started.
    StepBegin {
        /// Simulated time at the start of the step (seconds).
        sim_time: f64,
        /// Update mode name.
        mode: String,
    },

    /// Step completed.
    StepEnd {
        /// Wall-clock time for the whole step (seconds).
        wall_time: f64,
    },

    /// Newton-type updates performed in the step.
    Update {
        /// Updates applied.
        iterations: u32,
        /// Updates skipped after a failed solve or a degenerate direction.
        skipped: u32,
    },

    /// Energy snapshot after the step.
    Energy {
        kinetic: f64,
        gravity: f64,
        elastic: f64,
        /// Fixed-point penalty; zero outside Newton mode.
        penalty: f64,
    },

    /// Ground contacts resolved in the step.
    GroundContact {
        /// Points pushed back onto the plane.
        resolved: u32,
    },

    /// Largest per-coordinate displacement of the step, compared against a
    /// settling threshold.
    Convergence {
        max_displacement: f64,
        settled: bool,
    },
}

impl SimulationEvent {
    pub fn new(step: u64, kind: EventKind) -> Self {
        Self { step, kind }
    }

    /// Short name of the payload variant, as used in logs.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::StepBegin { .. } => "step_begin",
            EventKind::StepEnd { .. } => "step_end",
            EventKind::Update { .. } => "update",
            EventKind::Energy { .. } => "energy",
            EventKind::GroundContact { .. } => "ground_contact",
            EventKind::Convergence { .. } => "convergence",
        }
    }
}
