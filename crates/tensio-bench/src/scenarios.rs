//! Benchmark scenarios: a scene, a configuration and a step count.
//!
//! 1. **Two-point spring**: one fixed point, one hanging mass
//! 2. **Hanging cloth**: vertical sheet pinned along its top edge
//! 3. **Draped cloth**: horizontal sheet held at two corners, sagging onto
//!    the ground

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use tensio_solver::{Scene, SimulatorConfig, UpdateMode};
use tensio_types::TensioError;

/// Which benchmark scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    TwoPointSpring,
    HangingCloth,
    DrapedCloth,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::TwoPointSpring,
        ScenarioKind::HangingCloth,
        ScenarioKind::DrapedCloth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::TwoPointSpring => "two_point_spring",
            ScenarioKind::HangingCloth => "hanging_cloth",
            ScenarioKind::DrapedCloth => "draped_cloth",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = TensioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| TensioError::InvalidConfig(format!("unknown scenario '{s}'")))
    }
}

/// Plane a generated grid lies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPlane {
    /// Horizontal, at z = 0.
    Xy,
    /// Vertical, hanging from z = 0 downwards.
    Xz,
}

/// Builds a `cols × rows` grid of points spanning `width × height`, joined by
/// structural springs (along rows and columns) and both shear diagonals.
///
/// Point `(i, j)` has index `j * cols + i`; row `j = 0` lies at the origin
/// edge. Every point gets `mass`, nothing is fixed.
pub fn grid_scene(cols: usize, rows: usize, width: f64, height: f64, plane: GridPlane, mass: f64) -> Scene {
    let cols = cols.max(2);
    let rows = rows.max(2);
    let dx = width / (cols - 1) as f64;
    let dy = height / (rows - 1) as f64;

    let mut points = Vec::with_capacity(cols * rows);
    for j in 0..rows {
        for i in 0..cols {
            let (u, v) = (i as f64 * dx, j as f64 * dy);
            points.push(match plane {
                GridPlane::Xy => DVec3::new(u, v, 0.0),
                GridPlane::Xz => DVec3::new(u, 0.0, -v),
            });
        }
    }

    let index = |i: usize, j: usize| j * cols + i;
    let mut edges = Vec::new();
    for j in 0..rows {
        for i in 0..cols {
            if i + 1 < cols {
                edges.push([index(i, j), index(i + 1, j)]);
            }
            if j + 1 < rows {
                edges.push([index(i, j), index(i, j + 1)]);
            }
            if i + 1 < cols && j + 1 < rows {
                edges.push([index(i, j), index(i + 1, j + 1)]);
                edges.push([index(i + 1, j), index(i, j + 1)]);
            }
        }
    }

    Scene::from_points(&points, edges, mass)
}

/// A fully specified benchmark scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub scene: Scene,
    pub config: SimulatorConfig,
    /// Number of `simulate()` calls.
    pub steps: u32,
}

impl Scenario {
    /// A unit spring hanging from a fixed point, released horizontally.
    pub fn two_point_spring() -> Self {
        let scene = Scene::from_points(&[DVec3::ZERO, DVec3::X], vec![[0, 1]], 1.0)
            .with_fixed_predicate(|i, _| i == 0);
        Self {
            kind: ScenarioKind::TwoPointSpring,
            scene,
            config: SimulatorConfig {
                air_resistance: 0.05,
                ..SimulatorConfig::default()
            },
            steps: 300,
        }
    }

    /// A 1m × 1m sheet at 8×8 resolution pinned along its top edge.
    pub fn hanging_cloth() -> Self {
        let scene = grid_scene(8, 8, 1.0, 1.0, GridPlane::Xz, 0.05).with_fixed_predicate(|i, _| i < 8);
        Self {
            kind: ScenarioKind::HangingCloth,
            scene,
            config: SimulatorConfig {
                air_resistance: 0.02,
                ..SimulatorConfig::default()
            },
            steps: 120,
        }
    }

    /// A horizontal 1m × 1m sheet held at the two corners of one edge, with
    /// the ground 25cm below.
    pub fn draped_cloth() -> Self {
        let scene =
            grid_scene(8, 8, 1.0, 1.0, GridPlane::Xy, 0.05).with_fixed_predicate(|i, _| i == 0 || i == 7);
        Self {
            kind: ScenarioKind::DrapedCloth,
            scene,
            config: SimulatorConfig {
                air_resistance: 0.02,
                ground_height: -0.25,
                ..SimulatorConfig::default()
            },
            steps: 120,
        }
    }

    pub fn from_kind(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::TwoPointSpring => Self::two_point_spring(),
            ScenarioKind::HangingCloth => Self::hanging_cloth(),
            ScenarioKind::DrapedCloth => Self::draped_cloth(),
        }
    }

    pub fn with_mode(mut self, mode: UpdateMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }
}
