//! # tensio-solver
//!
//! Mass-spring cloth simulation: energy terms, descent methods, the
//! multigrid hierarchy, Projective Dynamics and the simulator that drives
//! them.
//!
//! ## Key Types
//!
//! - [`Simulator`]: owns the state and advances it with [`Simulator::simulate`]
//! - [`Scene`]: construction input (positions, springs, masses, fixed flags)
//! - [`SimulatorConfig`]: update mode, physical parameters, solver effort
//! - [`SimulationState`]: point-major 3n buffers
//! - [`Objective`]: the energy seam between the optimizers and the simulator
//! - [`Multigrid`]: furthest-point hierarchy with Galerkin coarse systems

pub mod assembly;
pub mod config;
pub mod descent;
pub mod gravity;
pub mod ground;
pub mod kinetic;
pub mod multigrid;
pub mod penalty;
pub mod projective;
pub mod scene;
pub mod simulator;
pub mod spring;
pub mod state;
pub mod strategy;

pub use assembly::{EnergyBreakdown, SystemObjective};
pub use config::{MultigridConfig, SimulatorConfig};
pub use descent::{NewtonOptions, NewtonStep, Objective, SkipReason};
pub use ground::{ContactResult, GroundPlane};
pub use multigrid::Multigrid;
pub use projective::ProjectiveDynamics;
pub use scene::Scene;
pub use simulator::Simulator;
pub use spring::SpringData;
pub use state::SimulationState;
pub use strategy::{StepResult, UpdateMode};
