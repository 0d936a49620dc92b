//! The mass-spring simulator.
//!
//! A [`Simulator`] is built once per scene and advanced with
//! [`Simulator::simulate`], one call per frame. Each call:
//!
//! 1. snapshots the current positions;
//! 2. runs the configured [`UpdateMode`];
//! 3. re-pins fixed points when the mode does not penalize them;
//! 4. recomputes velocities as `Δx/dt · (1 − air_resistance)`;
//! 5. resolves ground contacts.

use std::time::Instant;

use glam::DVec3;
use tensio_accel::AccelContext;
use tensio_math::Vector;
use tensio_types::{PointId, SpringId, TensioError, TensioResult};

use crate::assembly::{self, elastic_energy, EnergyBreakdown, Inertia, SystemObjective};
use crate::config::SimulatorConfig;
use crate::descent::{update_by_newton_multigrid, update_by_newton_raphson, NewtonOptions, NewtonStep, SkipReason};
use crate::gravity;
use crate::ground::GroundPlane;
use crate::multigrid::Multigrid;
use crate::penalty::FixedPointPenalty;
use crate::projective::ProjectiveDynamics;
use crate::scene::Scene;
use crate::spring::SpringData;
use crate::state::SimulationState;
use crate::strategy::{StepResult, UpdateMode};

/// Iterations performed and updates skipped by one dispatch.
struct UpdateCounts {
    iterations: u32,
    skipped: u32,
}

/// Cloth/spring simulator advancing a mass-point network each frame.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulatorConfig,
    state: SimulationState,
    springs: Vec<SpringData>,
    springs_connected_to: Vec<Vec<usize>>,
    multigrid: Option<Multigrid>,
    projective: Option<ProjectiveDynamics>,
    ground: GroundPlane,
    accel: AccelContext,
    step_count: u64,
}

impl Simulator {
    /// Validates `scene` and `config` and precomputes what the mode needs
    /// (the multigrid hierarchy or the Projective Dynamics factorization).
    pub fn new(scene: &Scene, config: SimulatorConfig) -> TensioResult<Self> {
        config.validate()?;
        let springs = scene.springs(config.default_spring_constant)?;
        let state = SimulationState::from_scene(scene)?;
        let springs_connected_to = assembly::springs_connected_to(state.point_count(), &springs);

        let multigrid = match config.mode {
            UpdateMode::Multigrid => Some(Multigrid::build(&scene.points(), config.multigrid)?),
            _ => None,
        };
        let projective = match config.mode {
            UpdateMode::ProjectiveDynamics => {
                Some(ProjectiveDynamics::new(&state.mass3, &springs, config.timestep)?)
            }
            _ => None,
        };

        tracing::debug!(
            points = state.point_count(),
            springs = springs.len(),
            mode = %config.mode,
            "simulator created"
        );

        Ok(Self {
            ground: GroundPlane::new(config.ground_height, config.constant_of_restitution),
            accel: AccelContext::new(config.accel_threshold),
            config,
            state,
            springs,
            springs_connected_to,
            multigrid,
            projective,
            step_count: 0,
        })
    }

    /// Advances the simulation by one timestep.
    pub fn simulate(&mut self) -> TensioResult<StepResult> {
        let start = Instant::now();
        let mode = self.config.mode;

        self.state.save_previous();

        let counts = match mode {
            UpdateMode::Newton => self.newton_update()?,
            UpdateMode::ProjectiveDynamics => self.projective_update()?,
            UpdateMode::Multigrid => self.multigrid_update()?,
        };

        if !mode.uses_fixed_penalty() {
            self.state.unmove_fixed_points();
        }
        self.state
            .update_velocities(self.config.timestep, self.config.air_resistance);
        let contact = self.ground.resolve(&mut self.state);

        self.step_count += 1;
        let energy = self.total_energy();
        let wall_time = start.elapsed().as_secs_f64();

        tracing::debug!(
            step = self.step_count,
            mode = %mode,
            energy,
            wall_time,
            collisions = contact.resolved_count,
            "simulation step"
        );

        Ok(StepResult {
            mode,
            iterations: counts.iterations,
            skipped: counts.skipped,
            energy,
            collisions: contact.resolved_count,
            wall_time,
        })
    }

    fn newton_update(&mut self) -> TensioResult<UpdateCounts> {
        let config = &self.config;
        let state = &mut self.state;
        let options = NewtonOptions {
            simulates_inertia: config.simulates_inertia,
            tries_orthogonal_directions: config.tries_orthogonal_directions,
        };
        let mut counts = UpdateCounts {
            iterations: 0,
            skipped: 0,
        };

        for _ in 0..config.newton_iterations {
            let objective = SystemObjective {
                springs: &self.springs,
                springs_connected_to: &self.springs_connected_to,
                mass3: &state.mass3,
                timestep: config.timestep,
                gravity: config.gravity,
                inertia: config.simulates_inertia.then_some(Inertia {
                    previous: &state.previous_positions,
                    velocities: &state.velocities,
                }),
                penalty: Some(FixedPointPenalty {
                    stiffness: config.fixed_point_stiffness,
                    rest: &state.original_positions,
                    is_fixed: &state.is_fixed,
                }),
            };

            match update_by_newton_raphson(&mut state.positions, &objective, options, &self.accel)? {
                NewtonStep::Applied { .. } => counts.iterations += 1,
                NewtonStep::Skipped(reason) => {
                    log_skip(self.step_count, "newton", reason);
                    counts.skipped += 1;
                    break;
                }
            }
        }

        Ok(counts)
    }

    fn projective_update(&mut self) -> TensioResult<UpdateCounts> {
        let projective = self.projective.as_ref().ok_or_else(|| {
            TensioError::InvalidConfig("projective dynamics was not prefactored".into())
        })?;
        let report = projective.step(
            &mut self.state,
            &self.springs,
            self.config.gravity,
            self.config.pd_iterations,
            &self.accel,
        )?;
        Ok(UpdateCounts {
            iterations: report.iterations,
            skipped: 0,
        })
    }

    fn multigrid_update(&mut self) -> TensioResult<UpdateCounts> {
        let multigrid = self
            .multigrid
            .as_mut()
            .ok_or_else(|| TensioError::InvalidConfig("multigrid hierarchy was not built".into()))?;
        let state = &mut self.state;
        let objective = SystemObjective {
            springs: &self.springs,
            springs_connected_to: &self.springs_connected_to,
            mass3: &state.mass3,
            timestep: self.config.timestep,
            gravity: self.config.gravity,
            inertia: Some(Inertia {
                previous: &state.previous_positions,
                velocities: &state.velocities,
            }),
            penalty: None,
        };

        let step = update_by_newton_multigrid(
            multigrid,
            &mut state.positions,
            &objective,
            &state.velocities,
            self.config.timestep,
            &self.accel,
        )?;
        Ok(match step {
            NewtonStep::Applied { .. } => UpdateCounts {
                iterations: 1,
                skipped: 0,
            },
            NewtonStep::Skipped(reason) => {
                log_skip(self.step_count, "multigrid", reason);
                UpdateCounts {
                    iterations: 0,
                    skipped: 1,
                }
            }
        })
    }

    /// Position of one point.
    ///
    /// # Panics
    /// If `id` is not a point of this simulator.
    pub fn position(&self, id: PointId) -> DVec3 {
        self.state.position(id.index())
    }

    /// All positions as points.
    pub fn points(&self) -> Vec<DVec3> {
        (0..self.state.point_count()).map(|i| self.state.position(i)).collect()
    }

    pub fn positions(&self) -> &Vector {
        &self.state.positions
    }

    pub fn velocities(&self) -> &Vector {
        &self.state.velocities
    }

    pub fn springs(&self) -> &[SpringData] {
        &self.springs
    }

    pub fn spring(&self, id: SpringId) -> Option<&SpringData> {
        self.springs.get(id.index())
    }

    /// Indices of every spring touching `id`.
    pub fn springs_connected_to(&self, id: PointId) -> &[usize] {
        self.springs_connected_to
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn multigrid(&self) -> Option<&Multigrid> {
        self.multigrid.as_ref()
    }

    pub fn accel(&self) -> &AccelContext {
        &self.accel
    }

    pub fn point_count(&self) -> usize {
        self.state.point_count()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.state.kinetic_energy()
    }

    /// Energy split into kinetic, gravity, elastic and penalty parts.
    ///
    /// The penalty part is only non-zero in Newton mode.
    pub fn energy_breakdown(&self) -> EnergyBreakdown {
        let x = &self.state.positions;
        let penalty = if self.config.mode.uses_fixed_penalty() {
            FixedPointPenalty {
                stiffness: self.config.fixed_point_stiffness,
                rest: &self.state.original_positions,
                is_fixed: &self.state.is_fixed,
            }
            .energy(x)
        } else {
            0.0
        };
        EnergyBreakdown {
            kinetic: self.state.kinetic_energy(),
            gravity: gravity::energy(x, &self.state.mass3, self.config.gravity),
            elastic: elastic_energy(&self.springs, x),
            penalty,
        }
    }

    pub fn total_energy(&self) -> f64 {
        self.energy_breakdown().total()
    }
}

fn log_skip(step: u64, update: &str, reason: SkipReason) {
    if reason.is_at_rest() {
        tracing::debug!(step, update, reason = reason.as_str(), "update skipped at rest");
    } else {
        tracing::warn!(step, update, reason = reason.as_str(), "update skipped");
    }
}
