//! Benchmark runner: steps a scenario and collects metrics.

use std::time::Instant;

use tensio_solver::{Simulator, UpdateMode};
use tensio_telemetry::{EventBus, EventKind};
use tensio_types::TensioResult;

use crate::metrics::BenchmarkMetrics;
use crate::scenarios::{Scenario, ScenarioKind};

/// Per-step displacement below which a step counts as settled.
pub const SETTLED_DISPLACEMENT: f64 = 1.0e-6;

/// Runs benchmark scenarios and collects metrics.
pub struct BenchmarkRunner;

impl BenchmarkRunner {
    /// Run a single scenario without telemetry.
    pub fn run(scenario: &Scenario) -> TensioResult<BenchmarkMetrics> {
        let mut bus = EventBus::new();
        bus.set_enabled(false);
        Self::run_with_bus(scenario, &mut bus)
    }

    /// Run a single scenario, emitting per-step events on `bus`.
    ///
    /// The bus is flushed after every step and finalized at the end.
    pub fn run_with_bus(scenario: &Scenario, bus: &mut EventBus) -> TensioResult<BenchmarkMetrics> {
        let mut simulator = Simulator::new(&scenario.scene, scenario.config.clone())?;
        let initial = simulator.points();
        let timestep = scenario.config.timestep;
        let mode = scenario.config.mode;

        let mut step_times = Vec::with_capacity(scenario.steps as usize);
        let mut total_iterations: u64 = 0;
        let mut skipped_updates = 0;
        let mut ground_contacts = 0;

        tracing::debug!(scenario = %scenario.kind, mode = %mode, steps = scenario.steps, "benchmark started");
        let total_start = Instant::now();

        for step in 0..u64::from(scenario.steps) {
            bus.emit_kind(
                step,
                EventKind::StepBegin {
                    sim_time: step as f64 * timestep,
                    mode: mode.name().to_string(),
                },
            );

            let result = simulator.simulate()?;
            step_times.push(result.wall_time);
            total_iterations += u64::from(result.iterations);
            skipped_updates += result.skipped;
            ground_contacts += result.collisions;

            bus.emit_kind(
                step,
                EventKind::Update {
                    iterations: result.iterations,
                    skipped: result.skipped,
                },
            );
            if result.collisions > 0 {
                bus.emit_kind(
                    step,
                    EventKind::GroundContact {
                        resolved: result.collisions,
                    },
                );
            }
            if bus.is_enabled() {
                let energy = simulator.energy_breakdown();
                bus.emit_kind(
                    step,
                    EventKind::Energy {
                        kinetic: energy.kinetic,
                        gravity: energy.gravity,
                        elastic: energy.elastic,
                        penalty: energy.penalty,
                    },
                );
                let max_displacement = simulator.state().max_displacement();
                bus.emit_kind(
                    step,
                    EventKind::Convergence {
                        max_displacement,
                        settled: max_displacement < SETTLED_DISPLACEMENT,
                    },
                );
            }
            bus.emit_kind(
                step,
                EventKind::StepEnd {
                    wall_time: result.wall_time,
                },
            );
            bus.flush();
        }

        let total_wall_time = total_start.elapsed().as_secs_f64();
        bus.finalize();

        let max_displacement = simulator
            .points()
            .iter()
            .zip(&initial)
            .map(|(p, q)| p.distance(*q))
            .fold(0.0, f64::max);

        let avg_step_time = if step_times.is_empty() {
            0.0
        } else {
            step_times.iter().sum::<f64>() / step_times.len() as f64
        };
        let min_step_time = step_times.iter().copied().fold(f64::INFINITY, f64::min);
        let max_step_time = step_times.iter().copied().fold(0.0, f64::max);
        let avg_iterations = if scenario.steps > 0 {
            total_iterations as f64 / f64::from(scenario.steps)
        } else {
            0.0
        };

        let metrics = BenchmarkMetrics {
            scenario: scenario.kind.name().to_string(),
            mode: mode.name().to_string(),
            point_count: simulator.point_count(),
            spring_count: simulator.springs().len(),
            steps: scenario.steps,
            total_wall_time,
            avg_step_time,
            min_step_time: if min_step_time.is_finite() { min_step_time } else { 0.0 },
            max_step_time,
            final_kinetic_energy: simulator.kinetic_energy(),
            final_energy: simulator.total_energy(),
            max_displacement,
            avg_iterations,
            skipped_updates,
            ground_contacts,
        };
        tracing::debug!(
            scenario = %scenario.kind,
            wall_time = metrics.total_wall_time,
            final_ke = metrics.final_kinetic_energy,
            "benchmark finished"
        );
        Ok(metrics)
    }

    /// Run every scenario in `mode`.
    pub fn run_all(mode: UpdateMode) -> TensioResult<Vec<BenchmarkMetrics>> {
        ScenarioKind::ALL
            .into_iter()
            .map(|kind| Self::run(&Scenario::from_kind(kind).with_mode(mode)))
            .collect()
    }
}
