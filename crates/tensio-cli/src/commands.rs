//! CLI command implementations.

use std::error::Error;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tensio_bench::metrics::BenchmarkMetrics;
use tensio_bench::runner::BenchmarkRunner;
use tensio_bench::scenarios::{Scenario, ScenarioKind};
use tensio_solver::{EnergyBreakdown, Scene, Simulator, SimulatorConfig, UpdateMode};
use tensio_telemetry::{EventBus, EventKind, TracingSink};
use tensio_types::TensioError;

type CommandResult = Result<(), Box<dyn Error>>;

/// Arguments of `tensio simulate`.
pub struct SimulateArgs {
    pub scene: PathBuf,
    pub config: Option<PathBuf>,
    pub mode: Option<String>,
    pub steps: u32,
    pub every: Option<u32>,
    pub output: Option<PathBuf>,
    pub telemetry: bool,
}

/// Positions recorded after a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub step: u64,
    pub sim_time: f64,
    /// Flat `[x0, y0, z0, x1, …]`.
    pub positions: Vec<f64>,
    pub energy: EnergyBreakdown,
}

/// File written by `simulate` and read by `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationDump {
    pub mode: UpdateMode,
    pub timestep: f64,
    pub point_count: usize,
    pub fixed: Vec<bool>,
    /// Initial positions.
    pub initial: Vec<f64>,
    pub frames: Vec<Frame>,
}

fn load_scene(path: &Path) -> Result<Scene, TensioError> {
    let text = std::fs::read_to_string(path)?;
    let scene: Scene =
        serde_json::from_str(&text).map_err(|e| TensioError::Serialization(format!("{}: {e}", path.display())))?;
    scene.validate()?;
    Ok(scene)
}

fn load_config(path: &Path) -> Result<SimulatorConfig, TensioError> {
    let text = std::fs::read_to_string(path)?;
    let config: SimulatorConfig =
        toml::from_str(&text).map_err(|e| TensioError::Serialization(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

fn frame(simulator: &Simulator) -> Frame {
    Frame {
        step: simulator.step_count(),
        sim_time: simulator.step_count() as f64 * simulator.config().timestep,
        positions: simulator.positions().as_slice().to_vec(),
        energy: simulator.energy_breakdown(),
    }
}

/// Run a simulation from a scene file.
pub fn simulate(args: &SimulateArgs) -> CommandResult {
    let scene = load_scene(&args.scene)?;
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulatorConfig::default(),
    };
    if let Some(mode) = &args.mode {
        config.mode = mode.parse()?;
    }

    let mut simulator = Simulator::new(&scene, config)?;
    let mut bus = EventBus::new();
    if args.telemetry {
        bus.add_sink(Box::new(TracingSink::new(tracing::Level::INFO)));
    } else {
        bus.set_enabled(false);
    }

    let mut dump = SimulationDump {
        mode: simulator.config().mode,
        timestep: simulator.config().timestep,
        point_count: simulator.point_count(),
        fixed: simulator.state().is_fixed.clone(),
        initial: scene.positions.clone(),
        frames: Vec::new(),
    };
    let every = args.every.filter(|&n| n > 0);

    for step in 0..u64::from(args.steps) {
        let result = simulator.simulate()?;
        bus.emit_kind(
            step,
            EventKind::Update {
                iterations: result.iterations,
                skipped: result.skipped,
            },
        );
        bus.emit_kind(
            step,
            EventKind::StepEnd {
                wall_time: result.wall_time,
            },
        );
        bus.flush();

        if every.is_some_and(|n| (step + 1) % u64::from(n) == 0) {
            dump.frames.push(frame(&simulator));
        }
    }
    bus.finalize();

    if dump.frames.last().map(|f| f.step) != Some(simulator.step_count()) {
        dump.frames.push(frame(&simulator));
    }

    let json = serde_json::to_string_pretty(&dump)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!(
                "Simulated {} steps of {} points ({}); {} frame(s) written to {}",
                args.steps,
                dump.point_count,
                dump.mode,
                dump.frames.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Run the benchmark suite.
pub fn benchmark(scenario_name: &str, mode: &str, steps: Option<u32>, output_path: Option<&Path>) -> CommandResult {
    println!("Tensio Benchmark Suite");
    println!("══════════════════════");
    println!();

    let mode: UpdateMode = mode.parse()?;
    let kinds: Vec<ScenarioKind> = if scenario_name == "all" {
        ScenarioKind::ALL.to_vec()
    } else {
        vec![scenario_name.parse()?]
    };

    let mut all_metrics = Vec::new();
    for kind in kinds {
        let mut scenario = Scenario::from_kind(kind).with_mode(mode);
        if let Some(steps) = steps {
            scenario = scenario.with_steps(steps);
        }

        println!(
            "Running: {} ({} points, {} springs, {} steps, {})",
            kind,
            scenario.scene.point_count(),
            scenario.scene.edges.len(),
            scenario.steps,
            mode,
        );

        let metrics = BenchmarkRunner::run(&scenario).map_err(|e| format!("Benchmark failed: {e}"))?;

        println!("  Wall time:     {:.3}s", metrics.total_wall_time);
        println!("  Avg step:      {:.3}ms", metrics.avg_step_time * 1000.0);
        println!("  Final KE:      {:.6e}", metrics.final_kinetic_energy);
        println!("  Max displace:  {:.4}m", metrics.max_displacement);
        if metrics.skipped_updates > 0 {
            println!("  Skipped:       {}", metrics.skipped_updates);
        }
        println!();

        all_metrics.push(metrics);
    }

    let csv = BenchmarkMetrics::to_csv(&all_metrics);
    if let Some(path) = output_path {
        std::fs::write(path, &csv)?;
        println!("Results written to: {}", path.display());
    } else {
        println!("CSV Output:");
        println!("{csv}");
    }
    Ok(())
}

/// Validate a configuration or scene file.
pub fn validate(path: &Path) -> CommandResult {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            let config = load_config(path)?;
            println!("Configuration OK: {}", path.display());
            println!("  Mode:          {}", config.mode);
            println!("  Timestep:      {:.6}s", config.timestep);
            println!("  Gravity:       {}", config.gravity);
            println!("  Ground height: {}", config.ground_height);
        }
        Some("json") => {
            let scene = load_scene(path)?;
            println!("Scene OK: {}", path.display());
            println!("  Points:        {}", scene.point_count());
            println!("  Fixed:         {}", scene.fixed_count());
            println!("  Springs:       {}", scene.edges.len());
        }
        _ => {
            return Err(format!(
                "cannot validate '{}': expected a .toml configuration or a .json scene",
                path.display()
            )
            .into())
        }
    }
    Ok(())
}

/// Summarize a simulation dump.
pub fn inspect(path: &Path) -> CommandResult {
    println!("Tensio Dump Inspector");
    println!("─────────────────────");
    println!();

    let text = std::fs::read_to_string(path)?;
    let dump: SimulationDump = serde_json::from_str(&text).map_err(|e| format!("Failed to read dump: {e}"))?;

    println!("Mode:         {}", dump.mode);
    println!("Points:       {}", dump.point_count);
    println!("Fixed:        {}", dump.fixed.iter().filter(|&&f| f).count());
    println!("Frames:       {}", dump.frames.len());

    let Some(last) = dump.frames.last() else {
        return Ok(());
    };
    println!("Last step:    {} (t = {:.4}s)", last.step, last.sim_time);

    let axis_range = |axis: usize| {
        last.positions
            .iter()
            .skip(axis)
            .step_by(3)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    };
    for (axis, name) in ["X", "Y", "Z"].iter().enumerate() {
        let (lo, hi) = axis_range(axis);
        println!("{name} range:      [{lo:.4}, {hi:.4}]");
    }

    let max_displacement = last
        .positions
        .chunks_exact(3)
        .zip(dump.initial.chunks_exact(3))
        .map(|(p, q)| p.iter().zip(q).map(|(a, b)| (a - b) * (a - b)).sum::<f64>().sqrt())
        .fold(0.0, f64::max);
    println!("Max displace: {max_displacement:.4}");
    println!(
        "Energy:       {:.6e} (kinetic {:.3e}, gravity {:.3e}, elastic {:.3e}, penalty {:.3e})",
        last.energy.total(),
        last.energy.kinetic,
        last.energy.gravity,
        last.energy.elastic,
        last.energy.penalty
    );
    Ok(())
}
