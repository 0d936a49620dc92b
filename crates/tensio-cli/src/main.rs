//! Tensio CLI: simulation, benchmarking and input validation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tensio")]
#[command(version, about = "Tensio: implicit mass-spring cloth simulator")]
struct Cli {
    /// Log filter (trace, debug, info, warn, error or a full directive).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a scene and dump the resulting positions.
    Simulate {
        /// Scene file (JSON).
        #[arg(short, long)]
        scene: PathBuf,

        /// Simulator configuration (TOML). Defaults when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured update mode (newton, pd, multigrid).
        #[arg(short, long)]
        mode: Option<String>,

        /// Number of steps.
        #[arg(long, default_value_t = 300)]
        steps: u32,

        /// Record a frame every N steps in addition to the final one.
        #[arg(long)]
        every: Option<u32>,

        /// Output dump (JSON). Printed to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Forward per-step telemetry events to the log.
        #[arg(long)]
        telemetry: bool,
    },

    /// Run the benchmark scenarios.
    Benchmark {
        /// Scenario to run (two_point_spring, hanging_cloth, draped_cloth, all).
        #[arg(short, long, default_value = "all")]
        scenario: String,

        /// Update mode (newton, pd, multigrid).
        #[arg(short, long, default_value = "newton")]
        mode: String,

        /// Override each scenario's step count.
        #[arg(long)]
        steps: Option<u32>,

        /// Output CSV file path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration (.toml) or scene (.json).
    Validate {
        path: PathBuf,
    },

    /// Summarize a dump written by `simulate`.
    Inspect {
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Simulate {
            scene,
            config,
            mode,
            steps,
            every,
            output,
            telemetry,
        } => commands::simulate(&commands::SimulateArgs {
            scene,
            config,
            mode,
            steps,
            every,
            output,
            telemetry,
        }),
        Commands::Benchmark {
            scenario,
            mode,
            steps,
            output,
        } => commands::benchmark(&scenario, &mode, steps, output.as_deref()),
        Commands::Validate { path } => commands::validate(&path),
        Commands::Inspect { path } => commands::inspect(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
