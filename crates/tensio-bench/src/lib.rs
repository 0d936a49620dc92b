//! # tensio-bench
//!
//! Benchmark suite for the Tensio spring simulator.
//!
//! Provides procedural scenarios built on a cloth grid generator, a runner
//! that streams telemetry while it steps, and CSV export of the collected
//! metrics.

pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use metrics::BenchmarkMetrics;
pub use runner::BenchmarkRunner;
pub use scenarios::{grid_scene, GridPlane, Scenario, ScenarioKind};
