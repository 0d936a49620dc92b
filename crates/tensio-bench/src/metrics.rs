//! Benchmark metrics: data collected during a benchmark run.

use serde::{Deserialize, Serialize};

/// Metrics collected from one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub scenario: String,
    /// Update mode name.
    pub mode: String,
    pub point_count: usize,
    pub spring_count: usize,
    /// Number of steps executed.
    pub steps: u32,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
    /// Average wall-clock time per step (seconds).
    pub avg_step_time: f64,
    pub min_step_time: f64,
    pub max_step_time: f64,
    /// Kinetic energy after the last step (approaches zero once settled).
    pub final_kinetic_energy: f64,
    /// Total energy after the last step.
    pub final_energy: f64,
    /// Largest distance of any point from its initial position.
    pub max_displacement: f64,
    /// Average Newton-type updates applied per step.
    pub avg_iterations: f64,
    /// Updates skipped over the whole run.
    pub skipped_updates: u32,
    /// Ground contacts resolved over the whole run.
    pub ground_contacts: u32,
}

impl BenchmarkMetrics {
    pub fn to_csv_header() -> String {
        "scenario,mode,point_count,spring_count,steps,total_wall_time_s,avg_step_ms,min_step_ms,max_step_ms,final_ke,final_energy,max_displacement,avg_iterations,skipped_updates,ground_contacts".to_string()
    }

    /// Format this metrics instance as a CSV data row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{:.6},{:.4},{:.4},{:.4},{:.6e},{:.6e},{:.6},{:.2},{},{}",
            self.scenario,
            self.mode,
            self.point_count,
            self.spring_count,
            self.steps,
            self.total_wall_time,
            self.avg_step_time * 1000.0,
            self.min_step_time * 1000.0,
            self.max_step_time * 1000.0,
            self.final_kinetic_energy,
            self.final_energy,
            self.max_displacement,
            self.avg_iterations,
            self.skipped_updates,
            self.ground_contacts,
        )
    }

    /// Header plus one row per run.
    pub fn to_csv(metrics: &[BenchmarkMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }
}
