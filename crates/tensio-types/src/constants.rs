//! Physical constants and simulation defaults.

/// Gravitational acceleration (m/s²). Acts along −z.
pub const GRAVITY: f64 = 9.81;

/// Default simulation timestep (seconds). 1/60th of a second.
pub const DEFAULT_TIMESTEP: f64 = 1.0 / 60.0;

/// Default stiffness for springs without an explicit constant.
pub const DEFAULT_SPRING_CONSTANT: f64 = 100.0;

/// Stiffness of the quadratic penalty holding fixed points at rest (Newton mode).
pub const DEFAULT_FIXED_POINT_STIFFNESS: f64 = 1.0e6;

/// Default ground plane height (z coordinate).
pub const DEFAULT_GROUND_HEIGHT: f64 = -10.0;

/// Default number of Projective Dynamics local/global iterations per step.
pub const DEFAULT_PD_ITERATIONS: u32 = 10;

/// Operand length above which elementwise ops take the parallel path.
pub const DEFAULT_ACCEL_THRESHOLD: usize = 100;

/// Epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1.0e-12;

/// Gradient norm below which a Newton step treats the point as critical.
pub const DEGENERATE_GRADIENT: f64 = 1.0e-9;
