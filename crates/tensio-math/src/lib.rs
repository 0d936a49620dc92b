//! # tensio-math
//!
//! Dense linear algebra for the Tensio simulator.
//!
//! Provides:
//! - [`Matrix`] (row-major) and [`Vector`] (with an explicit [`Orientation`])
//! - Decompositions: Cholesky, LU, QR, Hessenberg, Hessian modification
//! - Direct and iterative linear solves
//! - Eigenvalues by shifted QR and eigenvectors by inverse iteration
//! - Strong Wolfe line search

pub mod decomposition;
pub mod eigen;
pub mod line_search;
pub mod matrix;
pub mod solve;
pub mod vector;

pub use line_search::{find_stepsize_by_wolfe_conditions, WolfeParams};
pub use matrix::Matrix;
pub use solve::{IterationReport, Termination};
pub use vector::{Orientation, Vector};

// Per-point positions and spring blocks use glam's double precision types.
pub use glam::{DMat3, DVec3};
