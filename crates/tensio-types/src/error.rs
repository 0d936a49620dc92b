//! Error types for the Tensio engine.
//!
//! All crates return `TensioResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for the Tensio engine.
#[derive(Debug, Error)]
pub enum TensioError {
    /// Operand shapes are incompatible (`height × width`).
    #[error("Shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A pivot vanished during elimination or inversion.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Cholesky found a non-positive diagonal residual.
    #[error("Matrix is not positive definite (failed at diagonal {index})")]
    NotPositiveDefinite { index: usize },

    /// Construction input is malformed or inconsistent.
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Iterative method hit its ceiling without converging.
    #[error("Solver did not converge after {iterations} iterations (residual: {residual:.2e})")]
    SolverDivergence {
        iterations: u32,
        residual: f64,
    },
}

impl TensioError {
    /// Shorthand for a [`TensioError::ShapeMismatch`].
    pub fn shape(operation: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            operation,
            left,
            right,
        }
    }

    /// True for numerical failures a caller may recover from by skipping
    /// the update (singular systems, indefinite Hessians, non-convergence).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix(_) | Self::NotPositiveDefinite { .. } | Self::SolverDivergence { .. }
        )
    }
}

/// Convenience alias for `Result<T, TensioError>`.
pub type TensioResult<T> = Result<T, TensioError>;
