//! Acceleration context and strategy selection.

use serde::{Deserialize, Serialize};
use tensio_types::constants::DEFAULT_ACCEL_THRESHOLD;

use crate::backend::{ElementwiseBackend, ParallelBackend, SerialBackend};

/// Which elementwise path an operation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementwiseStrategy {
    /// Plain scalar loops.
    Scalar,
    /// Chunks dispatched to the rayon pool.
    Parallel,
}

/// Pick the strategy for an operand of `len` elements.
///
/// Operands strictly longer than `threshold` take the parallel path.
#[inline]
pub fn select_strategy(len: usize, threshold: usize) -> ElementwiseStrategy {
    if len > threshold {
        ElementwiseStrategy::Parallel
    } else {
        ElementwiseStrategy::Scalar
    }
}

/// Owns both backends and dispatches by operand length.
///
/// Constructed once per simulator and passed by reference into the
/// descent methods; it carries no mutable state.
#[derive(Debug, Clone)]
pub struct AccelContext {
    threshold: usize,
    serial: SerialBackend,
    parallel: ParallelBackend,
}

impl AccelContext {
    /// Creates a context that parallelizes operands longer than `threshold`.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            serial: SerialBackend::new(),
            parallel: ParallelBackend::new(),
        }
    }

    /// A context that always runs serially.
    pub fn serial_only() -> Self {
        Self::new(usize::MAX)
    }

    /// Returns the configured size threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the backend for an operand of `len` elements.
    pub fn backend_for(&self, len: usize) -> &dyn ElementwiseBackend {
        match select_strategy(len, self.threshold) {
            ElementwiseStrategy::Scalar => &self.serial,
            ElementwiseStrategy::Parallel => &self.parallel,
        }
    }
}

impl Default for AccelContext {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEL_THRESHOLD)
    }
}
