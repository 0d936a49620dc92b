//! Elementwise compute backends.
//!
//! The [`ElementwiseBackend`] trait defines the handful of dense
//! elementwise kernels the solvers use for position and velocity updates.
//! [`SerialBackend`] executes plain loops and serves as the reference for
//! correctness. [`ParallelBackend`] splits the operands into chunks and runs
//! them on the rayon thread pool.

use rayon::prelude::*;
use tensio_types::{TensioError, TensioResult};

/// Trait for elementwise compute backends.
///
/// All methods take flat `f64` slices. Every implementation must produce
/// the same values as [`SerialBackend`] for the same inputs.
pub trait ElementwiseBackend: Send + Sync {
    /// Returns the backend name (e.g., "serial", "parallel").
    fn name(&self) -> &str;

    /// `out[i] = a[i] + scale * b[i]`.
    fn axpy(&self, a: &[f64], b: &[f64], scale: f64, out: &mut [f64]) -> TensioResult<()>;

    /// `target[i] += scale * b[i]`.
    fn axpy_in_place(&self, target: &mut [f64], b: &[f64], scale: f64) -> TensioResult<()>;

    /// `target[i] *= scale`.
    fn scale(&self, target: &mut [f64], scale: f64);

    /// Dot product of two buffers.
    fn dot(&self, a: &[f64], b: &[f64]) -> TensioResult<f64>;

    /// Fill a buffer with a constant value.
    fn fill(&self, buffer: &mut [f64], value: f64) {
        for x in buffer.iter_mut() {
            *x = value;
        }
    }
}

fn check_len(op: &'static str, a: usize, b: usize) -> TensioResult<()> {
    if a != b {
        return Err(TensioError::shape(op, (a, 1), (b, 1)));
    }
    Ok(())
}

/// Serial backend: scalar reference implementation.
///
/// Always available, used for:
/// - Small operands where thread dispatch isn't worthwhile
/// - Correctness validation (parallel results must match)
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl SerialBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ElementwiseBackend for SerialBackend {
    fn name(&self) -> &str {
        "serial"
    }

    fn axpy(&self, a: &[f64], b: &[f64], scale: f64, out: &mut [f64]) -> TensioResult<()> {
        check_len("axpy", a.len(), b.len())?;
        check_len("axpy", a.len(), out.len())?;
        for i in 0..a.len() {
            out[i] = a[i] + scale * b[i];
        }
        Ok(())
    }

    fn axpy_in_place(&self, target: &mut [f64], b: &[f64], scale: f64) -> TensioResult<()> {
        check_len("axpy_in_place", target.len(), b.len())?;
        for i in 0..target.len() {
            target[i] += scale * b[i];
        }
        Ok(())
    }

    fn scale(&self, target: &mut [f64], scale: f64) {
        for x in target.iter_mut() {
            *x *= scale;
        }
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> TensioResult<f64> {
        check_len("dot", a.len(), b.len())?;
        let mut sum = 0.0;
        for i in 0..a.len() {
            sum += a[i] * b[i];
        }
        Ok(sum)
    }
}

/// Elements handed to one rayon task.
pub const MIN_ITEMS_PER_TASK: usize = 256;

/// Rayon backend: splits operands into [`MIN_ITEMS_PER_TASK`] chunks.
///
/// `axpy`, `scale` and `fill` compute each element exactly as the serial
/// path does. `dot` sums each chunk, then adds the partial sums in chunk
/// order, so its result is independent of scheduling but may differ from
/// the serial sum in the last bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBackend;

impl ParallelBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ElementwiseBackend for ParallelBackend {
    fn name(&self) -> &str {
        "parallel"
    }

    fn axpy(&self, a: &[f64], b: &[f64], scale: f64, out: &mut [f64]) -> TensioResult<()> {
        check_len("axpy", a.len(), b.len())?;
        check_len("axpy", a.len(), out.len())?;
        out.par_chunks_mut(MIN_ITEMS_PER_TASK)
            .zip(a.par_chunks(MIN_ITEMS_PER_TASK))
            .zip(b.par_chunks(MIN_ITEMS_PER_TASK))
            .for_each(|((o, a), b)| {
                for ((o, a), b) in o.iter_mut().zip(a).zip(b) {
                    *o = a + scale * b;
                }
            });
        Ok(())
    }

    fn axpy_in_place(&self, target: &mut [f64], b: &[f64], scale: f64) -> TensioResult<()> {
        check_len("axpy_in_place", target.len(), b.len())?;
        target
            .par_chunks_mut(MIN_ITEMS_PER_TASK)
            .zip(b.par_chunks(MIN_ITEMS_PER_TASK))
            .for_each(|(t, b)| {
                for (t, b) in t.iter_mut().zip(b) {
                    *t += scale * b;
                }
            });
        Ok(())
    }

    fn scale(&self, target: &mut [f64], scale: f64) {
        target
            .par_chunks_mut(MIN_ITEMS_PER_TASK)
            .for_each(|chunk| chunk.iter_mut().for_each(|x| *x *= scale));
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> TensioResult<f64> {
        check_len("dot", a.len(), b.len())?;
        let partials: Vec<f64> = a
            .par_chunks(MIN_ITEMS_PER_TASK)
            .zip(b.par_chunks(MIN_ITEMS_PER_TASK))
            .map(|(a, b)| a.iter().zip(b).map(|(a, b)| a * b).sum::<f64>())
            .collect();
        Ok(partials.iter().sum())
    }

    fn fill(&self, buffer: &mut [f64], value: f64) {
        buffer
            .par_chunks_mut(MIN_ITEMS_PER_TASK)
            .for_each(|chunk| chunk.fill(value));
    }
}
