//! # tensio-accel
//!
//! Elementwise acceleration hook for the Tensio dense math layer.
//!
//! Provides an [`ElementwiseBackend`] trait with two implementations:
//! - [`SerialBackend`]: straight scalar loops (reference path)
//! - [`ParallelBackend`]: chunked loops on the rayon thread pool
//!
//! An [`AccelContext`] owns both and picks one per operand length through the
//! pure [`select_strategy`] function. The context is constructed once and
//! injected; there is no process-wide state.

pub mod backend;
pub mod context;

pub use backend::{ElementwiseBackend, ParallelBackend, SerialBackend};
pub use context::{select_strategy, AccelContext, ElementwiseStrategy};
