//! # tensio-types
//!
//! Shared types, identifiers, error types, and physical constants
//! for the Tensio mass-spring simulator.
//!
//! This crate has zero domain logic: it defines the vocabulary
//! that all other Tensio crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{TensioError, TensioResult};
pub use ids::{PointId, SpringId};
