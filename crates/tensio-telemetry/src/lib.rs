//! # tensio-telemetry
//!
//! Event bus for simulation telemetry. The benchmark runner and the CLI emit
//! structured per-step events (timing, energy, ground contacts, Newton
//! bookkeeping) that pluggable sinks consume.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, TracingSink, VecSink};
