//! Pluggable event sinks.

use std::sync::{Arc, Mutex};

use crate::events::SimulationEvent;

/// Consumer of simulation events.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called once when the run ends.
    fn finalize(&mut self) {}

    fn name(&self) -> &str;
}

/// Collects events into a shared `Vec`.
///
/// The bus owns its sinks, so the collected events are read through the
/// handle returned by [`VecSink::events`].
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events.
    pub fn events(&self) -> Arc<Mutex<Vec<SimulationEvent>>> {
        Arc::clone(&self.events)
    }

    /// Copy of the events collected so far.
    pub fn snapshot(&self) -> Vec<SimulationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Forwards events to `tracing` at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    pub fn new(level: tracing::Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> tracing::Level {
        self.level
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(tracing::Level::INFO)
    }
}

macro_rules! forward {
    ($level:expr, $event:expr) => {
        tracing::event!(
            $level,
            step = $event.step,
            event = $event.name(),
            payload = ?$event.kind,
            "simulation_event"
        )
    };
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        // `event!` needs a constant level.
        let level = self.level;
        if level == tracing::Level::ERROR {
            forward!(tracing::Level::ERROR, event);
        } else if level == tracing::Level::WARN {
            forward!(tracing::Level::WARN, event);
        } else if level == tracing::Level::INFO {
            forward!(tracing::Level::INFO, event);
        } else if level == tracing::Level::DEBUG {
            forward!(tracing::Level::DEBUG, event);
        } else {
            forward!(tracing::Level::TRACE, event);
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
