//! Event sinks: where the engine's progress events go.

use oats_domain::event::Event;

/// Receives every event the engine emits, in order.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// The worker protocol sink: one JSON event per stdout line.
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &Event) {
        println!("{}", event.to_line());
    }
}

/// Collects events in memory. Used by tests and by embedders that want
/// to inspect the stream after the run.
#[derive(Default)]
pub struct CollectSink {
    events: parking_lot::Mutex<Vec<Event>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_type()).collect()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}
