//! Event sinks.

use fanout_core::ObjectReference;
use parking_lot::Mutex;

use crate::error::{EventType, ReconcileEvent};

pub trait EventRecorder: Send + Sync {
    fn record(&self, object: &ObjectReference, event: &ReconcileEvent);
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, object: &ObjectReference, event: &ReconcileEvent) {
        match event.event_type {
            EventType::Normal => {
                tracing::info!(object = %object, reason = %event.reason, "{}", event.message)
            }
            EventType::Warning => {
                tracing::warn!(object = %object, reason = %event.reason, "{}", event.message)
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<(ObjectReference, ReconcileEvent)>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn events_for(&self, object: &ObjectReference) -> Vec<ReconcileEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(o, _)| o == object)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// `"<Type> <Reason>"` for each event, in order.
    pub fn summaries(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|(_, e)| format!("{} {}", e.event_type, e.reason))
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, object: &ObjectReference, event: &ReconcileEvent) {
        self.events.lock().push((object.clone(), event.clone()));
    }
}
