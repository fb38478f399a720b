use std::sync::{Arc, Mutex, PoisonError};

use worldhost_world::{EventResponse, WorldEvent, WorldListener};

/// Shared view of the events a [`RecordingListener`] captured.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<WorldEvent>>>,
}

impl EventLog {
    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<WorldEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kind labels of every event so far.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(WorldEvent::kind).collect()
    }

    /// Number of captured events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything captured so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, event: WorldEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Listener that records every event and optionally cancels one kind.
#[derive(Debug, Default)]
pub struct RecordingListener {
    log: EventLog,
    cancel: Option<&'static str>,
}

impl RecordingListener {
    /// Listener that lets everything through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener that cancels events whose kind is `kind`.
    pub fn canceling(kind: &'static str) -> Self {
        Self {
            cancel: Some(kind),
            ..Self::default()
        }
    }

    /// Handle to the captured events; stays valid after the listener is boxed.
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }
}

impl WorldListener for RecordingListener {
    fn on_event(&mut self, event: &WorldEvent) -> EventResponse {
        self.log.push(event.clone());
        if self.cancel == Some(event.kind()) {
            EventResponse::Cancel
        } else {
            EventResponse::Continue
        }
    }
}
