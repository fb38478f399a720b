//! Lifecycle notifications for subsystems outside the world host.

use serde::Serialize;
use uuid::Uuid;
use worldhost_core::DimensionId;

/// A lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldEvent {
    /// Properties were created or recovered and registered.
    PropertiesConstructed {
        /// World folder.
        folder: String,
        /// Assigned UUID.
        uuid: Uuid,
        /// Assigned dimension id.
        dimension: Option<DimensionId>,
    },
    /// A world is about to be constructed. Cancelable.
    Loading {
        /// World folder.
        folder: String,
        /// Dimension being loaded.
        dimension: DimensionId,
    },
    /// A world is live.
    Loaded {
        /// World folder.
        folder: String,
        /// Dimension loaded.
        dimension: DimensionId,
    },
    /// A world is about to be unloaded. Cancelable unless shutting down.
    Unloading {
        /// World folder.
        folder: String,
        /// Dimension being unloaded.
        dimension: DimensionId,
        /// Whether the host is stopping.
        shutting_down: bool,
    },
    /// A world is no longer live.
    Unloaded {
        /// World folder.
        folder: String,
        /// Dimension unloaded.
        dimension: DimensionId,
    },
}

impl WorldEvent {
    /// Stable label for logs and event records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PropertiesConstructed { .. } => "properties_constructed",
            Self::Loading { .. } => "loading",
            Self::Loaded { .. } => "loaded",
            Self::Unloading { .. } => "unloading",
            Self::Unloaded { .. } => "unloaded",
        }
    }

    /// Folder the event concerns.
    pub fn folder(&self) -> &str {
        match self {
            Self::PropertiesConstructed { folder, .. }
            | Self::Loading { folder, .. }
            | Self::Loaded { folder, .. }
            | Self::Unloading { folder, .. }
            | Self::Unloaded { folder, .. } => folder,
        }
    }
}

/// A listener's answer to an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventResponse {
    /// Let the operation proceed.
    #[default]
    Continue,
    /// Ask for the operation to be abandoned. Only honored for cancelable events.
    Cancel,
}

/// Receiver of lifecycle notifications.
pub trait WorldListener: Send {
    /// Handle one event.
    fn on_event(&mut self, event: &WorldEvent) -> EventResponse;
}

/// Ordered set of listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn WorldListener>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Listeners are invoked in subscription order.
    pub fn subscribe(&mut self, listener: Box<dyn WorldListener>) {
        self.listeners.push(listener);
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the bus has no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver a fire-and-forget event.
    pub fn notify(&mut self, event: &WorldEvent) {
        for listener in &mut self.listeners {
            listener.on_event(event);
        }
    }

    /// Deliver a cancelable event to every listener; true if any canceled.
    pub fn post_cancelable(&mut self, event: &WorldEvent) -> bool {
        let mut canceled = false;
        for listener in &mut self.listeners {
            canceled |= listener.on_event(event) == EventResponse::Cancel;
        }
        canceled
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Veto(&'static str);

    impl WorldListener for Veto {
        fn on_event(&mut self, event: &WorldEvent) -> EventResponse {
            if event.kind() == self.0 {
                EventResponse::Cancel
            } else {
                EventResponse::Continue
            }
        }
    }

    fn unloading() -> WorldEvent {
        WorldEvent::Unloading {
            folder: "world".into(),
            dimension: DimensionId::PRIMARY,
            shutting_down: false,
        }
    }

    #[test]
    fn any_listener_can_cancel() {
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(Veto("loaded")));
        assert!(!bus.post_cancelable(&unloading()));
        bus.subscribe(Box::new(Veto("unloading")));
        assert!(bus.post_cancelable(&unloading()));
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let json = serde_json::to_string(&unloading()).unwrap();
        assert!(json.contains(r#""kind":"unloading""#), "{json}");
        assert!(json.contains(r#""dimension":0"#), "{json}");
    }
}
