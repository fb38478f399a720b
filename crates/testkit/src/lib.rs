#![warn(missing_docs)]
//! Test surfaces for the world host: event capture, on-disk save fixtures
//! and a storage backend with injectable failures.

mod fixture;
mod listener;
mod storage;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::warn;
use worldhost_world::{EventResponse, WorldEvent, WorldListener};

pub use fixture::*;
pub use listener::*;
pub use storage::*;

/// One line of an event log.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Wall-clock time the event was observed.
    pub observed_at: DateTime<Utc>,
    /// Event kind label.
    pub kind: &'a str,
    /// The event itself.
    pub event: &'a WorldEvent,
}

/// Listener that appends every event to a newline-delimited JSON file.
pub struct JsonlEventSink {
    file: File,
}

impl JsonlEventSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &WorldEvent) -> Result<()> {
        let record = EventRecord {
            observed_at: Utc::now(),
            kind: event.kind(),
            event,
        };
        let line = serde_json::to_string(&record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

impl WorldListener for JsonlEventSink {
    fn on_event(&mut self, event: &WorldEvent) -> EventResponse {
        if let Err(err) = self.write(event) {
            warn!(kind = event.kind(), "Failed to record event: {err:#}");
        }
        EventResponse::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use worldhost_core::DimensionId;

    #[test]
    fn jsonl_sink_writes_one_line_per_event() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/events.jsonl");
        let mut sink = JsonlEventSink::create(&path).expect("sink create");
        for dimension in [DimensionId::PRIMARY, DimensionId::NETHER] {
            let response = sink.on_event(&WorldEvent::Loaded {
                folder: "world".into(),
                dimension,
            });
            assert_eq!(response, EventResponse::Continue);
        }
        let contents = fs::read_to_string(&path).expect("file readable");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(r#""kind":"loaded""#));
        assert!(lines[1].contains(r#""dimension":-1"#));
        assert!(lines[0].contains("observed_at"));
    }
}
