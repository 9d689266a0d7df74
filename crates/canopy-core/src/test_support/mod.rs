//! Test support shared by this crate's tests and, behind the `test-utils`
//! feature, by other crates of the workspace.

pub mod memory;

pub use memory::{Call, MemoryBackend};

use crate::events::{CategoryEvent, CategoryObserver};
use crate::types::ElementId;
use parking_lot::Mutex;

/// Observer that records `(event name, category ID)` pairs
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(&'static str, Option<ElementId>)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(&'static str, Option<ElementId>)> {
        self.events.lock().clone()
    }

    /// IDs of the recorded events with the given name, in order
    pub fn ids_for(&self, name: &str) -> Vec<ElementId> {
        self.events
            .lock()
            .iter()
            .filter(|(n, _)| *n == name)
            .filter_map(|(_, id)| *id)
            .collect()
    }
}

impl CategoryObserver for RecordingObserver {
    fn on_event(&self, event: &CategoryEvent<'_>) {
        self.events.lock().push((event.name(), event.category().id));
    }
}
