//! One context's view of the task list.
//!
//! A user intent mutates the store first, then the list is written through
//! the bridge and other contexts are signalled. A signal from another
//! context reloads the slot and replaces the list without writing back.

use tracing::{info, warn};

use crate::io::bridge::PersistenceBridge;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::slot::StorageError;
use crate::model::task::{FilterMode, Task, TaskId};
use crate::ops::store::{TaskStore, Toggle};
use crate::ops::view::{Projection, project};

/// A save that did not reach the slot. The in-memory list still holds the
/// change; it is written again by the next successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveWarning {
    pub message: String,
}

pub struct Session {
    store: TaskStore,
    bridge: PersistenceBridge,
    filter: FilterMode,
    warnings: Vec<SaveWarning>,
}

impl Session {
    /// Hydrate from the bridge's slot. Does not write.
    pub fn open(bridge: PersistenceBridge) -> Self {
        let mut store = TaskStore::new();
        store.replace_all(bridge.load());
        info!(count = store.len(), "session opened");
        Session {
            store,
            bridge,
            filter: FilterMode::default(),
            warnings: Vec::new(),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn bridge(&self) -> &PersistenceBridge {
        &self.bridge
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    pub fn projection(&self) -> Projection<'_> {
        project(self.store.tasks(), self.filter)
    }

    pub fn add(&mut self, text: &str) -> Option<Task> {
        let task = self.store.add_task(text)?;
        self.persist();
        Some(task)
    }

    pub fn toggle(&mut self, id: TaskId) -> Toggle {
        let outcome = self.store.toggle_task(id);
        if outcome != Toggle::NotFound {
            self.persist();
        }
        outcome
    }

    /// Persists even when nothing was removed.
    pub fn delete(&mut self, id: TaskId) -> bool {
        let removed = self.store.delete_task(id);
        self.persist();
        removed
    }

    pub fn clear_completed(&mut self) -> usize {
        let removed = self.store.clear_completed();
        self.persist();
        removed
    }

    /// Another context wrote the slot: reload and replace the whole list.
    pub fn handle_external_change(&mut self) {
        let tasks = self.bridge.load();
        self.store.replace_all(tasks);
        info!(count = self.store.len(), "reloaded after external change");
    }

    /// Drain save warnings accumulated since the last call.
    pub fn take_warnings(&mut self) -> Vec<SaveWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn persist(&mut self) {
        if let Err(e) = self.bridge.save(self.store.tasks()) {
            self.record_failed_save(e);
        }
    }

    fn record_failed_save(&mut self, error: StorageError) {
        warn!(error = %error, "task list not saved; keeping changes in memory");

        let slot = self.bridge.slot();
        let body = serde_json::to_string_pretty(self.store.tasks()).unwrap_or_default();
        recovery::log_recovery(
            slot.dir(),
            RecoveryEntry::new(RecoveryCategory::Write, "task list not saved")
                .field("Slot", slot.path().display().to_string())
                .field("Error", error.to_string())
                .body(body),
        );

        self.warnings.push(SaveWarning {
            message: format!("changes kept in memory but not saved: {}", error),
        });
    }
}
