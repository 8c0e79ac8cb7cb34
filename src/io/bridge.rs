use std::path::Path;

use tracing::{debug, warn};

use crate::io::hydrate::{Hydration, hydrate_bytes};
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::signal::{Origin, Signal, write_signal};
use crate::io::slot::{Slot, StorageError};
use crate::io::watcher::{SlotWatcher, WatchError};
use crate::model::task::Task;

/// Durable round-trip of the task list, plus change signals to every other
/// context sharing the same slot.
pub struct PersistenceBridge {
    slot: Slot,
    origin: Origin,
    seq: u64,
}

impl PersistenceBridge {
    /// Open (creating the directory if needed) the slot `<dir>/<key>.json`
    /// as a new context.
    pub fn open(dir: &Path, key: &str) -> Result<Self, StorageError> {
        let slot = Slot::new(dir, key)?;
        slot.ensure_dir()?;
        let origin = Origin::generate();
        debug!(slot = %slot.path().display(), origin = %origin, "bridge opened");
        Ok(PersistenceBridge {
            slot,
            origin,
            seq: 0,
        })
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Overwrite the slot with the full list, then signal other contexts.
    ///
    /// Nothing is signalled when the write fails. A failed signal after a
    /// successful write is logged only: the data is safe, siblings just
    /// pick it up on their next load.
    pub fn save(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let content = serde_json::to_string(tasks)?;
        self.slot.write(&content)?;

        self.seq += 1;
        let signal = Signal {
            origin: self.origin.clone(),
            seq: self.seq,
        };
        if let Err(e) = write_signal(&self.slot.signal_path(), &signal) {
            warn!(error = %e, "slot saved but change signal could not be written");
        }
        debug!(count = tasks.len(), seq = self.seq, "slot saved");
        Ok(())
    }

    /// Read the slot. Never fails: a missing, unreadable or corrupt slot
    /// loads as an empty list, and bad records are dropped one by one.
    pub fn load(&self) -> Vec<Task> {
        self.load_report().tasks
    }

    /// Like [`load`](Self::load), also returning what was dropped. Every
    /// dropped record is logged and quarantined in the recovery log.
    pub fn load_report(&self) -> Hydration {
        let hydration = match self.slot.read() {
            Ok(Some(raw)) => hydrate_bytes(&raw),
            Ok(None) => return Hydration::default(),
            Err(e) => {
                warn!(error = %e, "slot unreadable, loading an empty list");
                recovery::log_recovery_unique(
                    self.slot.dir(),
                    RecoveryEntry::new(RecoveryCategory::Hydrate, "could not read slot")
                        .field("Slot", self.slot.path().display().to_string())
                        .field("Reason", e.to_string()),
                );
                return Hydration::default();
            }
        };

        for record in &hydration.dropped {
            let position = record
                .index
                .map_or_else(|| "whole slot".to_string(), |i| format!("record {}", i));
            warn!(position = %position, reason = %record.reason, "dropped slot content");
            recovery::log_recovery_unique(
                self.slot.dir(),
                RecoveryEntry::new(RecoveryCategory::Hydrate, format!("dropped {}", position))
                    .field("Slot", self.slot.path().display().to_string())
                    .field("Reason", record.reason.clone())
                    .body(record.raw.clone()),
            );
        }
        hydration
    }

    /// Start listening for writes made by other contexts.
    pub fn subscribe(&self) -> Result<SlotWatcher, WatchError> {
        SlotWatcher::start(&self.slot, self.origin.clone())
    }
}
