use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace};

use crate::io::signal::{Origin, Signal, read_signal};
use crate::io::slot::Slot;

/// Error type for watcher setup
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("could not watch {path}: {source}")]
    Notify {
        path: std::path::PathBuf,
        source: notify::Error,
    },
}

/// Events sent from the watcher thread to the owning context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    /// Another context wrote the slot.
    Changed { origin: Origin, seq: u64 },
}

/// Watches a slot's signal file and reports writes made by other
/// contexts. Signals carrying our own origin are never delivered.
pub struct SlotWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<SlotEvent>,
}

impl SlotWatcher {
    pub fn start(slot: &Slot, own_origin: Origin) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();
        let signal_path = slot.signal_path();
        let signal_name = signal_path.file_name().map(|n| n.to_os_string());
        let mut last_seen: Option<Signal> = None;

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {}
                    _ => return,
                }

                // The temp file is renamed over the signal, so match on name
                // rather than the full path (which may be canonicalized).
                let touched = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == signal_name);
                if !touched {
                    return;
                }

                let Some(signal) = read_signal(&signal_path) else {
                    return;
                };
                if signal.is_from(&own_origin) {
                    trace!(seq = signal.seq, "ignoring own signal");
                    return;
                }
                if last_seen.as_ref() == Some(&signal) {
                    return;
                }
                last_seen = Some(signal.clone());

                debug!(origin = %signal.origin, seq = signal.seq, "slot changed elsewhere");
                let _ = tx.send(SlotEvent::Changed {
                    origin: signal.origin,
                    seq: signal.seq,
                });
            },
            Config::default(),
        )
        .map_err(|e| WatchError::Notify {
            path: slot.dir().to_path_buf(),
            source: e,
        })?;

        watcher
            .watch(slot.dir(), RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Notify {
                path: slot.dir().to_path_buf(),
                source: e,
            })?;

        Ok(SlotWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending events.
    /// Returns all queued events (may be empty).
    pub fn poll(&self) -> Vec<SlotEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Wait up to `timeout` for a change. Any further queued events are
    /// drained, since one reload covers all of them.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SlotEvent> {
        let first = self.rx.recv_timeout(timeout).ok()?;
        Some(self.poll().pop().unwrap_or(first))
    }
}
