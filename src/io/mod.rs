pub mod bridge;
pub mod config_io;
pub mod hydrate;
pub mod recovery;
pub mod signal;
pub mod slot;
pub mod watcher;

pub use bridge::PersistenceBridge;
pub use slot::StorageError;
pub use watcher::{SlotEvent, SlotWatcher, WatchError};
