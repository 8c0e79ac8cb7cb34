use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::io::recovery::atomic_write;

/// Identifies one context (process/session) sharing a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// A fresh origin, unique per call
    pub fn generate() -> Self {
        Origin(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "The slot changed". Carries no task data: receivers re-read the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub origin: Origin,
    /// Per-origin write counter, used to collapse duplicate file events
    pub seq: u64,
}

impl Signal {
    pub fn is_from(&self, origin: &Origin) -> bool {
        &self.origin == origin
    }
}

pub fn write_signal(path: &Path, signal: &Signal) -> io::Result<()> {
    let content = serde_json::to_string(signal).map_err(io::Error::other)?;
    atomic_write(path, content.as_bytes())
}

/// `None` if the file is missing or not a signal.
pub fn read_signal(path: &Path) -> Option<Signal> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn origins_are_distinct() {
        assert_ne!(Origin::generate(), Origin::generate());
    }

    #[test]
    fn write_and_read_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".tasks.signal");
        let signal = Signal {
            origin: Origin::generate(),
            seq: 3,
        };
        write_signal(&path, &signal).unwrap();
        assert_eq!(read_signal(&path), Some(signal));
    }

    #[test]
    fn garbage_is_not_a_signal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".tasks.signal");
        assert_eq!(read_signal(&path), None);
        fs::write(&path, "{oops").unwrap();
        assert_eq!(read_signal(&path), None);
    }

    #[test]
    fn is_from_compares_origin() {
        let mine = Origin::generate();
        let signal = Signal {
            origin: mine.clone(),
            seq: 1,
        };
        assert!(signal.is_from(&mine));
        assert!(!signal.is_from(&Origin::generate()));
    }
}
