use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the slot, its signal file and the recovery log.
    /// Absent = the platform data directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Name of the durable slot (`<dir>/<key>.json`)
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            dir: None,
            key: default_key(),
        }
    }
}

fn default_key() -> String {
    "tasks".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.storage.dir.is_none());
        assert_eq!(config.storage.key, "tasks");
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn partial_tables_fill_defaults() {
        let config: Config = toml::from_str("[storage]\ndir = \"/tmp/tl\"\n").unwrap();
        assert_eq!(config.storage.dir, Some(PathBuf::from("/tmp/tl")));
        assert_eq!(config.storage.key, "tasks");
    }
}
