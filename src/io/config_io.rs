use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not edit {path}: {source}")]
    DocumentError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("unknown config key '{0}' (expected: storage.dir, storage.key, log.level)")]
    UnknownKey(String),
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Keys accepted by `tl config set`
pub const SETTABLE_KEYS: [&str; 3] = ["storage.dir", "storage.key", "log.level"];

/// Config file path, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"));
    config_dir.join("tasklist").join("config.toml")
}

/// Default data directory, respecting XDG_DATA_HOME
pub fn default_data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".local").join("share"));
    data_dir.join("tasklist")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for formatting-preserving edits. A missing file
/// yields the defaults and an empty document.
pub fn read_config(path: &Path) -> Result<(Config, toml_edit::DocumentMut), ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc: toml_edit::DocumentMut =
        text.parse().map_err(|e| ConfigError::DocumentError {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, doc.to_string()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Set a dotted `table.field` key in the document.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), ConfigError> {
    if !SETTABLE_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    let Some((table, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][field] = toml_edit::value(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"# where my tasks live
[storage]
dir = "/srv/tasks"  # shared with the laptop
key = "work"

[log]
level = "info"
"#
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let (config, doc) = read_config(&tmp.path().join("config.toml")).unwrap();
        assert!(config.storage.dir.is_none());
        assert_eq!(config.storage.key, "tasks");
        assert!(doc.to_string().is_empty());
    }

    #[test]
    fn round_trip_preserves_formatting() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, sample_config()).unwrap();

        let (config, doc) = read_config(&path).unwrap();
        assert_eq!(config.storage.dir, Some(PathBuf::from("/srv/tasks")));
        assert_eq!(config.storage.key, "work");
        assert_eq!(config.log.level, "info");

        write_config(&path, &doc).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), sample_config());
    }

    #[test]
    fn set_value_keeps_comments() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        set_value(&mut doc, "log.level", "debug").unwrap();
        let result = doc.to_string();
        assert!(result.contains("# where my tasks live"));
        assert!(result.contains("level = \"debug\""));
        let config: Config = toml::from_str(&result).unwrap();
        assert_eq!(config.storage.key, "work");
    }

    #[test]
    fn set_value_creates_missing_table() {
        let mut doc = toml_edit::DocumentMut::new();
        set_value(&mut doc, "storage.dir", "/tmp/tl").unwrap();
        let config: Config = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.storage.dir, Some(PathBuf::from("/tmp/tl")));
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut doc = toml_edit::DocumentMut::new();
        assert!(matches!(
            set_value(&mut doc, "storage.color", "red"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[storage\n").unwrap();
        assert!(matches!(read_config(&path), Err(ConfigError::ParseError { .. })));
    }
}
