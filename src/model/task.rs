use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a task. Unique within a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Largest id a JSON number holds exactly in a browser (2^53 - 1).
    /// Stored ids above it are rejected on load so new ids always have room.
    pub const MAX: TaskId = TaskId((1 << 53) - 1);
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| format!("invalid task id '{}' (expected a non-negative integer)", s))
    }
}

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Trimmed, never empty
    pub text: String,
    pub completed: bool,
    /// Creation time. Informational only.
    #[serde(
        rename = "createdAt",
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build a new, incomplete task. Callers are responsible for passing
    /// already-trimmed, non-empty text.
    pub fn new(id: TaskId, text: String, created_at: DateTime<Utc>) -> Self {
        Task {
            id,
            text,
            completed: false,
            created_at,
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g.
/// `2024-05-01T12:00:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid createdAt timestamp '{}'", raw)))
}

/// Which tasks a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterMode {
    /// Whether a task is visible under this filter
    pub fn accepts(self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Active => !task.completed,
            FilterMode::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Active => "active",
            FilterMode::Completed => "completed",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> Task {
        Task::new(
            TaskId(1714564800000),
            "buy milk".into(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn serializes_with_browser_field_names() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"id":1714564800000,"text":"buy milk","completed":false,"createdAt":"2024-05-01T12:00:00.000Z"}"#
        );
    }

    #[test]
    fn deserializes_offset_timestamps_as_utc() {
        let task: Task = serde_json::from_str(
            r#"{"id":7,"text":"x","completed":true,"createdAt":"2024-05-01T14:00:00+02:00"}"#,
        )
        .unwrap();
        assert_eq!(task.created_at, sample().created_at);
        assert!(task.completed);
    }

    #[test]
    fn rejects_bad_timestamp() {
        let result: Result<Task, _> = serde_json::from_str(
            r#"{"id":7,"text":"x","completed":true,"createdAt":"yesterday"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn filter_accepts() {
        let mut task = sample();
        assert!(FilterMode::All.accepts(&task));
        assert!(FilterMode::Active.accepts(&task));
        assert!(!FilterMode::Completed.accepts(&task));
        task.completed = true;
        assert!(FilterMode::All.accepts(&task));
        assert!(!FilterMode::Active.accepts(&task));
        assert!(FilterMode::Completed.accepts(&task));
    }

    #[test]
    fn filter_defaults_to_all() {
        assert_eq!(FilterMode::default(), FilterMode::All);
    }

    #[test]
    fn task_id_parse() {
        assert_eq!("42".parse::<TaskId>(), Ok(TaskId(42)));
        assert!("-1".parse::<TaskId>().is_err());
        assert!("abc".parse::<TaskId>().is_err());
    }
}
