//! Boundary between untrusted slot bytes and the in-memory task list.
//!
//! Every array element is checked on its own: a bad record is dropped and
//! reported, the rest of the list still loads.

use std::collections::HashSet;

use serde_json::Value;

use crate::model::task::{Task, TaskId};

/// Result of decoding a slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hydration {
    pub tasks: Vec<Task>,
    pub dropped: Vec<DroppedRecord>,
}

/// Something that did not make it into the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    /// Array position, or `None` when the whole slot was rejected
    pub index: Option<usize>,
    pub reason: String,
    /// Original JSON text of the rejected element (or the whole slot)
    pub raw: String,
}

/// Decode raw slot bytes. Content that is not UTF-8 rejects the whole slot;
/// its `raw` is the lossy text so it can still be quarantined.
pub fn hydrate_bytes(raw: &[u8]) -> Hydration {
    match std::str::from_utf8(raw) {
        Ok(text) => hydrate(text),
        Err(e) => reject_all(&String::from_utf8_lossy(raw), format!("not valid UTF-8: {}", e)),
    }
}

pub fn hydrate(raw: &str) -> Hydration {
    if raw.trim().is_empty() {
        return Hydration::default();
    }

    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(other) => return reject_all(raw, format!("expected a JSON array, found {}", kind(&other))),
        Err(e) => return reject_all(raw, format!("invalid JSON: {}", e)),
    };

    let mut candidates: Vec<(usize, Task, String)> = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let raw_item = item.to_string();
        match decode_task(item) {
            Ok(task) => candidates.push((index, task, raw_item)),
            Err(reason) => dropped.push(DroppedRecord {
                index: Some(index),
                reason,
                raw: raw_item,
            }),
        }
    }

    // Last occurrence of an id wins.
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut kept = Vec::with_capacity(candidates.len());
    for (index, task, raw_item) in candidates.into_iter().rev() {
        if seen.insert(task.id) {
            kept.push(task);
        } else {
            dropped.push(DroppedRecord {
                index: Some(index),
                reason: format!("duplicate id {} (a later record wins)", task.id),
                raw: raw_item,
            });
        }
    }
    kept.reverse();
    dropped.sort_by_key(|d| d.index);

    Hydration {
        tasks: kept,
        dropped,
    }
}

fn decode_task(item: Value) -> Result<Task, String> {
    let mut task: Task = serde_json::from_value(item).map_err(|e| e.to_string())?;
    if task.id > TaskId::MAX {
        return Err(format!("id {} is above the largest supported id {}", task.id, TaskId::MAX));
    }
    let trimmed = task.text.trim();
    if trimmed.is_empty() {
        return Err("empty text".to_string());
    }
    if trimmed.len() != task.text.len() {
        task.text = trimmed.to_string();
    }
    Ok(task)
}

fn reject_all(raw: &str, reason: String) -> Hydration {
    Hydration {
        tasks: Vec::new(),
        dropped: vec![DroppedRecord {
            index: None,
            reason,
            raw: raw.to_string(),
        }],
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
