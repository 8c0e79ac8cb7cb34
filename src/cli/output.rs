use serde::Serialize;

use crate::model::task::{FilterMode, Task};
use crate::ops::view::{Projection, items_left_label};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProjectionJson<'a> {
    pub filter: FilterMode,
    pub tasks: &'a [&'a Task],
    pub active_count: usize,
    pub empty: bool,
}

pub fn projection_to_json<'a>(projection: &'a Projection<'a>) -> ProjectionJson<'a> {
    ProjectionJson {
        filter: projection.filter,
        tasks: &projection.visible,
        active_count: projection.active_count,
        empty: projection.is_empty,
    }
}

#[derive(Serialize)]
pub struct ClearJson {
    pub removed: usize,
}

#[derive(Serialize)]
pub struct ToggleJson {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

#[derive(Serialize)]
pub struct DeleteJson {
    pub removed: bool,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// `[x] 1714564800000 buy milk`
pub fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    format!("[{}] {} {}", mark, task.id, task.text)
}

fn empty_message(filter: FilterMode) -> &'static str {
    match filter {
        FilterMode::All => "No tasks yet. Add one with `tl add <text>`.",
        FilterMode::Active => "Nothing left to do.",
        FilterMode::Completed => "No completed tasks.",
    }
}

/// The list followed by a blank line and the "N tasks left" footer
pub fn format_projection(projection: &Projection<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    if projection.is_empty {
        lines.push(empty_message(projection.filter).to_string());
    } else {
        lines.extend(projection.visible.iter().map(|t| format_task_line(t)));
    }
    lines.push(String::new());
    lines.push(items_left_label(projection.active_count));
    lines
}
