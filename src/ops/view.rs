use crate::model::task::{FilterMode, Task};

/// What a renderer needs to draw the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection<'a> {
    pub filter: FilterMode,
    /// Tasks passing the filter, in list order
    pub visible: Vec<&'a Task>,
    /// Incomplete tasks across the whole list, regardless of filter
    pub active_count: usize,
    /// True when nothing passes the filter (renderers show a placeholder)
    pub is_empty: bool,
}

/// Filter `tasks` for display. Never reorders.
pub fn project(tasks: &[Task], filter: FilterMode) -> Projection<'_> {
    let visible: Vec<&Task> = tasks.iter().filter(|t| filter.accepts(t)).collect();
    let is_empty = visible.is_empty();
    Projection {
        filter,
        visible,
        active_count: active_count(tasks),
        is_empty,
    }
}

pub fn active_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|t| !t.completed).count()
}

/// Footer text, e.g. "1 task left" / "3 tasks left"
pub fn items_left_label(count: usize) -> String {
    format!("{} task{} left", count, if count == 1 { "" } else { "s" })
}
