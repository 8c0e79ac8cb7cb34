use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use crate::model::task::{Task, TaskId};
use crate::ops::ids;

/// Outcome of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The task exists; `completed` is its new value
    Toggled { completed: bool },
    NotFound,
}

/// The ordered task list and every mutation on it. No I/O happens here:
/// callers decide when to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore { tasks: Vec::new() }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Append a task built from `raw`. Whitespace-only input is ignored
    /// and returns `None`.
    pub fn add_task(&mut self, raw: &str) -> Option<Task> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        let floor = self.tasks.iter().map(|t| t.id).max();
        let id = ids::next_id(floor).unwrap_or_else(|| self.lowest_free_id());
        let task = Task::new(id, text.to_string(), Utc::now());
        debug!(id = %task.id, "task added");
        self.tasks.push(task.clone());
        Some(task)
    }

    fn lowest_free_id(&self) -> TaskId {
        let taken: HashSet<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        let mut candidate = 1;
        while taken.contains(&TaskId(candidate)) {
            candidate += 1;
        }
        TaskId(candidate)
    }

    /// Flip `completed` on the task with this id.
    pub fn toggle_task(&mut self, id: TaskId) -> Toggle {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                debug!(id = %id, completed = task.completed, "task toggled");
                Toggle::Toggled {
                    completed: task.completed,
                }
            }
            None => Toggle::NotFound,
        }
    }

    /// Remove the task with this id. Returns whether anything was removed;
    /// deleting a missing id is not an error.
    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            debug!(id = %id, "task deleted");
        }
        removed
    }

    /// Remove every completed task and return how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        debug!(removed, "cleared completed tasks");
        removed
    }

    /// Replace the whole list, e.g. after reading the durable slot.
    ///
    /// Ids must stay unique: when the same id appears more than once, the
    /// last occurrence wins and keeps its own position. Returns the number
    /// of earlier duplicates discarded.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> usize {
        let incoming = tasks.len();
        let mut seen = HashSet::new();
        let mut kept: Vec<Task> = tasks
            .into_iter()
            .rev()
            .filter(|t| seen.insert(t.id))
            .collect();
        kept.reverse();

        let discarded = incoming - kept.len();
        debug!(count = kept.len(), discarded, "task list replaced");
        self.tasks = kept;
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn task(id: u64, text: &str, completed: bool) -> Task {
        Task {
            id: TaskId(id),
            text: text.to_string(),
            completed,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn store_with(tasks: Vec<Task>) -> TaskStore {
        let mut store = TaskStore::new();
        store.replace_all(tasks);
        store
    }

    // --- add ---

    #[test]
    fn add_appends_incomplete_trimmed_task() {
        let mut store = store_with(vec![task(1, "first", false)]);
        let added = store.add_task("  buy milk \n").unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(added.text, "buy milk");
        assert!(!added.completed);
        assert_eq!(store.tasks().last(), Some(&added));
    }

    #[test]
    fn add_whitespace_only_is_noop() {
        let mut store = store_with(vec![task(1, "first", false)]);
        for raw in ["", " ", "\t\n", "   \r\n  "] {
            assert!(store.add_task(raw).is_none());
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_never_reuses_existing_id() {
        let far_future = Utc::now().timestamp_millis() as u64 + 5_000;
        let mut store = store_with(vec![task(far_future, "from another process", false)]);
        let added = store.add_task("mine").unwrap();
        assert!(added.id > TaskId(far_future));
    }

    #[test]
    fn add_after_u64_max_id_picks_a_free_id() {
        let mut store = store_with(vec![task(u64::MAX, "top", false), task(1, "one", false)]);
        let added = store.add_task("mine").unwrap();
        assert_eq!(added.id, TaskId(2));
        let next = store.add_task("again").unwrap();
        assert_eq!(next.id, TaskId(3));
    }

    #[test]
    fn rapid_adds_get_distinct_ids() {
        let mut store = TaskStore::new();
        for i in 0..100 {
            store.add_task(&format!("task {}", i));
        }
        let ids: HashSet<TaskId> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 100);
    }

    // --- toggle ---

    #[test]
    fn toggle_twice_restores_flag() {
        let mut store = store_with(vec![task(1, "a", false), task(2, "b", true)]);

        assert_eq!(store.toggle_task(TaskId(1)), Toggle::Toggled { completed: true });
        assert_eq!(store.toggle_task(TaskId(1)), Toggle::Toggled { completed: false });
        assert!(!store.get(TaskId(1)).unwrap().completed);

        store.toggle_task(TaskId(2));
        store.toggle_task(TaskId(2));
        assert!(store.get(TaskId(2)).unwrap().completed);
    }

    #[test]
    fn toggle_missing_reports_not_found() {
        let mut store = store_with(vec![task(1, "a", false)]);
        let before = store.clone();
        assert_eq!(store.toggle_task(TaskId(99)), Toggle::NotFound);
        assert_eq!(store, before);
    }

    // --- delete ---

    #[test]
    fn delete_is_idempotent() {
        let mut store = store_with(vec![task(1, "a", false), task(2, "b", false)]);

        assert!(store.delete_task(TaskId(1)));
        let once = store.clone();
        assert!(!store.delete_task(TaskId(1)));
        assert_eq!(store, once);
        assert_eq!(store.tasks(), &[task(2, "b", false)]);
    }

    // --- clear completed ---

    #[test]
    fn clear_completed_removes_only_completed() {
        let mut store = store_with(vec![
            task(1, "a", true),
            task(2, "b", false),
            task(3, "c", true),
            task(4, "d", false),
        ]);

        assert_eq!(store.clear_completed(), 2);
        assert!(store.tasks().iter().all(|t| !t.completed));
        assert_eq!(store.tasks(), &[task(2, "b", false), task(4, "d", false)]);
        assert_eq!(store.clear_completed(), 0);
    }

    // --- replace ---

    #[test]
    fn replace_all_swaps_contents_wholesale() {
        let mut store = store_with(vec![task(1, "a", false)]);
        let discarded = store.replace_all(vec![task(5, "x", true), task(6, "y", false)]);
        assert_eq!(discarded, 0);
        assert_eq!(store.tasks(), &[task(5, "x", true), task(6, "y", false)]);
    }

    #[test]
    fn replace_all_duplicate_ids_last_seen_wins() {
        let mut store = TaskStore::new();
        let discarded = store.replace_all(vec![
            task(1, "old", false),
            task(2, "b", false),
            task(1, "new", true),
            task(3, "c", false),
        ]);

        assert_eq!(discarded, 1);
        assert_eq!(
            store.tasks(),
            &[task(2, "b", false), task(1, "new", true), task(3, "c", false)]
        );
    }
}
