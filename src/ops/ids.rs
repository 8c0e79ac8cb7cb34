use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::model::task::TaskId;

/// Last id handed out by this process. Never reset.
static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

/// Issue a new task id.
///
/// Ids are shaped like millisecond epoch timestamps so they stay compatible
/// with lists written by older clients, but are strictly increasing within
/// the process and always greater than `floor` (the largest id already in
/// the list), so two creations in the same millisecond cannot collide.
///
/// Returns `None` when no id above `floor` fits under [`TaskId::MAX`].
pub fn next_id(floor: Option<TaskId>) -> Option<TaskId> {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let floor = floor.map_or(0, |f| f.0.saturating_add(1));

    let mut current = LAST_ISSUED.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(floor).max(current + 1);
        if candidate > TaskId::MAX.0 {
            return None;
        }
        match LAST_ISSUED.compare_exchange_weak(
            current,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return Some(TaskId(candidate)),
            Err(observed) => current = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_strictly_increase() {
        let mut prev = next_id(None).unwrap();
        for _ in 0..1_000 {
            let id = next_id(None).unwrap();
            assert!(id > prev, "{} should be greater than {}", id, prev);
            prev = id;
        }
    }

    #[test]
    fn ids_are_unique_in_a_burst() {
        let ids: HashSet<TaskId> = (0..500).map(|_| next_id(None).unwrap()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn ids_respect_floor() {
        // A floor a few seconds ahead keeps later ids epoch shaped.
        let floor = TaskId(next_id(None).unwrap().0 + 5_000);
        let id = next_id(Some(floor)).unwrap();
        assert!(id > floor);
        assert!(next_id(None).unwrap() > id);
    }

    #[test]
    fn ids_look_like_epoch_millis() {
        let before = Utc::now().timestamp_millis() as u64;
        let id = next_id(None).unwrap();
        assert!(id.0 >= before);
    }

    #[test]
    fn floor_at_or_above_ceiling_issues_nothing() {
        assert_eq!(next_id(Some(TaskId::MAX)), None);
        assert_eq!(next_id(Some(TaskId(u64::MAX))), None);
        assert!(next_id(None).unwrap() < TaskId::MAX);
    }
}
