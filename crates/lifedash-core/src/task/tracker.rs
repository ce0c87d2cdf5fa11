use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_deadline, validate_name, Task, TaskId};
use crate::error::ValidationError;
use crate::level::LevelCounter;

/// Ordered task collection. Insertion order is preserved.
///
/// Serializes as a plain JSON array of tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Task>", into = "Vec<Task>")]
pub struct TaskTracker {
    tasks: Vec<Task>,
    last_id: TaskId,
}

impl From<Vec<Task>> for TaskTracker {
    fn from(tasks: Vec<Task>) -> Self {
        let last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        Self { tasks, last_id }
    }
}

impl From<TaskTracker> for Vec<Task> {
    fn from(tracker: TaskTracker) -> Self {
        tracker.tasks
    }
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Parse `deadline` and append a new task.
    pub fn add(&mut self, name: &str, deadline: &str, now: DateTime<Utc>) -> Result<Task, ValidationError> {
        // Name is checked first so an empty form reports the missing name.
        validate_name(name)?;
        let deadline = parse_deadline(deadline)?;
        Ok(self.push(name.to_string(), deadline, now))
    }

    /// Append a task with an already-resolved deadline.
    pub fn add_at(&mut self, name: &str, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<Task, ValidationError> {
        validate_name(name)?;
        Ok(self.push(name.to_string(), deadline, now))
    }

    /// Remove the task and bump `level`. Unknown ids are a no-op.
    pub fn complete(&mut self, id: TaskId, level: &mut LevelCounter) -> Option<Task> {
        let task = self.remove(id)?;
        level.increment();
        Some(task)
    }

    /// Remove the task without touching the level.
    pub fn delete(&mut self, id: TaskId) -> Option<Task> {
        self.remove(id)
    }

    /// Recompute remaining time for every task.
    ///
    /// Returns the ids whose remaining time reached zero on this call.
    /// Expired tasks are kept.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Vec<TaskId> {
        let mut newly_expired = Vec::new();
        for task in &mut self.tasks {
            let was_live = task.remaining_time > 0;
            if task.refresh(now) && was_live {
                newly_expired.push(task.id);
            }
        }
        newly_expired
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn push(&mut self, name: String, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Task {
        let id = self.next_id(now);
        let task = Task::new(id, name, deadline, now);
        self.tasks.push(task.clone());
        task
    }

    fn next_id(&mut self, now: DateTime<Utc>) -> TaskId {
        let now_ms = now.timestamp_millis();
        let mut id = match self.last_id.checked_add(1) {
            Some(next) => now_ms.max(next),
            // A stored id sits at the top of the range: take the first free id from now.
            None => now_ms,
        };
        while self.get(id).is_some() {
            id = id.saturating_add(1);
        }
        self.last_id = self.last_id.max(id);
        id
    }

    fn remove(&mut self, id: TaskId) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(pos))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap()
    }

    fn tracker_with(names: &[&str]) -> TaskTracker {
        let mut tracker = TaskTracker::new();
        for (i, name) in names.iter().enumerate() {
            tracker
                .add_at(name, t0() + Duration::hours(i as i64 + 1), t0())
                .unwrap();
        }
        tracker
    }

    #[test]
    fn add_computes_remaining_time_immediately() {
        let mut tracker = TaskTracker::new();
        let task = tracker.add("write report", "2024-05-14T14:00:00Z", t0()).unwrap();
        assert_eq!(task.remaining_time, 2 * 3_600_000);
        assert_eq!(task.id, t0().timestamp_millis());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn add_rejects_empty_name_and_bad_deadline() {
        let mut tracker = TaskTracker::new();
        assert_eq!(
            tracker.add("   ", "2024-05-14T14:00:00Z", t0()),
            Err(ValidationError::EmptyTaskName)
        );
        assert!(matches!(
            tracker.add("x", "not a date", t0()),
            Err(ValidationError::InvalidDeadline { .. })
        ));
        assert!(tracker.is_empty());
    }

    #[test]
    fn past_deadline_starts_expired() {
        let mut tracker = TaskTracker::new();
        let task = tracker.add("late", "2024-05-14T11:00:00Z", t0()).unwrap();
        assert_eq!(task.remaining_time, 0);
        assert!(!task.is_completable());
        // Still deletable.
        assert!(tracker.delete(task.id).is_some());
    }

    #[test]
    fn ids_are_unique_within_one_millisecond() {
        let tracker = tracker_with(&["a", "b", "c"]);
        let ids: Vec<_> = tracker.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![ids[0], ids[0] + 1, ids[0] + 2]);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut tracker = tracker_with(&["a", "b", "c"]);
        let middle = tracker.tasks()[1].id;
        tracker.delete(middle);
        let names: Vec<_> = tracker.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn complete_removes_task_and_levels_up() {
        let mut tracker = tracker_with(&["a", "b"]);
        let mut level = LevelCounter::new();
        let id = tracker.tasks()[0].id;

        let done = tracker.complete(id, &mut level).unwrap();
        assert_eq!(done.name, "a");
        assert_eq!(level.value(), 2);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.get(id).is_none());
    }

    #[test]
    fn complete_unknown_id_is_noop() {
        let mut tracker = tracker_with(&["a"]);
        let mut level = LevelCounter::new();
        assert!(tracker.complete(999, &mut level).is_none());
        assert_eq!(level.value(), 1);
        assert_eq!(tracker.len(), 1);

        // Completing twice only counts once.
        let id = tracker.tasks()[0].id;
        tracker.complete(id, &mut level);
        tracker.complete(id, &mut level);
        assert_eq!(level.value(), 2);
    }

    #[test]
    fn delete_does_not_level_up() {
        let mut tracker = tracker_with(&["a"]);
        let id = tracker.tasks()[0].id;
        assert!(tracker.delete(id).is_some());
        assert!(tracker.delete(id).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn refresh_reports_each_expiry_once() {
        let mut tracker = tracker_with(&["a", "b"]);
        let first = tracker.tasks()[0].id;

        let expired = tracker.refresh(t0() + Duration::minutes(90));
        assert_eq!(expired, vec![first]);
        assert_eq!(tracker.len(), 2);

        let expired = tracker.refresh(t0() + Duration::minutes(91));
        assert!(expired.is_empty());
    }

    #[test]
    fn serializes_as_array_and_restores_id_sequence() {
        let tracker = tracker_with(&["a", "b"]);
        let json = serde_json::to_string(&tracker).unwrap();
        assert!(json.starts_with('['));

        let mut restored: TaskTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tracker);
        let next = restored.add_at("c", t0(), t0()).unwrap();
        assert!(tracker.tasks().iter().all(|t| t.id < next.id));
    }

    #[test]
    fn stored_id_at_range_limit_does_not_overflow() {
        let json = format!(
            r#"[{{"id":{},"name":"a","deadline":"2024-05-14T13:00:00Z","remainingTime":0}}]"#,
            i64::MAX
        );
        let mut restored: TaskTracker = serde_json::from_str(&json).unwrap();

        let first = restored.add_at("b", t0(), t0()).unwrap();
        let second = restored.add_at("c", t0(), t0()).unwrap();
        assert_eq!(first.id, t0().timestamp_millis());
        assert_ne!(second.id, first.id);
        assert_ne!(second.id, i64::MAX);
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn names_are_kept_as_typed() {
        let mut tracker = TaskTracker::new();
        let task = tracker.add("  water plants ", "2024-05-14T14:00:00Z", t0()).unwrap();
        assert_eq!(task.name, "  water plants ");
    }

    proptest! {
        #[test]
        fn refresh_is_idempotent(offsets in proptest::collection::vec(-100_000i64..100_000, 0..20), at in -200_000i64..200_000) {
            let mut tracker = TaskTracker::new();
            for (i, off) in offsets.iter().enumerate() {
                tracker.add_at(&format!("t{i}"), t0() + Duration::seconds(*off), t0()).unwrap();
            }
            let now = t0() + Duration::seconds(at);
            tracker.refresh(now);
            let first: Vec<u64> = tracker.tasks().iter().map(|t| t.remaining_time).collect();
            tracker.refresh(now);
            let second: Vec<u64> = tracker.tasks().iter().map(|t| t.remaining_time).collect();
            prop_assert_eq!(first, second);
        }
    }
}
