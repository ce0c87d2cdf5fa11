//! Deadline-bound tasks.
//!
//! A task's remaining time is derived from its deadline on every refresh.
//! Expired tasks stay in the list until the user deletes them.

mod tracker;

pub use tracker::TaskTracker;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Task identifier: the creation instant in epoch milliseconds, bumped when
/// two tasks are created within the same millisecond.
pub type TaskId = i64;

/// Wall-clock formats accepted for deadlines without an offset, interpreted
/// in host-local time.
const LOCAL_DEADLINE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_deadline")]
    pub deadline: DateTime<Utc>,
    /// Milliseconds until the deadline, 0 once expired.
    #[serde(default, deserialize_with = "deserialize_remaining")]
    pub remaining_time: u64,
}

impl Task {
    pub fn new(id: TaskId, name: String, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut task = Self {
            id,
            name,
            deadline,
            remaining_time: 0,
        };
        task.refresh(now);
        task
    }

    /// Recompute `remaining_time`. Returns true if the task is expired.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        self.remaining_time = (self.deadline - now).num_milliseconds().max(0) as u64;
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_time == 0
    }

    /// Completion is only offered while the deadline is still ahead.
    pub fn is_completable(&self) -> bool {
        !self.is_expired()
    }
}

/// Parse a deadline given either as RFC 3339 or as a local wall-clock time
/// (`YYYY-MM-DDTHH:MM[:SS]`, the shape produced by datetime pickers).
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidDeadline {
        input: input.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in LOCAL_DEADLINE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            // A wall-clock time skipped by a DST jump has no local instant.
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(invalid);
        }
    }
    Err(invalid())
}

/// A task name must contain something other than whitespace. The name is
/// stored as typed.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyTaskName);
    }
    Ok(())
}

fn deserialize_deadline<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_deadline(&raw).map_err(serde::de::Error::custom)
}

// Older snapshots may carry a negative or fractional cached value; it is
// recomputed on the next refresh anyway.
fn deserialize_remaining<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(if raw.is_finite() && raw > 0.0 { raw as u64 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn remaining_time_counts_down_to_zero() {
        let mut task = Task::new(1, "report".into(), t0() + Duration::hours(2), t0());
        assert_eq!(task.remaining_time, 2 * 3_600_000);
        assert!(task.is_completable());

        assert!(task.refresh(t0() + Duration::hours(3)));
        assert_eq!(task.remaining_time, 0);
        assert!(!task.is_completable());
    }

    #[test]
    fn parses_rfc3339() {
        let dt = parse_deadline("2024-05-14T12:00:00Z").unwrap();
        assert_eq!(dt, t0());
        let dt = parse_deadline("2024-05-14T14:00:00+02:00").unwrap();
        assert_eq!(dt, t0());
    }

    #[test]
    fn parses_local_picker_format() {
        let naive = NaiveDate::from_ymd_opt(2024, 5, 14)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_deadline("2024-05-14T17:30").unwrap(), expected);
        assert_eq!(parse_deadline("2024-05-14 17:30:00").unwrap(), expected);
    }

    #[test]
    fn rejects_unparsable_deadline() {
        for bad in ["", "   ", "tomorrow", "2024-13-01T10:00", "2024-05-14"] {
            assert!(
                matches!(parse_deadline(bad), Err(ValidationError::InvalidDeadline { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn json_shape_is_camel_case() {
        let task = Task::new(42, "ship".into(), t0() + Duration::minutes(1), t0());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["name"], "ship");
        assert_eq!(json["remainingTime"], 60_000);
        assert!(json["deadline"].is_string());
    }

    #[test]
    fn deserializes_local_deadline_strings() {
        let json = r#"{"id":1,"name":"a","deadline":"2024-05-14T17:30","remainingTime":5}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.deadline, parse_deadline("2024-05-14T17:30").unwrap());
        assert_eq!(task.remaining_time, 5);

        let json = r#"{"id":2,"name":"b","deadline":"2024-05-14T12:00:00Z","remainingTime":-300}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.remaining_time, 0);
    }
}
