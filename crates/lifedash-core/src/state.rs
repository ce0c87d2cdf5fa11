//! The persisted aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::DEFAULT_BALANCE;
use crate::level::LevelCounter;
use crate::params::Parameters;
use crate::task::TaskTracker;

/// Cached energy shown before the first tick: a full default window.
pub const DEFAULT_ENERGY_REMAINING: u64 = 8 * 3600;

/// Everything the engine owns and flushes to the store after each mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    /// Non-negative, two-decimal precision.
    pub balance: f64,
    pub level: LevelCounter,
    /// Derived every tick; persisted only as a display cache.
    pub energy_remaining: u64,
    pub tasks: TaskTracker,
    #[serde(flatten)]
    pub params: Parameters,
    /// Instant of the most recent reconciliation. `None` before the first run.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            balance: DEFAULT_BALANCE,
            level: LevelCounter::new(),
            energy_remaining: DEFAULT_ENERGY_REMAINING,
            tasks: TaskTracker::new(),
            params: Parameters::default(),
            last_update: None,
        }
    }
}

impl SimulationState {
    /// Advance `last_update` to `now`, never moving it backwards.
    pub fn mark_updated(&mut self, now: DateTime<Utc>) {
        self.last_update = Some(match self.last_update {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn defaults() {
        let s = SimulationState::default();
        assert_eq!(s.balance, 10_000.0);
        assert_eq!(s.level.value(), 1);
        assert_eq!(s.energy_remaining, 28_800);
        assert!(s.tasks.is_empty());
        assert!(s.last_update.is_none());
    }

    #[test]
    fn last_update_is_non_decreasing() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap();
        let mut s = SimulationState::default();
        s.mark_updated(t0);
        s.mark_updated(t0 - Duration::minutes(5));
        assert_eq!(s.last_update, Some(t0));
        s.mark_updated(t0 + Duration::seconds(1));
        assert_eq!(s.last_update, Some(t0 + Duration::seconds(1)));
    }

    #[test]
    fn serializes_params_inline() {
        let json = serde_json::to_value(SimulationState::default()).unwrap();
        assert_eq!(json["monthlyExpense"], 3000.0);
        assert_eq!(json["resetTime"], "09:00");
        assert_eq!(json["level"], 1);
        assert!(json["tasks"].is_array());
    }
}
