//! Encoding of [`SimulationState`] into string keys.
//!
//! Each field has its own key so a corrupt value only costs that field:
//! the loader logs a warning and substitutes the default.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::KvStore;
use crate::balance::{round_cents, DecayAnchor, DEFAULT_BALANCE};
use crate::error::StoreError;
use crate::level::LevelCounter;
use crate::params::{ResetTime, DEFAULT_MONTHLY_EXPENSE, DEFAULT_WORK_HOURS, MAX_WORK_HOURS};
use crate::state::{SimulationState, DEFAULT_ENERGY_REMAINING};
use crate::task::{Task, TaskTracker};

pub const KEY_BALANCE: &str = "balance";
pub const KEY_LEVEL: &str = "level";
pub const KEY_TIME_LEFT: &str = "timeLeft";
pub const KEY_TASKS: &str = "tasks";
pub const KEY_MONTHLY_EXPENSE: &str = "monthlyExpense";
pub const KEY_WORK_HOURS: &str = "workHours";
pub const KEY_RESET_TIME: &str = "resetTime";
pub const KEY_LAST_UPDATE: &str = "lastUpdateTimestamp";

pub const ALL_KEYS: [&str; 8] = [
    KEY_BALANCE,
    KEY_LEVEL,
    KEY_TIME_LEFT,
    KEY_TASKS,
    KEY_MONTHLY_EXPENSE,
    KEY_WORK_HOURS,
    KEY_RESET_TIME,
    KEY_LAST_UPDATE,
];

/// Where balance decay is measured from. Kept apart from the snapshot keys
/// so an engine restart can continue the same decay curve.
pub const KEY_ANCHOR_BALANCE: &str = "decayAnchorBalance";
pub const KEY_ANCHOR_AT: &str = "decayAnchorTimestamp";

/// Load the full state. Never fails.
pub fn load_state<S: KvStore + ?Sized>(store: &S) -> SimulationState {
    let mut state = SimulationState::default();

    state.balance = read(store, KEY_BALANCE, parse_amount).map_or(DEFAULT_BALANCE, round_cents);
    state.level = read(store, KEY_LEVEL, parse_level).unwrap_or_default();
    state.energy_remaining = read(store, KEY_TIME_LEFT, parse_count).unwrap_or(DEFAULT_ENERGY_REMAINING);
    state.tasks = read(store, KEY_TASKS, parse_tasks).unwrap_or_default();
    state.params.monthly_expense = read(store, KEY_MONTHLY_EXPENSE, parse_amount).unwrap_or(DEFAULT_MONTHLY_EXPENSE);
    state.params.work_hours = read(store, KEY_WORK_HOURS, parse_work_hours).unwrap_or(DEFAULT_WORK_HOURS);
    state.params.reset_time = read(store, KEY_RESET_TIME, |s| ResetTime::from_str(s).ok()).unwrap_or_default();
    state.last_update = read(store, KEY_LAST_UPDATE, parse_epoch_ms);

    state
}

/// Write every key as a full snapshot.
///
/// # Errors
/// Returns the first backend failure; later keys are not attempted.
pub fn save_state<S: KvStore + ?Sized>(store: &mut S, state: &SimulationState) -> Result<(), StoreError> {
    let tasks = serde_json::to_string(&state.tasks)
        .map_err(|e| StoreError::QueryFailed(format!("encoding tasks: {e}")))?;

    store.set(KEY_BALANCE, &state.balance.to_string())?;
    store.set(KEY_LEVEL, &state.level.value().to_string())?;
    store.set(KEY_TIME_LEFT, &state.energy_remaining.to_string())?;
    store.set(KEY_TASKS, &tasks)?;
    store.set(KEY_MONTHLY_EXPENSE, &state.params.monthly_expense.to_string())?;
    store.set(KEY_WORK_HOURS, &state.params.work_hours.to_string())?;
    store.set(KEY_RESET_TIME, &state.params.reset_time.to_string())?;
    if let Some(at) = state.last_update {
        store.set(KEY_LAST_UPDATE, &at.timestamp_millis().to_string())?;
    }
    Ok(())
}

/// Load the decay anchor, if both halves are present and readable.
pub fn load_anchor<S: KvStore + ?Sized>(store: &S) -> Option<DecayAnchor> {
    let balance = read(store, KEY_ANCHOR_BALANCE, parse_amount)?;
    let at = read(store, KEY_ANCHOR_AT, parse_epoch_ms)?;
    Some(DecayAnchor::new(balance, at))
}

pub fn save_anchor<S: KvStore + ?Sized>(store: &mut S, anchor: &DecayAnchor) -> Result<(), StoreError> {
    store.set(KEY_ANCHOR_BALANCE, &anchor.balance.to_string())?;
    store.set(KEY_ANCHOR_AT, &anchor.at.timestamp_millis().to_string())
}

fn read<S, T>(store: &S, key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T>
where
    S: KvStore + ?Sized,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("reading '{key}' failed, using default: {e}");
            return None;
        }
    };
    let parsed = parse(&raw);
    if parsed.is_none() {
        log::warn!("stored '{key}' is corrupt ({raw:?}), using default");
    }
    parsed
}

fn parse_amount(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

fn parse_work_hours(raw: &str) -> Option<f64> {
    parse_amount(raw).filter(|v| *v <= MAX_WORK_HOURS)
}

fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    // Tolerate integral floats such as "28800.0".
    let v: f64 = raw.parse().ok()?;
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
}

fn parse_level(raw: &str) -> Option<LevelCounter> {
    parse_count(raw).and_then(LevelCounter::from_value)
}

fn parse_tasks(raw: &str) -> Option<TaskTracker> {
    serde_json::from_str::<Vec<Task>>(raw).ok().map(TaskTracker::from)
}

fn parse_epoch_ms(raw: &str) -> Option<DateTime<Utc>> {
    let ms: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp_millis(ms)
}
