//! Continuous balance depletion.
//!
//! The burn rate is flat: `monthly_expense` spread over a 30-day month.
//! Decay is always computed from an elapsed duration, never accumulated
//! per tick, so repeated rounding cannot compound.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BALANCE: f64 = 10_000.0;

/// Seconds in the nominal 30-day month the burn rate is spread over.
pub const SECONDS_PER_MONTH: f64 = 30.0 * 86_400.0;

/// Per-second burn for a monthly expense.
pub fn burn_rate(monthly_expense: f64) -> f64 {
    monthly_expense / SECONDS_PER_MONTH
}

/// Balance after `elapsed_secs` of decay, clamped at zero and rounded to cents.
///
/// Negative elapsed time (clock moved backwards) is treated as zero.
pub fn apply_decay(balance: f64, monthly_expense: f64, elapsed_secs: f64) -> f64 {
    let elapsed = if elapsed_secs.is_finite() { elapsed_secs.max(0.0) } else { 0.0 };
    let burned = burn_rate(monthly_expense.max(0.0)) * elapsed;
    round_cents((balance - burned).max(0.0))
}

/// Round half away from zero to two decimals.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reference point the running balance is derived from.
///
/// Every tick recomputes the balance as `apply_decay(anchor.balance, rate,
/// now - anchor.at)`. The anchor moves whenever the balance is edited, the
/// expense rate changes, or offline catch-up runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayAnchor {
    pub balance: f64,
    pub at: DateTime<Utc>,
}

impl DecayAnchor {
    pub fn new(balance: f64, at: DateTime<Utc>) -> Self {
        Self { balance, at }
    }

    /// Balance at `now` under `monthly_expense`.
    pub fn balance_at(&self, monthly_expense: f64, now: DateTime<Utc>) -> f64 {
        apply_decay(self.balance, monthly_expense, elapsed_secs(self.at, now))
    }
}

/// Fractional seconds from `from` to `to`, never negative.
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let elapsed: Duration = to - from;
    (elapsed.num_milliseconds().max(0)) as f64 / 1000.0
}
