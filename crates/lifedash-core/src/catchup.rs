//! One-shot reconciliation for time spent offline.
//!
//! The current expense rate is applied flat across the whole gap; there is
//! no history of rate changes to replay. When the persisted decay anchor
//! still accounts for the stored balance, decay continues from the anchor
//! so that restarting does not round the balance to cents each time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::{apply_decay, elapsed_secs, DecayAnchor};
use crate::state::SimulationState;

/// What a catch-up changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchUp {
    pub offline_secs: f64,
    pub balance_before: f64,
    pub balance_after: f64,
}

/// Apply decay for the interval since `state.last_update`.
///
/// On the very first run (`last_update` absent) only the timestamp is
/// initialised and `None` is returned.
pub fn catch_up(state: &mut SimulationState, now: DateTime<Utc>) -> Option<CatchUp> {
    let Some(last) = state.last_update else {
        state.mark_updated(now);
        log::info!("first run: no offline interval to reconcile");
        return None;
    };

    let offline_secs = elapsed_secs(last, now);
    let balance_before = state.balance;
    state.balance = apply_decay(state.balance, state.params.monthly_expense, offline_secs);
    state.mark_updated(now);

    log::info!(
        "caught up {offline_secs:.0}s offline: balance {balance_before:.2} -> {:.2}",
        state.balance
    );
    Some(CatchUp {
        offline_secs,
        balance_before,
        balance_after: state.balance,
    })
}

/// Reconcile the offline interval and pick the anchor to keep decaying from.
///
/// A stored `anchor` is reused when it predates the last update and
/// reproduces the stored balance at that instant; the balance is then read
/// off the anchor at `now`. Otherwise this is [`catch_up`] followed by a
/// fresh anchor at `now`.
pub fn resume(
    state: &mut SimulationState,
    anchor: Option<DecayAnchor>,
    now: DateTime<Utc>,
) -> (Option<CatchUp>, DecayAnchor) {
    let Some(last) = state.last_update else {
        let report = catch_up(state, now);
        return (report, DecayAnchor::new(state.balance, now));
    };

    let expense = state.params.monthly_expense;
    let consistent = |a: &DecayAnchor| {
        a.at <= last && last <= now && (a.balance_at(expense, last) - state.balance).abs() < 0.005
    };
    let Some(anchor) = anchor.filter(consistent) else {
        if anchor.is_some() {
            log::warn!("stored decay anchor does not match the stored balance, re-anchoring");
        }
        let report = catch_up(state, now);
        return (report, DecayAnchor::new(state.balance, now));
    };

    let offline_secs = elapsed_secs(last, now);
    let balance_before = state.balance;
    state.balance = anchor.balance_at(expense, now);
    state.mark_updated(now);

    log::info!(
        "caught up {offline_secs:.0}s offline from anchor: balance {balance_before:.2} -> {:.2}",
        state.balance
    );
    let report = CatchUp {
        offline_secs,
        balance_before,
        balance_after: state.balance,
    };
    (Some(report), anchor)
}
