//! Engine facade tying the temporal rules together.
//!
//! The engine owns the [`SimulationState`] exclusively. It has no internal
//! thread: a host calls [`LifeEngine::tick`] on a fixed cadence (see
//! [`crate::driver`]) and forwards user operations in between, on the same
//! execution context.
//!
//! ## Tick order
//!
//! ```text
//! now -> work window/energy -> balance decay -> task refresh -> persist
//! ```
//!
//! Every user operation first reconciles the state to `now` the same way,
//! then applies its change, then flushes a full snapshot.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::{round_cents, DecayAnchor};
use crate::catchup::resume;
use crate::clock::Clock;
use crate::energy::{energy_progress_pct, resolve, WorkWindow};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::format::{format_energy, RemainingLabel};
use crate::params::{ParameterUpdate, Parameters};
use crate::state::SimulationState;
use crate::storage::persist::{load_anchor, load_state, save_anchor, save_state};
use crate::storage::KvStore;
use crate::task::{parse_deadline, validate_name, Task, TaskId, TaskTracker};

pub struct LifeEngine<S: KvStore> {
    store: S,
    clock: Box<dyn Clock>,
    state: SimulationState,
    anchor: DecayAnchor,
    window: WorkWindow,
    ticks: u64,
    flush_on_tick: bool,
    pending: Vec<Event>,
}

impl<S: KvStore> LifeEngine<S> {
    /// Load persisted state, reconcile the offline interval, and run the
    /// eager first tick.
    ///
    /// Never fails: unreadable values fall back to defaults and a failed
    /// first write is logged, to be retried by the next tick.
    pub fn start(store: S, clock: impl Clock + 'static) -> Self {
        let mut state = load_state(&store);
        let now = clock.now();
        let now_utc = now.with_timezone(&Utc);

        let mut pending = Vec::new();
        let (report, anchor) = resume(&mut state, load_anchor(&store), now_utc);
        if let Some(report) = report {
            pending.push(Event::CatchUpApplied {
                offline_secs: report.offline_secs,
                balance_before: report.balance_before,
                balance_after: report.balance_after,
                at: now_utc,
            });
        }

        let window = resolve(&now, state.params.reset_time, state.params.work_hours);
        let mut engine = Self {
            store,
            clock: Box::new(clock),
            state,
            anchor,
            window,
            ticks: 0,
            flush_on_tick: true,
            pending,
        };
        if let Err(e) = engine.tick() {
            log::warn!("initial snapshot write failed: {e}");
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current state as of the last tick or operation.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn window(&self) -> WorkWindow {
        self.window
    }

    pub fn params(&self) -> Parameters {
        self.state.params
    }

    /// Ticks run since [`Self::start`], including the eager one.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Take the events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    /// Host-facing view of the state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(&self.state, self.window, self.ticks)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// One periodic reconciliation followed by a snapshot write.
    ///
    /// The state is advanced even when the write fails; the error is
    /// returned so the driver can log it and keep ticking.
    pub fn tick(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.reconcile(now);
        self.ticks += 1;
        log::debug!(
            "tick {}: balance={:.2} energy={}s tasks={}",
            self.ticks,
            self.state.balance,
            self.state.energy_remaining,
            self.state.tasks.len()
        );
        if self.flush_on_tick {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// When disabled, ticks only update memory; operations still flush.
    pub fn set_flush_on_tick(&mut self, enabled: bool) {
        self.flush_on_tick = enabled;
    }

    /// Apply a partial parameter edit, all-or-nothing.
    pub fn set_parameters(&mut self, update: ParameterUpdate) -> Result<()> {
        update.validate()?;
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        self.reconcile(now);

        let params = &mut self.state.params;
        if let Some(v) = update.monthly_expense {
            params.monthly_expense = v;
        }
        if let Some(v) = update.work_hours {
            params.work_hours = v;
        }
        if let Some(v) = update.reset_time {
            params.reset_time = v;
        }
        if let Some(v) = update.balance {
            self.state.balance = round_cents(v);
        }
        // Decay restarts from here under the (possibly new) rate.
        self.anchor = DecayAnchor::new(self.state.balance, now_utc);
        self.refresh_window(&now);

        log::info!(
            "parameters changed: expense={} hours={} reset={} balance={:.2}",
            self.state.params.monthly_expense,
            self.state.params.work_hours,
            self.state.params.reset_time,
            self.state.balance
        );
        self.pending.push(Event::ParametersChanged {
            params: self.state.params,
            balance: self.state.balance,
            at: now_utc,
        });
        self.flush()
    }

    /// Parse `deadline` and append a task.
    pub fn add_task(&mut self, name: &str, deadline: &str) -> Result<Task> {
        // Checked before reconciling so a rejected add leaves no trace.
        validate_name(name)?;
        parse_deadline(deadline)?;
        self.insert_task(|tasks, now| tasks.add(name, deadline, now))
    }

    /// Append a task with an already-resolved deadline.
    pub fn add_task_at(&mut self, name: &str, deadline: DateTime<Utc>) -> Result<Task> {
        validate_name(name)?;
        self.insert_task(|tasks, now| tasks.add_at(name, deadline, now))
    }

    /// Complete a live task and level up.
    ///
    /// Unknown ids are a no-op returning `Ok(None)`. Tasks whose deadline
    /// has passed cannot be completed, only deleted.
    pub fn complete_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        match self.state.tasks.get(id) {
            None => return Ok(None),
            Some(task) if task.deadline <= now_utc => {
                return Err(ValidationError::TaskExpired { id }.into());
            }
            Some(_) => {}
        }
        self.reconcile(now);

        let Some(task) = self.state.tasks.complete(id, &mut self.state.level) else {
            return Ok(None);
        };
        let level = self.state.level.value();
        log::info!("task {id} completed, level {level}");
        self.pending.push(Event::TaskCompleted {
            task: task.clone(),
            at: now_utc,
        });
        self.pending.push(Event::LevelUp { level, at: now_utc });
        self.flush()?;
        Ok(Some(task))
    }

    /// Remove a task, expired or not, without levelling up.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        if self.state.tasks.get(id).is_none() {
            return Ok(None);
        }
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        self.reconcile(now);

        let task = self.state.tasks.delete(id);
        if let Some(task) = &task {
            log::info!("task {id} deleted");
            self.pending.push(Event::TaskDeleted {
                task: task.clone(),
                at: now_utc,
            });
        }
        self.flush()?;
        Ok(task)
    }

    /// Write the full state and the decay anchor to the store.
    pub fn flush(&mut self) -> Result<()> {
        save_state(&mut self.store, &self.state)?;
        save_anchor(&mut self.store, &self.anchor)?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Bring energy, balance, and task timers up to `now`.
    fn reconcile(&mut self, now: DateTime<Local>) {
        let now_utc = now.with_timezone(&Utc);

        self.refresh_window(&now);

        let before = self.state.balance;
        self.state.balance = self.anchor.balance_at(self.state.params.monthly_expense, now_utc);
        if before > 0.0 && self.state.balance == 0.0 {
            log::info!("balance depleted");
            self.pending.push(Event::BalanceDepleted { at: now_utc });
        }

        for id in self.state.tasks.refresh(now_utc) {
            self.pending.push(Event::TaskExpired { id, at: now_utc });
        }

        self.state.mark_updated(now_utc);
    }

    fn insert_task(
        &mut self,
        add: impl FnOnce(&mut TaskTracker, DateTime<Utc>) -> std::result::Result<Task, ValidationError>,
    ) -> Result<Task> {
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        self.reconcile(now);

        let task = add(&mut self.state.tasks, now_utc)?;
        log::info!("task {} added: {:?}", task.id, task.name);
        self.pending.push(Event::TaskAdded {
            task: task.clone(),
            at: now_utc,
        });
        self.flush()?;
        Ok(task)
    }

    fn refresh_window(&mut self, now: &DateTime<Local>) {
        self.window = resolve(now, self.state.params.reset_time, self.state.params.work_hours);
        self.state.energy_remaining = self.window.energy_remaining;
    }
}

/// A task with its display helpers resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub label: RemainingLabel,
    pub completable: bool,
}

/// Everything a host needs to render the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub balance: f64,
    pub level: u64,
    pub energy_remaining: u64,
    pub energy_label: String,
    pub energy_pct: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub window_active: bool,
    #[serde(flatten)]
    pub params: Parameters,
    /// Expense per day at the current rate.
    pub daily_burn: f64,
    pub tasks: Vec<TaskView>,
    pub last_update: Option<DateTime<Utc>>,
    pub ticks: u64,
}

impl StateSnapshot {
    fn new(state: &SimulationState, window: WorkWindow, ticks: u64) -> Self {
        let tasks = state
            .tasks
            .tasks()
            .iter()
            .map(|t| TaskView {
                task: t.clone(),
                label: RemainingLabel::from_ms(t.remaining_time),
                completable: t.is_completable(),
            })
            .collect();
        Self {
            balance: state.balance,
            level: state.level.value(),
            energy_remaining: state.energy_remaining,
            energy_label: format_energy(state.energy_remaining),
            energy_pct: energy_progress_pct(state.energy_remaining, state.params.work_hours),
            window_start: window.start,
            window_end: window.end,
            window_active: window.is_active(),
            params: state.params,
            daily_burn: round_cents(state.params.monthly_expense / 30.0),
            tasks,
            last_update: state.last_update,
            ticks,
        }
    }
}
