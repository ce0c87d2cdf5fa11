//! Periodic driver.
//!
//! Runs ticks and user commands on a single task so they can never
//! interleave. Hosts talk to the loop through an [`EngineHandle`]; stopping
//! the loop just stops the interval, there is nothing in flight to cancel.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::{LifeEngine, StateSnapshot};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::params::ParameterUpdate;
use crate::storage::KvStore;
use crate::task::{Task, TaskId};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A user operation forwarded into the loop.
pub enum Command {
    GetState {
        reply: oneshot::Sender<StateSnapshot>,
    },
    SetParameters {
        update: ParameterUpdate,
        reply: oneshot::Sender<Result<()>>,
    },
    AddTask {
        name: String,
        deadline: String,
        reply: oneshot::Sender<Result<Task>>,
    },
    CompleteTask {
        id: TaskId,
        reply: oneshot::Sender<Result<Option<Task>>>,
    },
    DeleteTask {
        id: TaskId,
        reply: oneshot::Sender<Result<Option<Task>>>,
    },
}

/// Client side of the command channel.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

/// Create a handle and the receiver to pass to [`run`].
pub fn channel(buffer: usize) -> (EngineHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EngineHandle { tx }, rx)
}

impl EngineHandle {
    pub async fn get_state(&self) -> Result<StateSnapshot> {
        self.request(|reply| Command::GetState { reply }).await
    }

    pub async fn set_parameters(&self, update: ParameterUpdate) -> Result<()> {
        self.request(|reply| Command::SetParameters { update, reply }).await?
    }

    pub async fn add_task(&self, name: impl Into<String>, deadline: impl Into<String>) -> Result<Task> {
        let (name, deadline) = (name.into(), deadline.into());
        self.request(|reply| Command::AddTask { name, deadline, reply }).await?
    }

    pub async fn complete_task(&self, id: TaskId) -> Result<Option<Task>> {
        self.request(|reply| Command::CompleteTask { id, reply }).await?
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<Option<Task>> {
        self.request(|reply| Command::DeleteTask { id, reply }).await?
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CoreError::DriverStopped)?;
        rx.await.map_err(|_| CoreError::DriverStopped)
    }
}

/// Loop settings.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub period: Duration,
    /// Stop after this many periodic ticks (the eager start-up tick is not counted).
    pub max_ticks: Option<u64>,
    /// Write a snapshot on every tick. When off, the state is written on
    /// operations and once when the loop stops.
    pub snapshot_every_tick: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            period: DEFAULT_TICK_INTERVAL,
            max_ticks: None,
            snapshot_every_tick: true,
        }
    }
}

/// Drive `engine` until shutdown is signalled, the command channel closes,
/// or `max_ticks` is reached. Returns the engine for inspection.
///
/// Events are handed to `on_events` after every tick or command.
pub async fn run<S: KvStore>(
    mut engine: LifeEngine<S>,
    options: RunOptions,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: watch::Receiver<bool>,
    mut on_events: impl FnMut(Vec<Event>),
) -> LifeEngine<S> {
    engine.set_flush_on_tick(options.snapshot_every_tick);
    let mut ticker = interval(options.period);
    // A stalled host resumes at the normal cadence; decay is elapsed-time based.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick fires immediately; start() already ticked.
    ticker.tick().await;

    let mut periodic_ticks = 0u64;
    on_events(engine.drain_events());

    loop {
        if options.max_ticks.is_some_and(|max| periodic_ticks >= max) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                periodic_ticks += 1;
                if let Err(e) = engine.tick() {
                    log::warn!("tick {} failed: {e}", engine.tick_count());
                }
            }
            cmd = commands.recv() => match cmd {
                Some(cmd) => dispatch(&mut engine, cmd),
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
        let events = engine.drain_events();
        if !events.is_empty() {
            on_events(events);
        }
    }

    if !options.snapshot_every_tick {
        if let Err(e) = engine.flush() {
            log::warn!("final snapshot write failed: {e}");
        }
    }
    log::info!("driver stopped after {} ticks", engine.tick_count());
    engine
}

fn dispatch<S: KvStore>(engine: &mut LifeEngine<S>, cmd: Command) {
    // A dropped reply receiver means the caller gave up; the change stands.
    match cmd {
        Command::GetState { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        Command::SetParameters { update, reply } => {
            let _ = reply.send(engine.set_parameters(update));
        }
        Command::AddTask { name, deadline, reply } => {
            let _ = reply.send(engine.add_task(&name, &deadline));
        }
        Command::CompleteTask { id, reply } => {
            let _ = reply.send(engine.complete_task(id));
        }
        Command::DeleteTask { id, reply } => {
            let _ = reply.send(engine.delete_task(id));
        }
    }
}
