//! # Lifedash Core Library
//!
//! Temporal state engine for a personal "life resource" dashboard. A money
//! balance drains continuously at the configured monthly expense, a daily
//! work window yields an energy countdown, and deadline tasks count down and
//! award a level when completed before they expire.
//!
//! ## Architecture
//!
//! - **Engine**: [`LifeEngine`] owns the state. The caller invokes `tick()`
//!   on a fixed cadence and forwards user operations in between
//! - **Driver**: [`driver::run`] is that cadence as a `tokio` loop
//! - **Storage**: string key-value snapshots behind [`KvStore`], SQLite by
//!   default, plus TOML host configuration
//! - **Catch-up**: time spent offline is charged to the balance on start
//!
//! ## Key Components
//!
//! - [`LifeEngine`]: tick, parameter edits, task operations
//! - [`SimulationState`]: the persisted aggregate
//! - [`Database`]: SQLite key-value store
//! - [`Config`]: application configuration

pub mod balance;
pub mod catchup;
pub mod clock;
pub mod config;
pub mod driver;
pub mod energy;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod level;
pub mod params;
pub mod state;
pub mod storage;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{LifeEngine, StateSnapshot, TaskView};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use level::LevelCounter;
pub use params::{ParameterUpdate, Parameters, ResetTime};
pub use state::SimulationState;
pub use storage::{Database, KvStore, MemoryStore};
pub use task::{Task, TaskId, TaskTracker};

/// Open the database named by `config` inside the data directory.
///
/// # Errors
/// Returns an error if the data directory cannot be created or the
/// database cannot be opened.
pub fn open_database(config: &Config) -> Result<Database, StoreError> {
    let dir = storage::data_dir()?;
    Database::open(config.database_path(&dir))
}
