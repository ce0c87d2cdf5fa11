use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::Parameters;
use crate::task::{Task, TaskId};

/// Every state change the engine makes produces an Event.
/// Hosts print or forward them; the state itself stays authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Startup reconciliation for time spent offline.
    CatchUpApplied {
        offline_secs: f64,
        balance_before: f64,
        balance_after: f64,
        at: DateTime<Utc>,
    },
    TaskAdded {
        task: Task,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task: Task,
        at: DateTime<Utc>,
    },
    TaskDeleted {
        task: Task,
        at: DateTime<Utc>,
    },
    /// A task's deadline passed on this tick. The task is kept.
    TaskExpired {
        id: TaskId,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u64,
        at: DateTime<Utc>,
    },
    ParametersChanged {
        params: Parameters,
        balance: f64,
        at: DateTime<Utc>,
    },
    /// The balance reached zero on this tick.
    BalanceDepleted {
        at: DateTime<Utc>,
    },
}
