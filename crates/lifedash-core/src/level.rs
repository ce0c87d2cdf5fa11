use serde::{Deserialize, Serialize};

/// Monotonic progress counter, bumped once per completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelCounter(u64);

impl LevelCounter {
    pub const START: u64 = 1;

    pub fn new() -> Self {
        Self(Self::START)
    }

    /// Restore a persisted level. Values below [`Self::START`] are rejected.
    pub fn from_value(value: u64) -> Option<Self> {
        (value >= Self::START).then_some(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the new level.
    pub fn increment(&mut self) -> u64 {
        self.0 = self.0.saturating_add(1);
        self.0
    }
}

impl Default for LevelCounter {
    fn default() -> Self {
        Self::new()
    }
}
