//! Queue statistics.

use serde::{Deserialize, Serialize};

/// Per-status job counts for one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Queue name.
    pub queue: String,
    /// Jobs ready for a worker.
    pub pending: u64,
    /// Jobs waiting for their run time.
    pub delayed: u64,
    /// Jobs currently executing.
    pub running: u64,
    /// Jobs completed and still retained.
    pub completed: u64,
    /// Jobs that exhausted their attempts.
    pub failed: u64,
    /// Recurring registrations.
    pub recurring: u64,
}

impl QueueStats {
    /// Total number of job records (recurring registrations excluded).
    pub fn total(&self) -> u64 {
        self.pending + self.delayed + self.running + self.completed + self.failed
    }
}
