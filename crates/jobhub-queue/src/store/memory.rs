//! Process-local job store using [`DashMap`].

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use jobhub_core::JobId;
use jobhub_entity::{JobRecord, JobStatus, QueueStats, RecurringEntry, RemoveQuery};

use super::JobStore;
use crate::error::BackendResult;

/// In-memory store. Jobs do not survive a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<JobId, JobRecord>>,
    recurring: Arc<DashMap<JobId, RecurringEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_candidate(&self, queue: &str, name: &str) -> Option<JobId> {
        let now = Utc::now();
        self.records
            .iter()
            .filter(|r| r.job.queue == queue && r.name() == name && r.is_ready(now))
            .min_by_key(|r| {
                (
                    Reverse(r.job.options.priority.numeric_priority()),
                    r.run_at,
                    r.created_at,
                    r.id(),
                )
            })
            .map(|r| r.id())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, record: JobRecord) -> BackendResult<()> {
        self.records.insert(record.id(), record);
        Ok(())
    }

    async fn claim_next(&self, queue: &str, name: &str) -> BackendResult<Option<JobRecord>> {
        // Another worker may claim the candidate between the scan and the
        // write lock, so re-check readiness under the lock and rescan.
        while let Some(id) = self.next_candidate(queue, name) {
            if let Some(mut record) = self.records.get_mut(&id) {
                if record.is_ready(Utc::now()) {
                    record.mark_running();
                    return Ok(Some(record.value().clone()));
                }
            }
        }
        Ok(None)
    }

    async fn update(&self, record: &JobRecord) -> BackendResult<()> {
        // A record removed while running stays removed.
        if let Some(mut existing) = self.records.get_mut(&record.id()) {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn get(&self, queue: &str, id: JobId) -> BackendResult<Option<JobRecord>> {
        Ok(self
            .records
            .get(&id)
            .filter(|r| r.job.queue == queue)
            .map(|r| r.value().clone()))
    }

    async fn delete(&self, queue: &str, id: JobId) -> BackendResult<bool> {
        Ok(self
            .records
            .remove_if(&id, |_, r| r.job.queue == queue)
            .is_some())
    }

    async fn delete_matching(&self, queue: &str, query: &RemoveQuery) -> BackendResult<u64> {
        let before = self.records.len();
        self.records
            .retain(|_, r| !(r.job.queue == queue && query.matches(&r.job)));
        let removed = before.saturating_sub(self.records.len()) as u64;
        debug!(queue, removed, "Deleted matching job records");
        Ok(removed)
    }

    async fn save_recurring(&self, entry: &RecurringEntry) -> BackendResult<()> {
        self.recurring.insert(entry.id(), entry.clone());
        Ok(())
    }

    async fn delete_recurring(&self, queue: &str, id: JobId) -> BackendResult<bool> {
        Ok(self
            .recurring
            .remove_if(&id, |_, e| e.job.queue == queue)
            .is_some())
    }

    async fn list_recurring(&self, queue: &str) -> BackendResult<Vec<RecurringEntry>> {
        let mut entries: Vec<RecurringEntry> = self
            .recurring
            .iter()
            .filter(|e| e.job.queue == queue)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn clear(&self, queue: &str) -> BackendResult<u64> {
        let before = self.records.len() + self.recurring.len();
        self.records.retain(|_, r| r.job.queue != queue);
        self.recurring.retain(|_, e| e.job.queue != queue);
        let after = self.records.len() + self.recurring.len();
        Ok(before.saturating_sub(after) as u64)
    }

    async fn stats(&self, queue: &str) -> BackendResult<QueueStats> {
        let now = Utc::now();
        let mut stats = QueueStats {
            queue: queue.to_string(),
            ..QueueStats::default()
        };

        for record in self.records.iter().filter(|r| r.job.queue == queue) {
            match record.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Delayed if record.run_at <= now => stats.pending += 1,
                JobStatus::Delayed => stats.delayed += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats.recurring = self
            .recurring
            .iter()
            .filter(|e| e.job.queue == queue)
            .count() as u64;

        Ok(stats)
    }
}
