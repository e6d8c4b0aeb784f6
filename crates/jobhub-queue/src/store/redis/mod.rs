//! Redis-backed job store.
//!
//! Key layout, all under `{prefix}{queue}:`:
//!
//! | Key | Type | Content |
//! |---|---|---|
//! | `job:{id}` | string | JSON [`JobRecord`] |
//! | `jobs` | set | every job id stored in the queue |
//! | `names` | set | job names that have a pending zset |
//! | `pending:{name}` | zset | ready job ids, scored by priority then run time |
//! | `delayed` | zset | delayed job ids, scored by run time (ms) |
//! | `active` / `complete` / `failed` | set | job ids by state |
//! | `recurring` | hash | registration id to JSON [`RecurringEntry`] |
//!
//! Keys are only ever addressed exactly, through the `jobs` and `names`
//! indexes, never by pattern.

pub mod client;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::debug;

use jobhub_core::JobId;
use jobhub_entity::{JobRecord, JobStatus, QueueStats, RecurringEntry, RemoveQuery};

use super::JobStore;
use crate::error::BackendResult;

pub use client::RedisClient;

const PRIORITY_BAND: f64 = 1e13;

/// Job id sets by state.
const STATE_SETS: [&str; 3] = ["active", "complete", "failed"];

/// Key builder for one queue.
#[derive(Debug, Clone, Copy)]
struct QueueKeys<'a> {
    prefix: &'a str,
    queue: &'a str,
}

impl<'a> QueueKeys<'a> {
    fn new(prefix: &'a str, queue: &'a str) -> Self {
        Self { prefix, queue }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}:{suffix}", self.prefix, self.queue)
    }

    fn job(&self, id: &str) -> String {
        self.key(&format!("job:{id}"))
    }

    fn pending(&self, name: &str) -> String {
        self.key(&format!("pending:{name}"))
    }

    /// Every key the queue owns, given the contents of its indexes.
    fn owned<I, N>(&self, ids: I, names: N) -> Vec<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        let mut keys: Vec<String> = ids.into_iter().map(|id| self.job(id.as_ref())).collect();
        keys.extend(names.into_iter().map(|name| self.pending(name.as_ref())));
        keys.extend(
            ["jobs", "names", "delayed", "recurring"]
                .into_iter()
                .chain(STATE_SETS)
                .map(|suffix| self.key(suffix)),
        );
        keys
    }
}

/// Durable store shared by every process pointing at the same Redis.
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Create a store on an existing client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn keys<'a>(&'a self, queue: &'a str) -> QueueKeys<'a> {
        QueueKeys::new(self.client.key_prefix(), queue)
    }

    /// Lower scores pop first: more urgent priorities occupy lower bands.
    fn pending_score(record: &JobRecord) -> f64 {
        let band = f64::from(10 - record.job.options.priority.numeric_priority());
        band * PRIORITY_BAND + record.run_at.timestamp_millis() as f64
    }

    async fn load(&self, queue: &str, id: &str) -> BackendResult<Option<JobRecord>> {
        let mut conn = self.client.conn_mut();
        let raw: Option<String> = conn.get(self.keys(queue).job(id)).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    async fn save(&self, record: &JobRecord) -> BackendResult<()> {
        let keys = self.keys(&record.job.queue);
        let id = record.id().to_string();
        let json = serde_json::to_string(record)?;
        let mut conn = self.client.conn_mut();

        let _: () = conn.set(keys.job(&id), json).await?;
        let _: () = conn.sadd(keys.key("jobs"), &id).await?;
        let _: () = conn.srem(keys.key("active"), &id).await?;

        match record.status {
            JobStatus::Pending => {
                let _: () = conn.sadd(keys.key("names"), record.name()).await?;
                let _: () = conn
                    .zadd(keys.pending(record.name()), &id, Self::pending_score(record))
                    .await?;
            }
            JobStatus::Delayed => {
                let _: () = conn
                    .zadd(keys.key("delayed"), &id, record.run_at.timestamp_millis())
                    .await?;
            }
            JobStatus::Running => {
                let _: () = conn.sadd(keys.key("active"), &id).await?;
            }
            JobStatus::Completed => {
                let _: () = conn.sadd(keys.key("complete"), &id).await?;
            }
            JobStatus::Failed => {
                let _: () = conn.sadd(keys.key("failed"), &id).await?;
            }
        }
        Ok(())
    }

    /// Move delayed jobs whose run time has passed into their pending set.
    ///
    /// `ZREM` decides ownership, so concurrent promoters never double-enqueue.
    async fn promote_due(&self, queue: &str) -> BackendResult<()> {
        let delayed_key = self.keys(queue).key("delayed");
        let mut conn = self.client.conn_mut();
        let due: Vec<String> = conn
            .zrangebyscore(&delayed_key, "-inf", Utc::now().timestamp_millis())
            .await?;

        for id in due {
            let owned: i64 = conn.zrem(&delayed_key, &id).await?;
            if owned == 0 {
                continue;
            }
            if let Some(mut record) = self.load(queue, &id).await? {
                record.status = JobStatus::Pending;
                self.save(&record).await?;
                debug!(job_id = %id, queue, "Promoted delayed job");
            }
        }
        Ok(())
    }

    async fn job_ids(&self, queue: &str) -> BackendResult<Vec<String>> {
        let mut conn = self.client.conn_mut();
        let ids: Vec<String> = conn.smembers(self.keys(queue).key("jobs")).await?;
        Ok(ids)
    }

    async fn job_names(&self, queue: &str) -> BackendResult<Vec<String>> {
        let mut conn = self.client.conn_mut();
        let names: Vec<String> = conn.smembers(self.keys(queue).key("names")).await?;
        Ok(names)
    }
}

#[async_trait]
impl JobStore for RedisStore {
    async fn insert(&self, record: JobRecord) -> BackendResult<()> {
        self.save(&record).await
    }

    async fn claim_next(&self, queue: &str, name: &str) -> BackendResult<Option<JobRecord>> {
        self.promote_due(queue).await?;

        let pending_key = self.keys(queue).pending(name);
        let mut conn = self.client.conn_mut();
        loop {
            // [member, score] or empty
            let popped: Vec<String> = redis::cmd("ZPOPMIN")
                .arg(&pending_key)
                .arg(1)
                .query_async(&mut conn)
                .await?;
            let Some(id) = popped.into_iter().next() else {
                return Ok(None);
            };

            // Removed after being queued: skip the dangling id.
            let Some(mut record) = self.load(queue, &id).await? else {
                continue;
            };
            record.mark_running();
            self.save(&record).await?;
            return Ok(Some(record));
        }
    }

    async fn update(&self, record: &JobRecord) -> BackendResult<()> {
        let mut conn = self.client.conn_mut();
        let exists: bool = conn
            .exists(self.keys(&record.job.queue).job(&record.id().to_string()))
            .await?;
        if !exists {
            return Ok(());
        }
        self.save(record).await
    }

    async fn get(&self, queue: &str, id: JobId) -> BackendResult<Option<JobRecord>> {
        self.load(queue, &id.to_string()).await
    }

    async fn delete(&self, queue: &str, id: JobId) -> BackendResult<bool> {
        let Some(record) = self.get(queue, id).await? else {
            return Ok(false);
        };
        let keys = self.keys(queue);
        let member = id.to_string();
        let mut conn = self.client.conn_mut();

        let _: () = conn.del(keys.job(&member)).await?;
        let _: () = conn.srem(keys.key("jobs"), &member).await?;
        let _: () = conn.zrem(keys.pending(record.name()), &member).await?;
        let _: () = conn.zrem(keys.key("delayed"), &member).await?;
        for set in STATE_SETS {
            let _: () = conn.srem(keys.key(set), &member).await?;
        }
        Ok(true)
    }

    async fn delete_matching(&self, queue: &str, query: &RemoveQuery) -> BackendResult<u64> {
        let mut removed = 0u64;

        for id in self.job_ids(queue).await? {
            let Some(record) = self.load(queue, &id).await? else {
                continue;
            };
            if query.matches(&record.job) && self.delete(queue, record.id()).await? {
                removed += 1;
            }
        }

        debug!(queue, removed, "Deleted matching job records");
        Ok(removed)
    }

    async fn save_recurring(&self, entry: &RecurringEntry) -> BackendResult<()> {
        let json = serde_json::to_string(entry)?;
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .hset(
                self.keys(&entry.job.queue).key("recurring"),
                entry.id().to_string(),
                json,
            )
            .await?;
        Ok(())
    }

    async fn delete_recurring(&self, queue: &str, id: JobId) -> BackendResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = conn
            .hdel(self.keys(queue).key("recurring"), id.to_string())
            .await?;
        Ok(removed > 0)
    }

    async fn list_recurring(&self, queue: &str) -> BackendResult<Vec<RecurringEntry>> {
        let mut conn = self.client.conn_mut();
        let raw: Vec<String> = conn.hvals(self.keys(queue).key("recurring")).await?;
        let mut entries = raw
            .iter()
            .map(|json| serde_json::from_str::<RecurringEntry>(json))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn clear(&self, queue: &str) -> BackendResult<u64> {
        let ids = self.job_ids(queue).await?;
        let names = self.job_names(queue).await?;
        let keys = self.keys(queue);
        let mut conn = self.client.conn_mut();
        let recurring: u64 = conn.hlen(keys.key("recurring")).await?;

        let owned = keys.owned(&ids, &names);
        let _: () = conn.del(&owned).await?;

        debug!(queue, keys = owned.len(), "Cleared queue keys");
        Ok(ids.len() as u64 + recurring)
    }

    async fn stats(&self, queue: &str) -> BackendResult<QueueStats> {
        let keys = self.keys(queue);
        let mut conn = self.client.conn_mut();

        let mut pending = 0u64;
        for name in self.job_names(queue).await? {
            let count: u64 = conn.zcard(keys.pending(&name)).await?;
            pending += count;
        }

        Ok(QueueStats {
            queue: queue.to_string(),
            pending,
            delayed: conn.zcard(keys.key("delayed")).await?,
            running: conn.scard(keys.key("active")).await?,
            completed: conn.scard(keys.key("complete")).await?,
            failed: conn.scard(keys.key("failed")).await?,
            recurring: conn.hlen(keys.key("recurring")).await?,
        })
    }
}
