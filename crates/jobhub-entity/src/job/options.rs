//! Per-job delivery options.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::status::JobPriority;

/// Delay strategy between attempts of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backoff {
    /// Wait the same delay before every retry.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Double the delay after every failed attempt.
    Exponential {
        /// Base delay in milliseconds.
        delay_ms: u64,
    },
}

impl Backoff {
    /// Delay before the retry following `attempt` (1-based) failed attempts.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { delay_ms } => {
                let exp = attempt.saturating_sub(1).min(16);
                Duration::from_millis(delay_ms.saturating_mul(1u64 << exp))
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Fixed { delay_ms } => format!("fixed:{delay_ms}"),
            Self::Exponential { delay_ms } => format!("exponential:{delay_ms}"),
        }
    }
}

/// Optional delivery settings an application job may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Queue priority.
    #[serde(default)]
    pub priority: JobPriority,
    /// Maximum execution attempts (at least 1).
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Maximum run time per attempt, in milliseconds.
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Delay strategy between attempts.
    #[serde(default)]
    pub backoff: Option<Backoff>,
    /// Uniqueness key. A recurring registration replaces any previous one
    /// with the same key.
    #[serde(default)]
    pub unique: Option<String>,
    /// Drop the job record once it completes.
    #[serde(default)]
    pub remove_on_complete: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: JobPriority::default(),
            attempts: default_attempts(),
            ttl_ms: None,
            backoff: None,
            unique: None,
            remove_on_complete: false,
        }
    }
}

impl JobOptions {
    /// Set the priority.
    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the maximum number of attempts (clamped to at least 1).
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Set the per-attempt time limit.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = Some(ttl.as_millis() as u64);
        self
    }

    /// Set the retry backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Set the uniqueness key.
    pub fn with_unique(mut self, key: impl Into<String>) -> Self {
        self.unique = Some(key.into());
        self
    }

    /// Drop the record on completion.
    pub fn remove_on_complete(mut self, remove: bool) -> Self {
        self.remove_on_complete = remove;
        self
    }

    /// Per-attempt time limit as a [`Duration`].
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }

    /// Delay before the next attempt after `attempt` failures.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff
            .map(|b| b.delay_for(attempt))
            .unwrap_or(Duration::ZERO)
    }

    /// Flatten options into descriptor metadata.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("priority".to_string(), self.priority.to_string());
        metadata.insert("attempts".to_string(), self.attempts.to_string());
        if let Some(ttl) = self.ttl_ms {
            metadata.insert("ttl".to_string(), ttl.to_string());
        }
        if let Some(backoff) = &self.backoff {
            metadata.insert("backoff".to_string(), backoff.describe());
        }
        if let Some(unique) = &self.unique {
            metadata.insert("unique".to_string(), unique.clone());
        }
        if self.remove_on_complete {
            metadata.insert("remove_on_complete".to_string(), "true".to_string());
        }
        metadata
    }
}

fn default_attempts() -> u32 {
    1
}
