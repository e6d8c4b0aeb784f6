//! Recurring job registration.

use chrono::{DateTime, Utc};
use jobhub_core::JobId;
use serde::{Deserialize, Serialize};

use super::model::BackendJob;

/// A job template re-enqueued on a repeating schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringEntry {
    /// Cron expression or human interval such as `"5 minutes"`.
    pub expression: String,
    /// Template job; every occurrence is a copy under a new id.
    pub job: BackendJob,
    /// When the registration was created.
    pub created_at: DateTime<Utc>,
}

impl RecurringEntry {
    /// Create a registration.
    pub fn new(expression: impl Into<String>, job: BackendJob) -> Self {
        Self {
            expression: expression.into(),
            job,
            created_at: Utc::now(),
        }
    }

    /// Registration id (the template job's id).
    pub fn id(&self) -> JobId {
        self.job.id
    }

    /// Uniqueness key, if the template carries one.
    pub fn unique(&self) -> Option<&str> {
        self.job.options.unique.as_deref()
    }
}
