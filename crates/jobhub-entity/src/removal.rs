//! Job removal criteria and responses.

use jobhub_core::JobId;
use serde::{Deserialize, Serialize};

use crate::job::BackendJob;

/// What to remove from a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "lowercase")]
pub enum RemoveCriteria {
    /// A single job or recurring registration by id.
    Id {
        /// Identifier to remove.
        id: JobId,
    },
    /// A job instance previously returned by dispatch.
    Job {
        /// The job to remove.
        job: BackendJob,
    },
    /// Every job and registration matching a query.
    Query(RemoveQuery),
}

impl RemoveCriteria {
    /// Identifier targeted by this criteria, if it targets exactly one job.
    pub fn target_id(&self) -> Option<JobId> {
        match self {
            Self::Id { id } => Some(*id),
            Self::Job { job } => Some(job.id),
            Self::Query(_) => None,
        }
    }
}

impl From<JobId> for RemoveCriteria {
    fn from(id: JobId) -> Self {
        Self::Id { id }
    }
}

impl From<BackendJob> for RemoveCriteria {
    fn from(job: BackendJob) -> Self {
        Self::Job { job }
    }
}

impl From<&BackendJob> for RemoveCriteria {
    fn from(job: &BackendJob) -> Self {
        Self::Job { job: job.clone() }
    }
}

impl From<RemoveQuery> for RemoveCriteria {
    fn from(query: RemoveQuery) -> Self {
        Self::Query(query)
    }
}

/// Field filter for bulk removal. Unset fields match anything; a query with
/// no fields set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveQuery {
    /// Job name to match.
    #[serde(default)]
    pub name: Option<String>,
    /// Uniqueness key to match.
    #[serde(default)]
    pub unique: Option<String>,
}

impl RemoveQuery {
    /// Match jobs by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            unique: None,
        }
    }

    /// Match jobs by uniqueness key.
    pub fn by_unique(key: impl Into<String>) -> Self {
        Self {
            name: None,
            unique: Some(key.into()),
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.unique.is_none()
    }

    /// Whether `job` satisfies every set field.
    pub fn matches(&self, job: &BackendJob) -> bool {
        if self.is_empty() {
            return false;
        }
        let name_ok = self.name.as_deref().is_none_or(|n| n == job.name());
        let unique_ok = self
            .unique
            .as_deref()
            .is_none_or(|u| job.options.unique.as_deref() == Some(u));
        name_ok && unique_ok
    }
}

/// Backend response to a remove or clear request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalResponse {
    /// Number of jobs and registrations removed.
    pub removed: u64,
}

impl RemovalResponse {
    /// Response reporting `removed` entries.
    pub fn new(removed: u64) -> Self {
        Self { removed }
    }
}
