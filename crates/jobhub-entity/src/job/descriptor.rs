//! Backend-agnostic description of a unit of work.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalized representation of a job: handler name, payload, metadata.
///
/// Fields are private; a descriptor is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    name: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl JobDescriptor {
    /// Create a descriptor.
    pub fn new(
        name: impl Into<String>,
        payload: serde_json::Value,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            payload,
            metadata,
        }
    }

    /// Name identifying the handler for this job.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arbitrary job payload (`Null` when the job carries none).
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Metadata such as priority, attempts and TTL, flattened to strings.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
