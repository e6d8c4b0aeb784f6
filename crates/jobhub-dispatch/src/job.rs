//! Application-level job definitions.

use serde::Serialize;
use serde_json::Value;

use jobhub_entity::JobOptions;

/// Anything the application wants run in the background.
///
/// Only [`name`](AppJob::name) is required; it selects the handler.
pub trait AppJob: Send + Sync {
    /// Handler key. Must not be empty.
    fn name(&self) -> &str;

    /// Job data handed to the handler.
    fn payload(&self) -> Result<Value, serde_json::Error> {
        Ok(Value::Null)
    }

    /// Delivery options.
    fn options(&self) -> JobOptions {
        JobOptions::default()
    }
}

/// Ad-hoc job built at the call site.
#[derive(Debug, Clone, Default)]
pub struct GenericJob {
    name: String,
    payload: Value,
    options: JobOptions,
}

impl GenericJob {
    /// Job named `name` with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
            options: JobOptions::default(),
        }
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the delivery options.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }
}

impl AppJob for GenericJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        Ok(self.payload.clone())
    }

    fn options(&self) -> JobOptions {
        self.options.clone()
    }
}

/// Job whose payload is a serializable application struct.
#[derive(Debug, Clone)]
pub struct TypedJob<T> {
    name: String,
    data: T,
    options: JobOptions,
}

impl<T: Serialize + Send + Sync> TypedJob<T> {
    /// Job named `name` carrying `data`.
    pub fn new(name: impl Into<String>, data: T) -> Self {
        Self {
            name: name.into(),
            data,
            options: JobOptions::default(),
        }
    }

    /// Set the delivery options.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// The carried data.
    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T: Serialize + Send + Sync> AppJob for TypedJob<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.data)
    }

    fn options(&self) -> JobOptions {
        self.options.clone()
    }
}
