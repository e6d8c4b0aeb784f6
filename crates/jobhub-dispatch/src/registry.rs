//! Job name to handler bindings.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing;

use jobhub_entity::JobRecord;
use jobhub_queue::{BackendResult, JobExecutionError, JobHandler, QueueBackend, handler_fn};

/// Maps job names to handlers and attaches them to a backend.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    /// Registered job handlers by name
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `name`. A later registration replaces an
    /// earlier one; the replaced handler is returned.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Option<Arc<dyn JobHandler>> {
        let name = name.into();
        let previous = self.handlers.insert(name.clone(), handler);
        if previous.is_some() {
            tracing::warn!(job_name = %name, "Replaced job handler");
        } else {
            tracing::info!(job_name = %name, "Registered job handler");
        }
        previous
    }

    /// Register an async closure as the handler for `name`.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(JobRecord) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
    {
        self.register(name, handler_fn(f));
    }

    /// Check if a handler is registered for a job name
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered job names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Attach every handler to the backend's consumption mechanism.
    ///
    /// Resolves once all attachments are made, not when jobs are processed.
    /// Returns the number of handlers attached.
    pub async fn listen_for_app_jobs(&self, backend: &dyn QueueBackend) -> BackendResult<usize> {
        for name in self.names() {
            if let Some(handler) = self.handlers.get(&name) {
                backend.process(&name, Arc::clone(handler)).await?;
                tracing::debug!(job_name = %name, queue = backend.queue_name(), "Attached handler");
            }
        }
        Ok(self.handlers.len())
    }
}
