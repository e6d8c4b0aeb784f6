//! Application job to backend job conversion.

use jobhub_entity::{BackendJob, JobDescriptor};

use crate::error::ConversionError;
use crate::job::AppJob;

/// Turns application jobs into backend jobs bound to a queue. Pure; no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobConverter;

impl JobConverter {
    /// Extract name, payload and options from `job` and bind the result to
    /// `target_queue` under a fresh id.
    pub fn convert<J: AppJob + ?Sized>(
        job: &J,
        target_queue: &str,
    ) -> Result<BackendJob, ConversionError> {
        let name = job.name();
        if name.trim().is_empty() {
            return Err(ConversionError::MissingName);
        }

        let payload = job.payload().map_err(|source| ConversionError::Payload {
            name: name.to_string(),
            source,
        })?;
        let options = job.options();
        let descriptor = JobDescriptor::new(name, payload, options.to_metadata());

        Ok(BackendJob::new(target_queue, descriptor, options))
    }
}
