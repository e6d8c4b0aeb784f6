//! Job domain entities.

pub mod descriptor;
pub mod model;
pub mod options;
pub mod recurring;
pub mod status;

pub use descriptor::JobDescriptor;
pub use model::{BackendJob, JobRecord};
pub use options::{Backoff, JobOptions};
pub use recurring::RecurringEntry;
pub use status::{JobPriority, JobStatus};
