//! # jobhub-entity
//!
//! Job data model for JobHub. Every struct in this crate is a value
//! object passed between the dispatcher and the queue backends, or a
//! record persisted by a backend. All entities derive `Debug`, `Clone`,
//! `Serialize`, and `Deserialize`.

pub mod job;
pub mod removal;
pub mod stats;

pub use job::{
    Backoff, BackendJob, JobDescriptor, JobOptions, JobPriority, JobRecord, JobStatus,
    RecurringEntry,
};
pub use removal::{RemovalResponse, RemoveCriteria, RemoveQuery};
pub use stats::QueueStats;
