//! Queue backends for JobHub.
//!
//! This crate provides:
//! - The [`QueueBackend`] seam the dispatcher talks to
//! - [`JobQueue`], a backend over any [`JobStore`] (in-memory or Redis)
//! - A worker runner that polls for and executes jobs of one name
//! - A recurring scheduler that re-enqueues registered jobs
//! - Parsing of delayed-run times and recurring expressions

pub mod backend;
pub mod error;
pub mod handler;
pub mod manager;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod when;

pub use backend::QueueBackend;
pub use error::{BackendError, BackendResult};
pub use handler::{JobExecutionError, JobHandler, handler_fn};
pub use manager::connect_backend;
pub use queue::JobQueue;
pub use runner::WorkerRunner;
pub use scheduler::RecurringScheduler;
pub use store::{JobStore, MemoryStore};
