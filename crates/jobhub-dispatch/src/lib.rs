//! # jobhub-dispatch
//!
//! Turns application jobs plus a scheduling intent into queue backend
//! calls.
//!
//! ```text
//! dispatch(job, "every 5 minutes")
//!   -> JobConverter::convert      (name, payload, options -> BackendJob)
//!   -> SchedulingIntent::parse    (Immediate | Recurring | DelayedAt | DelayedBy)
//!   -> QueueBackend::{now, every, schedule}
//! ```

pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod intent;
pub mod job;
pub mod registry;

#[cfg(test)]
mod testing;

pub use converter::JobConverter;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::{ConversionError, DispatchError, ParseAmbiguityError};
pub use intent::SchedulingIntent;
pub use job::{AppJob, GenericJob, TypedJob};
pub use registry::HandlerRegistry;
