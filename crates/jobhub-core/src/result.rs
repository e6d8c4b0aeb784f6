//! Convenience result type alias for JobHub.

use crate::error::AppError;

/// A specialized `Result` type for JobHub process-level operations.
pub type AppResult<T> = Result<T, AppError>;
