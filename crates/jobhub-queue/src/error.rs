//! Queue backend errors.

use jobhub_core::error::{AppError, ErrorKind};

/// Error reported by a queue backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("Queue backend connection failed: {0}")]
    Connection(String),

    /// A delayed-job time string could not be understood.
    #[error("Invalid schedule '{0}': expected a timestamp or a relative duration")]
    InvalidSchedule(String),

    /// A recurring expression is neither a cron string nor an interval.
    #[error("Invalid recurring expression '{expression}': {reason}")]
    InvalidExpression {
        /// The rejected expression.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The recurring-job scheduler failed.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// A stored job could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis returned an error.
    #[cfg(feature = "redis-backend")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend has been shut down.
    #[error("Queue backend is shut down")]
    Closed,
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        let kind = match &err {
            BackendError::InvalidSchedule(_) | BackendError::InvalidExpression { .. } => {
                ErrorKind::Validation
            }
            BackendError::Serialization(_) => ErrorKind::Serialization,
            BackendError::Connection(_) | BackendError::Closed => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Backend,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
