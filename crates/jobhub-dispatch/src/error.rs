//! Dispatch errors.

use jobhub_core::error::{AppError, ErrorKind};

/// An application job could not be turned into a backend job.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The job has no name, so no handler could ever pick it up.
    #[error("job has no name")]
    MissingName,

    /// The payload could not be serialized.
    #[error("payload of job '{name}' is not serializable: {source}")]
    Payload {
        /// Job name.
        name: String,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },
}

/// A scheduling intent string could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("scheduling intent is empty")]
pub struct ParseAmbiguityError;

/// Error returned synchronously by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Conversion failed before anything reached the backend.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The intent string was empty.
    #[error(transparent)]
    Ambiguous(#[from] ParseAmbiguityError),

    /// The dispatcher has been shut down.
    #[error("dispatcher is shut down")]
    Closed,
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        AppError::with_source(ErrorKind::Conversion, err.to_string(), err)
    }
}

impl From<ParseAmbiguityError> for AppError {
    fn from(err: ParseAmbiguityError) -> Self {
        AppError::with_source(ErrorKind::Parse, err.to_string(), err)
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Conversion(e) => e.into(),
            DispatchError::Ambiguous(e) => e.into(),
            DispatchError::Closed => AppError::service_unavailable("dispatcher is shut down"),
        }
    }
}
