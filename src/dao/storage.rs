use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A record could not be converted between its stored and in-memory shapes.
    #[error("corrupted record `{record}`: {message}")]
    Corrupted { record: String, message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a corruption error for the given record key.
    pub fn corrupted(record: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Corrupted {
            record: record.into(),
            message: message.into(),
        }
    }
}
