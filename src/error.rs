use thiserror::Error;

/// Trip lifecycle failures. Both are recoverable; the caller retries on the next user action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripError {
    #[error("No location fix yet, wait for a satellite signal before starting a trip")]
    NotReady,

    #[error("No trip is running")]
    NotActive,
}

/// Trip persistence failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Trip not found: {0}")]
    NotFound(i64),
}

/// Top-level tracker error
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Trip(#[from] TripError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_error_wraps_transparently() {
        let err: TrackerError = TripError::NotReady.into();
        assert_eq!(err.to_string(), TripError::NotReady.to_string());
    }

    #[test]
    fn test_not_found_message() {
        let err = StorageError::NotFound(42);
        assert!(err.to_string().contains("42"));
    }
}
