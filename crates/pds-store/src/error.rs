use thiserror::Error;

/// Failures raised by the storage layer and the typed collections built on it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Encoding failure: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Storage backend failure: {0}")]
    Backend(String),

    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: u64, length: u64 },

    #[error("Corrupt collection state under {namespace}: {reason}")]
    Corrupt { namespace: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
