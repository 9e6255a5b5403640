//! Storage Errors

use thiserror::Error;

/// Errors raised by [`KeyValueStore`](super::KeyValueStore) backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be read or written.
    #[error("storage io error")]
    Io(#[from] std::io::Error),

    /// The stored value could not be (de)serialised.
    #[error("stored cart is not valid json")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the store lock.
    #[error("storage lock poisoned")]
    Poisoned,

    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}
