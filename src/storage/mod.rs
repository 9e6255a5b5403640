//! Storage
//!
//! Key-value persistence for the anonymous cart. The engine only talks to
//! [`LocalCartStore`], which wraps any [`KeyValueStore`] backend.

use mockall::automock;

mod errors;
mod file;
mod local;
mod memory;

pub use errors::StorageError;
pub use file::FileStore;
pub use local::LocalCartStore;
pub use memory::MemoryStore;

/// Synchronous string key-value storage.
#[automock]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
