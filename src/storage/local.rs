//! Local Cart Store

use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use crate::{
    lines::CartLine,
    storage::{KeyValueStore, StorageError},
};

/// Persists the anonymous cart as a JSON array of lines under a single key.
///
/// Storage failures never reach the caller: a read that fails or finds corrupt data yields an
/// empty cart, and a failed write leaves the in-memory cart authoritative for the session.
#[derive(Clone)]
pub struct LocalCartStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl fmt::Debug for LocalCartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCartStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl LocalCartStore {
    /// Wrap a backend, storing the cart under `key`.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Storage key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored lines. Missing, unreadable or corrupt data reads as an empty cart.
    #[must_use]
    pub fn read(&self) -> Vec<CartLine> {
        match self.try_read() {
            Ok(lines) => lines,
            Err(error) => {
                warn!(key = %self.key, %error, "discarding unreadable local cart");

                Vec::new()
            }
        }
    }

    /// Replace the stored lines.
    pub fn write(&self, lines: &[CartLine]) {
        if let Err(error) = self.try_write(lines) {
            warn!(key = %self.key, %error, lines = lines.len(), "failed to persist local cart");
        }
    }

    /// Delete the stored cart.
    pub fn clear(&self) {
        if let Err(error) = self.backend.remove(&self.key) {
            warn!(key = %self.key, %error, "failed to clear local cart");
        }
    }

    fn try_read(&self) -> Result<Vec<CartLine>, StorageError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(Vec::new());
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let lines: Vec<CartLine> = serde_json::from_str(&raw)?;

        debug!(key = %self.key, lines = lines.len(), "read local cart");

        Ok(lines)
    }

    fn try_write(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(lines)?;

        self.backend.set(&self.key, &raw)
    }
}
