//! Durable key-value contract for client-side state.
//!
//! The storefront keeps three independent slots (cart, current user, theme)
//! and the admin console keeps its session token and backend override. Each
//! slot is one JSON document under a fixed key.
//!
//! Reads never fail hard: a missing or unparseable document is reported as
//! `None` so callers reset to their default instead of refusing to start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Well-known slot keys.
pub mod keys {
    /// Serialized list of cart items.
    pub const CART: &str = "cart";

    /// Serialized user record (no credential).
    pub const CURRENT_USER: &str = "current-user";

    /// Selected colour theme.
    pub const THEME: &str = "theme";

    /// Admin session token. Session-scoped: kept in a [`super::MemoryStore`].
    pub const ADMIN_TOKEN: &str = "admin-token";

    /// Operator-supplied backend URL that overrides the configured one.
    pub const BACKEND_URL: &str = "backend-url";
}

/// Errors raised by storage backends.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("storage I/O failed for '{key}': {message}")]
    Io {
        /// Slot key.
        key: String,
        /// Underlying failure.
        message: String,
    },
    /// The value could not be serialized.
    #[error("could not encode '{key}': {source}")]
    Encode {
        /// Slot key.
        key: String,
        /// Serializer error.
        source: serde_json::Error,
    },
}

/// A synchronous string-keyed document store.
///
/// Implementations hold raw JSON text; the typed helpers [`load`] and
/// [`save`] handle encoding.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the medium cannot be read.
    fn load_raw(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the medium cannot be written.
    fn save_raw(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the document stored under `key`. Absent keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode a slot, treating absence, I/O failure and corrupt data
/// alike as "nothing stored".
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.load_raw(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted slot, using default");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Persisted slot is malformed, using default");
            None
        }
    }
}

/// Encode and write a slot.
///
/// # Errors
///
/// Returns `StorageError::Encode` if the value cannot be serialized, or the
/// backend's error if the write fails.
pub fn save<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_owned(),
        source,
    })?;
    store.save_raw(key, &raw)
}

/// In-memory store for session-scoped slots and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with raw documents.
    #[must_use]
    pub fn with_slots<I, K, V>(slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = slots
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            slots: Arc::new(Mutex::new(map)),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}
