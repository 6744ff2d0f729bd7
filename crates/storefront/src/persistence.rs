//! Durable client-side slots.
//!
//! [`FileStore`] keeps one JSON document per key under a data directory.
//! [`PersistedState`] is what the storefront reads once at startup; every
//! later mutation writes its slot back through [`persist`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pva_market_core::storage::{self, KeyValueStore, StorageError, keys};
use pva_market_core::{CartItem, Theme, User};
use serde::Serialize;
use tracing::{debug, warn};

/// Key-value store backed by one file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io {
            key: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(key: &str, err: &std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_owned(),
        message: err.to_string(),
    }
}

impl KeyValueStore for FileStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, &e)),
        }
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Write-then-rename so a crash never leaves a half-written slot.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|e| io_error(key, &e))?;
        fs::rename(&tmp, self.path(key)).map_err(|e| io_error(key, &e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, &e)),
        }
    }
}

/// Client state as found on disk at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub cart: Vec<CartItem>,
    pub user: Option<User>,
    pub theme: Theme,
}

impl PersistedState {
    /// Read every slot, resetting absent or corrupt ones to their default.
    #[must_use]
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let state = Self {
            cart: storage::load(store, keys::CART).unwrap_or_default(),
            user: storage::load(store, keys::CURRENT_USER),
            theme: storage::load(store, keys::THEME).unwrap_or_default(),
        };
        debug!(
            cart_lines = state.cart.len(),
            logged_in = state.user.is_some(),
            theme = %state.theme,
            "Loaded persisted state"
        );
        state
    }
}

/// Write a slot, logging instead of failing.
///
/// The in-memory store stays authoritative when the medium is unwritable;
/// the next successful write catches the slot up.
pub fn persist<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    if let Err(e) = storage::save(store, key, value) {
        warn!(key, error = %e, "Failed to persist slot");
    }
}

/// Delete a slot, logging instead of failing.
pub fn forget(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        warn!(key, error = %e, "Failed to clear persisted slot");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pva_market_core::{Email, MemoryStore, Price, Product, ProductCategory, ProductId, UserId};

    use super::*;

    fn item() -> CartItem {
        CartItem::new(
            Product {
                id: ProductId::new("li-1"),
                title: "LinkedIn".to_string(),
                category: ProductCategory::Social,
                price: Price::from_dollars(300),
                stock: 3,
                icon: "linkedin".to_string(),
                description: String::new(),
                features: vec!["Aged 2y".to_string()],
            },
            2,
        )
    }

    #[test]
    fn test_file_store_round_trip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).unwrap();

        assert_eq!(store.load_raw(keys::THEME).unwrap(), None);
        store.save_raw(keys::THEME, "\"dark\"").unwrap();
        assert_eq!(
            store.load_raw(keys::THEME).unwrap().as_deref(),
            Some("\"dark\"")
        );
        assert!(!dir.path().join("data/theme.json.tmp").exists());

        store.remove(keys::THEME).unwrap();
        store.remove(keys::THEME).unwrap();
        assert_eq!(store.load_raw(keys::THEME).unwrap(), None);
    }

    #[test]
    fn test_load_empty_store_gives_defaults() {
        let state = PersistedState::load(&MemoryStore::new());
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_load_survives_corrupt_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("cart.json"), "[{\"id\": ").unwrap();
        fs::write(dir.path().join("current-user.json"), "42").unwrap();
        fs::write(dir.path().join("theme.json"), "\"sepia\"").unwrap();

        let state = PersistedState::load(&store);
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_persisted_slots_are_read_back() {
        let store = MemoryStore::new();
        let user = User {
            id: UserId::new("user-1"),
            name: "Alice".to_string(),
            email: Email::parse("alice@example.com").unwrap(),
        };
        persist(&store, keys::CART, &[item()]);
        persist(&store, keys::CURRENT_USER, &user);
        persist(&store, keys::THEME, &Theme::Dark);

        let state = PersistedState::load(&store);
        assert_eq!(state.cart, vec![item()]);
        assert_eq!(state.user, Some(user));
        assert_eq!(state.theme, Theme::Dark);

        forget(&store, keys::CURRENT_USER);
        assert_eq!(PersistedState::load(&store).user, None);
    }
}
