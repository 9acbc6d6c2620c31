//! In-memory credential store

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use zeroize::Zeroize;

use super::{CredentialStore, StoreError};

/// Volatile credential store
///
/// Values live only as long as the store and are zeroized when removed or
/// overwritten.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value is stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        if let Some(mut previous) = previous {
            previous.zeroize();
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if let Some(mut removed) = removed {
            removed.zeroize();
        }
        Ok(())
    }
}

impl Drop for MemoryCredentialStore {
    fn drop(&mut self) {
        let entries = self
            .entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for value in entries.values_mut() {
            value.zeroize();
        }
    }
}
