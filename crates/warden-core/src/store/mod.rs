//! Credential store boundary
//!
//! The guard engine treats secure storage as a byte-oriented key-value store
//! keyed by guard identifier. Encryption at rest and OS keychain integration
//! belong to the implementation behind [`CredentialStore`]; the two stores
//! shipped here cover tests, simulators and headless tooling.

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use thiserror::Error;

/// Errors reported by a credential store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure (keychain status codes, locked storage, ...)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Key-value storage for persisted access codes
///
/// Implementations must be safe to share between the registry and all of its
/// models. Deleting a key that does not exist is not an error.
pub trait CredentialStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Remove the value stored under `key`
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
