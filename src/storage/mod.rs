//! Persistent key-value storage and the credential store built on it.
//!
//! [`KeyValueStore`] is the seam standing in for browser storage: string keys,
//! string values, synchronous access. [`CredentialStore`] is the only
//! component that writes the keys it owns.

mod credentials;
mod file;
mod memory;

pub use credentials::{CredentialStore, TokenSet};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Error;

/// Synchronous string key-value storage.
///
/// Implementations must be safe to share across tasks. Reads never fail;
/// a backend that cannot read a key reports it as absent.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Gets the value for `key`, or `None` if not present.
    fn get(&self, key: &str) -> Option<String>;

    /// Sets the value for `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Sets several keys in one write. Backends that persist should commit
    /// them together; the default sets them one by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the values could not be persisted.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), Error> {
        entries.iter().try_for_each(|(key, value)| self.set(key, value))
    }

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), Error>;
}
