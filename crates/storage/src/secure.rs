//! Secure key-value storage
//!
//! Mirrors the semantics of a platform secure store: string values keyed by
//! name, read on app start, written on sign-in and deleted on sign-out.
//! Two backends are provided. [`KvSecureStore`] persists through sled and
//! [`MemorySecureStore`] keeps values in process memory (used where no
//! persistent secure storage exists, and in tests).

use crate::kv::{KvStore, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Key under which the session token is stored
pub const SESSION_TOKEN_KEY: &str = "userToken";

/// String-valued secure storage
pub trait SecureStore: Send + Sync {
    /// Read a value, `None` when absent
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    fn delete_item(&self, key: &str) -> Result<()>;
}

/// Secure store persisted in the sled key-value store under the `secure` scope
#[derive(Debug, Clone)]
pub struct KvSecureStore {
    kv: KvStore,
}

impl KvSecureStore {
    /// Wrap a key-value store
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }
}

impl SecureStore for KvSecureStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.kv.get_scoped(&["secure", key])
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.kv.set_scoped(&["secure", key], &value)?;
        // Tokens must survive an abrupt exit right after sign-in.
        self.kv.flush()
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        self.kv.remove_scoped(&["secure", key])?;
        self.kv.flush()
    }
}

/// In-memory secure store
#[derive(Debug, Clone, Default)]
pub struct MemorySecureStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySecureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

impl<S: SecureStore + ?Sized> SecureStore for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        (**self).delete_item(key)
    }
}
