//! On-disk key-value store
//!
//! A thin sled wrapper holding the session token (through
//! [`crate::secure::KvSecureStore`]) and device-level settings. Values are
//! JSON so any serde type fits. Keys may be scoped: `["device", "colorScheme"]`
//! is stored as `device:colorScheme`.

use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

const SCOPE_SEPARATOR: &str = ":";

/// Store location and tuning
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database directory
    pub path: PathBuf,
    /// Page cache size in bytes
    pub cache_capacity: u64,
    /// Background flush interval; `None` flushes only on demand
    pub flush_every_ms: Option<u64>,
}

impl KvConfig {
    /// Store at `path` with small-footprint defaults
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cache_capacity: 1024 * 1024, flush_every_ms: Some(500) }
    }
}

/// Key-value store
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").field("keys", &self.db.len()).finish()
    }
}

impl KvStore {
    /// Open or create the store
    pub fn new(config: KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(true)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        tracing::debug!(path = %config.path.display(), "opened key-value store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Throwaway store that is deleted on drop
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Read and decode a value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.db
            .get(key.as_bytes())?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// Read a value under a scoped key
    pub fn get_scoped<T: DeserializeOwned>(&self, scopes: &[&str]) -> Result<Option<T>> {
        self.get(&scoped_key(scopes)?)
    }

    /// Encode and write a value
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        if key.is_empty() {
            return Err(KvError::InvalidKey("key must not be empty".to_string()));
        }
        self.db.insert(key.as_bytes(), serde_json::to_vec(value)?)?;
        Ok(())
    }

    /// Write a value under a scoped key
    pub fn set_scoped<T: Serialize>(&self, scopes: &[&str], value: &T) -> Result<()> {
        self.set(&scoped_key(scopes)?, value)
    }

    /// Delete a key; true when it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.db.remove(key.as_bytes())?.is_some())
    }

    /// Delete a scoped key
    pub fn remove_scoped(&self, scopes: &[&str]) -> Result<bool> {
        self.remove(&scoped_key(scopes)?)
    }

    /// Block until pending writes are on disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn scoped_key(scopes: &[&str]) -> Result<String> {
    if scopes.is_empty() || scopes.iter().any(|s| s.is_empty()) {
        return Err(KvError::InvalidKey(format!("{:?}", scopes)));
    }
    Ok(scopes.join(SCOPE_SEPARATOR))
}

/// Device-level settings under the `device` scope
#[derive(Debug, Clone)]
pub struct DeviceStore {
    kv: KvStore,
}

impl DeviceStore {
    /// Wrap a key-value store
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Read a setting
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.kv.get_scoped(&["device", key])
    }

    /// Write a setting
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.kv.set_scoped(&["device", key], value)
    }

    /// Forget a setting
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.kv.remove_scoped(&["device", key])
    }
}
