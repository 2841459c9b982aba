//! Query management
//!
//! This module provides a small query cache in the spirit of TanStack Query
//! for server state. Data is cached per [`QueryKey`] with a staleness window
//! and an expiry. Mutations invalidate keys or whole scopes so that the next
//! read goes back to the server.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Query key for identifying and caching queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Scope of the query (e.g., "workshops", "profile")
    pub scope: String,

    /// Unique identifier within the scope
    pub id: String,

    /// Optional parameters
    pub params: BTreeMap<String, String>,
}

impl QueryKey {
    /// Create a new query key
    pub fn new(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self { scope: scope.into(), id: id.into(), params: BTreeMap::new() }
    }

    /// Add a parameter to the query key
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Convert to cache key string
    pub fn to_cache_key(&self) -> String {
        format!("query:{}", self)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)?;
        let mut sep = '?';
        for (k, v) in &self.params {
            write!(f, "{}{}={}", sep, k, v)?;
            sep = '&';
        }
        Ok(())
    }
}

/// Query state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Query is idle (never fetched or invalidated)
    Idle,

    /// Query is fetching data
    Fetching,

    /// Query fetch succeeded
    Success,

    /// Query fetch failed
    Error,
}

/// Query configuration
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Time until data becomes stale
    pub stale_time: Duration,

    /// Time until cached data is dropped
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(0), // Immediately stale by default
            cache_time: Duration::from_secs(300),
        }
    }
}

/// Query trait for defining data fetching logic
#[async_trait]
pub trait Query: Send + Sync {
    /// The type of data this query returns
    type Data: Clone + Send + Sync + 'static;

    /// The error returned by a failed fetch
    type Error: fmt::Display + Send;

    /// Fetch the data
    async fn fetch(&self) -> Result<Self::Data, Self::Error>;

    /// Get the query key
    fn key(&self) -> QueryKey;

    /// Get the query configuration
    fn config(&self) -> QueryConfig {
        QueryConfig::default()
    }
}

struct Entry {
    state: QueryState,
    data: Option<Arc<dyn Any + Send + Sync>>,
    stale_at: Option<Instant>,
    expires_at: Option<Instant>,
    fetch_count: u32,
    last_error: Option<String>,
}

impl Entry {
    fn new() -> Self {
        Self {
            state: QueryState::Idle,
            data: None,
            stale_at: None,
            expires_at: None,
            fetch_count: 0,
            last_error: None,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.stale_at.map(|at| now < at).unwrap_or(false)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    fn data<T: Clone + 'static>(&self) -> Option<T> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<T>()).cloned()
    }
}

/// Query client for managing queries
///
/// Cloning is cheap and clones share the cache. The lock is never held
/// across a fetch.
#[derive(Clone, Default)]
pub struct QueryClient {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient").field("entries", &self.entries.read().len()).finish()
    }
}

impl QueryClient {
    /// Create a new query client
    pub fn new() -> Self {
        Self::default()
    }

    /// Get query data, using the cache while it is fresh
    pub async fn get<Q: Query>(&self, query: &Q) -> Result<Q::Data, Q::Error> {
        let cache_key = query.key().to_cache_key();
        let now = Instant::now();

        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(&cache_key) {
                if entry.is_fresh(now) && !entry.is_expired(now) {
                    if let Some(data) = entry.data::<Q::Data>() {
                        return Ok(data);
                    }
                }
            }
        }

        self.fetch(query).await
    }

    /// Fetch query data (always fetches, ignoring cache)
    pub async fn fetch<Q: Query>(&self, query: &Q) -> Result<Q::Data, Q::Error> {
        let key = query.key();
        let cache_key = key.to_cache_key();
        let config = query.config();

        {
            let mut entries = self.entries.write();
            let entry = entries.entry(cache_key.clone()).or_insert_with(Entry::new);
            entry.state = QueryState::Fetching;
            entry.fetch_count += 1;
        }

        tracing::debug!(%key, "fetching query");

        match query.fetch().await {
            Ok(data) => {
                let now = Instant::now();
                let mut entries = self.entries.write();
                let entry = entries.entry(cache_key).or_insert_with(Entry::new);
                entry.state = QueryState::Success;
                entry.data = Some(Arc::new(data.clone()));
                entry.stale_at = Some(now + config.stale_time);
                entry.expires_at = Some(now + config.cache_time);
                entry.last_error = None;
                Ok(data)
            }
            Err(err) => {
                tracing::debug!(%key, error = %err, "query failed");
                let mut entries = self.entries.write();
                let entry = entries.entry(cache_key).or_insert_with(Entry::new);
                entry.state = QueryState::Error;
                entry.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Cached data for a key, even when stale
    pub fn peek<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let now = Instant::now();
        let entries = self.entries.read();
        entries.get(&key.to_cache_key()).filter(|e| !e.is_expired(now)).and_then(|e| e.data::<T>())
    }

    /// Overwrite cached data, e.g. for an optimistic update
    ///
    /// The entry is marked stale so the next [`QueryClient::get`] refetches.
    pub fn set_data<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let entry = entries.entry(key.to_cache_key()).or_insert_with(Entry::new);
        entry.state = QueryState::Success;
        entry.data = Some(Arc::new(data));
        entry.stale_at = Some(now);
        entry.expires_at = Some(now + QueryConfig::default().cache_time);
    }

    /// Invalidate cached query data
    pub fn invalidate(&self, key: &QueryKey) {
        self.entries.write().remove(&key.to_cache_key());
    }

    /// Invalidate all queries matching a scope
    pub fn invalidate_scope(&self, scope: &str) {
        let prefix = format!("query:{}:", scope);
        let mut entries = self.entries.write();
        entries.retain(|k, _| !k.starts_with(&prefix));
        tracing::debug!(scope, "invalidated query scope");
    }

    /// Get query state
    pub fn state(&self, key: &QueryKey) -> QueryState {
        self.entries.read().get(&key.to_cache_key()).map(|e| e.state).unwrap_or(QueryState::Idle)
    }

    /// Last error message recorded for a key
    pub fn last_error(&self, key: &QueryKey) -> Option<String> {
        self.entries.read().get(&key.to_cache_key()).and_then(|e| e.last_error.clone())
    }

    /// Number of fetches issued for a key since it was last invalidated
    pub fn fetch_count(&self, key: &QueryKey) -> u32 {
        self.entries.read().get(&key.to_cache_key()).map(|e| e.fetch_count).unwrap_or(0)
    }

    /// Clear all cached queries
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
