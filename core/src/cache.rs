use crate::time::{now, DateTime};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// CredentialCache stores resolved credentials under a composite key for a
/// bounded time.
///
/// Implementations must never return an entry after its ttl has elapsed.
/// Concurrent `set` calls on the same key are last-writer-wins.
#[async_trait::async_trait]
pub trait CredentialCache<T>: Debug + Send + Sync + 'static {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> Option<T>;

    /// Insert or replace an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: T, ttl: Duration);
}

type Clock = Arc<dyn Fn() -> DateTime + Send + Sync>;

/// Process local cache backed by a `HashMap`.
///
/// The clock is injectable so tests can move time forward without sleeping.
pub struct MemoryCache<T> {
    entries: Mutex<HashMap<String, (T, DateTime)>>,
    clock: Clock,
}

impl<T> MemoryCache<T> {
    /// Create a cache that reads the system clock.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock: Arc::new(now),
        }
    }

    /// Replace the clock used to evaluate expiry.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<T> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for MemoryCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<T: Clone + Send + Sync + 'static> CredentialCache<T> for MemoryCache<T> {
    async fn get(&self, key: &str) -> Option<T> {
        let current = (self.clock)();
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > current => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: T, ttl: Duration) {
        let expires_at = chrono::TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| (self.clock)().checked_add_signed(ttl))
            .unwrap_or(DateTime::MAX_UTC);

        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value, expires_at));
    }
}

/// Picks between the process local cache and an optional shared cache.
///
/// When no shared cache was configured, the local cache serves both roles so
/// callers asking for the shared scope still get ttl semantics.
pub struct CacheSelector<T> {
    local: Arc<dyn CredentialCache<T>>,
    shared: Option<Arc<dyn CredentialCache<T>>>,
}

impl<T: Clone + Send + Sync + 'static> CacheSelector<T> {
    /// Create a selector with a fresh in-memory local cache.
    pub fn new() -> Self {
        Self {
            local: Arc::new(MemoryCache::new()),
            shared: None,
        }
    }

    /// Replace the local cache.
    pub fn with_local(mut self, cache: impl CredentialCache<T>) -> Self {
        self.local = Arc::new(cache);
        self
    }

    /// Configure the shared cache.
    pub fn with_shared(mut self, cache: impl CredentialCache<T>) -> Self {
        self.shared = Some(Arc::new(cache));
        self
    }

    /// Select the cache for a lookup.
    pub fn select(&self, use_local_cache: bool) -> Arc<dyn CredentialCache<T>> {
        match (&self.shared, use_local_cache) {
            (Some(shared), false) => shared.clone(),
            _ => self.local.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for CacheSelector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CacheSelector<T> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T> Debug for CacheSelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSelector")
            .field("local", &self.local)
            .field("shared", &self.shared)
            .finish()
    }
}
