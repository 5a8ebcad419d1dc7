use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

/// A value together with the moment it was fetched.
#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at,
            ttl,
        }
    }

    /// True once `ttl` has elapsed since the fetch.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at >= self.ttl
    }
}

/// Memoizes "the current load": a single slot, no key, bounded by a TTL.
pub struct LoadCache<T> {
    slot: RwLock<Option<CacheEntry<Arc<T>>>>,
    ttl: Duration,
}

impl<T> LoadCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    pub fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<T>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|entry| !entry.is_stale(now))
            .map(|entry| entry.value.clone())
    }

    pub fn store(&self, value: T, now: DateTime<Utc>) -> Arc<T> {
        let value = Arc::new(value);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(CacheEntry::new(value.clone(), now, self.ttl));
        value
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Returns the cached value, or runs `load` and caches its result.
    /// Failed loads are not cached.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh(Utc::now()) {
            tracing::debug!("serving cached load");
            return Ok(value);
        }
        let value = load().await?;
        Ok(self.store(value, Utc::now()))
    }
}
