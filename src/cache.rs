//! Bounded resource cache with FIFO eviction
//!
//! Keeps at most `capacity` entries. When a new key would exceed the
//! capacity, the entry inserted first is evicted and handed to the release
//! hook (for instance to close an open package). Reads never change the
//! eviction order, and re-inserting an existing key replaces its value in
//! place.
//!
//! Not internally synchronized; every mutating operation takes `&mut self`.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use thiserror::Error;
use tracing::debug;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("Cache capacity must be at least 1")]
    InvalidCapacity,
}

/// Callback invoked with every entry the cache lets go of
pub type ReleaseHook<K, V> = Box<dyn FnMut(K, V)>;

/// FIFO-bounded map
///
/// Backed by an [`LruCache`] that is only ever read through `peek`, so the
/// recency order it maintains is exactly the insertion order.
pub struct BoundedCache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    on_release: Option<ReleaseHook<K, V>>,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Create a cache that calls `on_release` for each evicted entry
    pub fn new(capacity: NonZeroUsize, on_release: impl FnMut(K, V) + 'static) -> Self {
        Self {
            entries: LruCache::new(capacity),
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Create a cache without release hook
    pub fn with_capacity(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::InvalidCapacity)?;
        Ok(Self {
            entries: LruCache::new(capacity),
            on_release: None,
        })
    }

    /// Insert or update a value
    ///
    /// Updating keeps the entry's position. Inserting a new key into a full
    /// cache evicts the oldest entry.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(slot) = self.entries.peek_mut(&key) {
            *slot = value;
            return;
        }

        if let Some((evicted_key, evicted_value)) = self.entries.push(key, value) {
            debug!(len = self.entries.len(), "Evicting oldest cache entry");
            self.release(evicted_key, evicted_value);
        }
    }

    /// Look up a value without touching the eviction order
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.peek(key)
    }

    /// Mutable lookup, same ordering guarantees as [`BoundedCache::get`]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.peek_mut(key)
    }

    /// Look up a value, failing with [`CacheError::NotFound`] when absent
    pub fn get_or_err<Q>(&self, key: &Q) -> Result<&V, CacheError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.get(key)
            .ok_or_else(|| CacheError::NotFound(format!("{:?}", key)))
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains(key)
    }

    /// Keys, oldest first
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().rev().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Drop every entry, oldest first, through the release hook
    pub fn clear(&mut self) {
        while let Some((key, value)) = self.entries.pop_lru() {
            self.release(key, value);
        }
    }

    fn release(&mut self, key: K, value: V) {
        if let Some(hook) = self.on_release.as_mut() {
            hook(key, value);
        }
    }
}

impl<K: Hash + Eq + fmt::Debug, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity())
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}
