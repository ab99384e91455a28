//! Cache storage implementations.
//!
//! A generic TTL-bounded key/value store plus the content cache: one slot
//! for the whole merged collection, an LRU of per-slug entries, and the
//! generation counter that fences loads against invalidation.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;
use time::{Duration, OffsetDateTime};

use crate::domain::entities::Post;

use super::clock::Clock;
use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

const METRIC_COLLECTION_HIT: &str = "confluo_cache_collection_hit_total";
const METRIC_COLLECTION_MISS: &str = "confluo_cache_collection_miss_total";
const METRIC_SLUG_HIT: &str = "confluo_cache_slug_hit_total";
const METRIC_SLUG_MISS: &str = "confluo_cache_slug_miss_total";
const METRIC_STALE_DISCARD: &str = "confluo_cache_stale_discard_total";

/// Monotonic invalidation counter. Loads snapshot it before fetching and
/// commit only if it has not moved since.
pub type Generation = u64;

// ============================================================================
// Cache entries
// ============================================================================

/// A cached value stamped with its write time.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub written_at: OffsetDateTime,
}

impl<T> CacheEntry<T> {
    fn new(value: T, written_at: OffsetDateTime) -> Self {
        Self { value, written_at }
    }

    /// Fresh while `now - written_at < ttl`. The window is fixed from write
    /// time; reads never extend it.
    pub fn is_fresh(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        now - self.written_at < ttl
    }
}

// ============================================================================
// TTL key/value store
// ============================================================================

/// TTL-bounded key/value cache with LRU eviction.
///
/// Stale entries are evicted on access; there is no background sweeper.
pub struct TtlCache<K: Hash + Eq, V: Clone> {
    entries: RwLock<LruCache<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: NonZeroUsize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            clock,
            ttl,
        }
    }

    /// Fetch a fresh value; a stale entry is evicted and reported absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a value stamped with the current time, overwriting any entry.
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        rw_write(&self.entries, SOURCE, "insert").push(key, CacheEntry::new(value, now));
    }

    /// Store a value only if `permit` still holds. The closure runs under
    /// the write lock, so no removal can interleave between the check and
    /// the write.
    pub fn insert_if(&self, key: K, value: V, permit: impl FnOnce() -> bool) -> bool {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "insert_if");
        if !permit() {
            return false;
        }
        entries.push(key, CacheEntry::new(value, now));
        true
    }

    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        rw_write(&self.entries, SOURCE, "remove").pop(key);
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Content cache
// ============================================================================

/// Cache for the resolved content collection.
///
/// The collection slot holds the full merged set behind an `Arc`; per-slug
/// entries live in a bounded LRU. Both honor the same TTL. The generation
/// counter is bumped by every invalidation, and a load that began before the
/// bump is rejected at commit time.
pub struct ContentCache {
    collection: RwLock<Option<CacheEntry<Arc<Vec<Post>>>>>,
    posts: TtlCache<String, Post>,
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ContentCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = config.ttl();
        Self {
            collection: RwLock::new(None),
            posts: TtlCache::new(config.slug_limit_non_zero(), ttl, Arc::clone(&clock)),
            generation: AtomicU64::new(0),
            clock,
            ttl,
        }
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Collection slot
    // ========================================================================

    pub fn get_collection(&self) -> Option<Arc<Vec<Post>>> {
        let now = self.clock.now();
        {
            let slot = rw_read(&self.collection, SOURCE, "get_collection");
            if let Some(entry) = slot.as_ref() {
                if entry.is_fresh(now, self.ttl) {
                    counter!(METRIC_COLLECTION_HIT).increment(1);
                    return Some(Arc::clone(&entry.value));
                }
            }
        }

        // Stale entries are dropped under the write lock after a re-check,
        // since another writer may have refreshed the slot in between.
        let mut slot = rw_write(&self.collection, SOURCE, "get_collection");
        if let Some(entry) = slot.as_ref() {
            if entry.is_fresh(now, self.ttl) {
                counter!(METRIC_COLLECTION_HIT).increment(1);
                return Some(Arc::clone(&entry.value));
            }
            *slot = None;
        }
        counter!(METRIC_COLLECTION_MISS).increment(1);
        None
    }

    /// Commit a freshly resolved collection. Returns `false` when the load
    /// generation has been superseded by an invalidation; the caller still
    /// serves its result, it just must not cache it.
    pub fn set_collection(&self, generation: Generation, posts: Arc<Vec<Post>>) -> bool {
        let now = self.clock.now();
        let mut slot = rw_write(&self.collection, SOURCE, "set_collection");
        if self.generation.load(Ordering::SeqCst) != generation {
            counter!(METRIC_STALE_DISCARD).increment(1);
            return false;
        }
        *slot = Some(CacheEntry::new(posts, now));
        true
    }

    // ========================================================================
    // Per-slug entries
    // ========================================================================

    pub fn get_post(&self, slug: &str) -> Option<Post> {
        match self.posts.get(slug) {
            Some(post) => {
                counter!(METRIC_SLUG_HIT).increment(1);
                Some(post)
            }
            None => {
                counter!(METRIC_SLUG_MISS).increment(1);
                None
            }
        }
    }

    /// Commit one resolved post, keyed by its slug. Same generation fencing
    /// as [`ContentCache::set_collection`].
    pub fn set_post(&self, generation: Generation, post: Post) -> bool {
        let committed = self.posts.insert_if(post.slug.clone(), post, || {
            self.generation.load(Ordering::SeqCst) == generation
        });
        if !committed {
            counter!(METRIC_STALE_DISCARD).increment(1);
        }
        committed
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Drop everything cached for one slug, including the collection slot
    /// that embeds it.
    pub fn clear_post(&self, slug: &str) {
        // Bump before dropping values so a load keyed to the old generation
        // cannot land after the removal.
        self.generation.fetch_add(1, Ordering::SeqCst);
        *rw_write(&self.collection, SOURCE, "clear_post") = None;
        self.posts.remove(slug);
    }

    /// Drop the whole cache.
    pub fn clear_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *rw_write(&self.collection, SOURCE, "clear_all") = None;
        self.posts.clear();
    }
}
