use crate::domain::pricing::PredictionResult;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Exact bit patterns of `(distance, base_rate)`.
type CacheKey = (u64, u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Memoizes prediction results per exact input pair.
///
/// Bounded LRU. The mutex only guards lookup and store; callers racing on a
/// missing key both compute, and the later store overwrites with the same value.
pub struct PredictionCache {
    entries: Mutex<LruCache<CacheKey, PredictionResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PredictionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| {
            warn!("Prediction cache capacity 0 requested, using 1");
            NonZeroUsize::MIN
        });
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(distance: f64, base_rate: f64) -> CacheKey {
        (distance.to_bits(), base_rate.to_bits())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, PredictionResult>> {
        // entries are written whole, so a poisoned cache is still consistent
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, distance: f64, base_rate: f64) -> Option<PredictionResult> {
        self.lock().get(&Self::key(distance, base_rate)).cloned()
    }

    /// Returns the cached result, or computes and stores it. The flag is true on a hit.
    pub fn get_or_compute<F>(&self, distance: f64, base_rate: f64, compute: F) -> (PredictionResult, bool)
    where
        F: FnOnce() -> PredictionResult,
    {
        if let Some(hit) = self.get(distance, base_rate) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return (hit, true);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = compute();
        self.lock()
            .put(Self::key(distance, base_rate), result.clone());
        debug!("Cached quote for {}km / {}", distance, base_rate);
        (result, false)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, capacity) = {
            let cache = self.lock();
            (cache.len(), cache.cap().get())
        };
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            entries,
            capacity,
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
