// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use shoal_lru::LruCache;

use crate::ByteView;

/// Thread-safe, lazily created LRU cache of byte views.
///
/// The underlying [`LruCache`] is only allocated by the first [`add`](Self::add); lookups before
/// that are misses.
#[derive(Debug)]
pub(crate) struct GuardedCache {
    group: Arc<str>,
    cache_bytes: usize,
    evictions: Arc<AtomicU64>,
    lru: Mutex<Option<LruCache<ByteView>>>,
}

impl GuardedCache {
    pub(crate) fn new(group: Arc<str>, cache_bytes: usize) -> Self {
        Self {
            group,
            cache_bytes,
            evictions: Arc::new(AtomicU64::new(0)),
            lru: Mutex::new(None),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<ByteView> {
        self.lru.lock().as_mut()?.get(key).cloned()
    }

    pub(crate) fn add(&self, key: &str, value: ByteView) {
        self.lru
            .lock()
            .get_or_insert_with(|| {
                let group = Arc::clone(&self.group);
                let evictions = Arc::clone(&self.evictions);
                LruCache::with_eviction_callback(self.cache_bytes, move |key: &str, value: &ByteView| {
                    evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::event!(
                        name: "shoal.evicted",
                        tracing::Level::DEBUG,
                        group.name = %group,
                        cache.key = key,
                        cache.value_bytes = value.len(),
                        "evicted least recently used entry",
                    );
                })
            })
            .add(key, value);
    }

    pub(crate) fn cache_bytes(&self) -> usize {
        self.cache_bytes
    }

    pub(crate) fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Returns the number of resident entries and their accounted bytes.
    pub(crate) fn usage(&self) -> (usize, usize) {
        self.lru.lock().as_ref().map_or((0, 0), |lru| (lru.len(), lru.used_bytes()))
    }
}
