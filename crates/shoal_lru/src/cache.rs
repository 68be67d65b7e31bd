// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Arena-backed LRU list with a byte budget.
//!
//! ```text
//!   nodes (Vec<Node<V>>)                         index (key -> slot)
//!   ┌──────┬──────────────────────────────┐      ┌───────┬──────┐
//!   │ slot │ Node { key, value, prev, next}│      │ "k2"  │  1   │
//!   ├──────┼──────────────────────────────┤      │ "k1"  │  0   │
//!   │  0   │ { "k1", .., Some(1), None }  │      │ "k3"  │  2   │
//!   │  1   │ { "k2", .., Some(2), Some(0)}│      └───────┴──────┘
//!   │  2   │ { "k3", .., None, Some(1) }  │
//!   └──────┴──────────────────────────────┘
//!
//!   head (MRU) ─► [2] ◄──► [1] ◄──► [0] ◄── tail (LRU)
//! ```
//!
//! Nodes live densely in a vector. Removing a node swaps the last node into the freed slot and
//! re-points its neighbors and its index entry, so every slot is always occupied.

use std::fmt::{self, Debug};

use foldhash::HashMap;

use crate::ByteLen;

/// Callback invoked with the key and value of every entry evicted by the byte budget.
pub type EvictionCallback<V> = Box<dyn FnMut(&str, &V) + Send>;

#[derive(Debug)]
struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A least-recently-used store that evicts by accounted bytes.
///
/// Every entry is charged `key.len() + value.byte_len()` bytes. After each [`add`](Self::add) the
/// least recently used entries are evicted until the charged total fits in `max_bytes`. A
/// `max_bytes` of zero disables eviction.
///
/// # Examples
///
/// ```
/// use shoal_lru::LruCache;
///
/// let mut cache = LruCache::new(10);
/// cache.add("key1", "123456".to_string());
/// assert_eq!(cache.used_bytes(), 10);
///
/// // 14 bytes would be resident, so "key1" is evicted.
/// cache.add("k2", "v2".to_string());
/// assert!(cache.get("key1").is_none());
/// assert_eq!(cache.used_bytes(), 4);
///
/// let (key, value) = cache.remove_oldest().unwrap();
/// assert_eq!((key.as_str(), value.as_str()), ("k2", "v2"));
/// ```
pub struct LruCache<V> {
    max_bytes: usize,
    used_bytes: usize,
    nodes: Vec<Node<V>>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V: ByteLen> LruCache<V> {
    /// Creates an empty cache with the given byte budget.
    ///
    /// A budget of zero means the cache never evicts.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            nodes: Vec::new(),
            index: HashMap::default(),
            head: None,
            tail: None,
            on_evicted: None,
        }
    }

    /// Creates an empty cache that reports every eviction to `on_evicted`.
    ///
    /// The callback observes the entry after it has been unlinked from the cache.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::{Arc, Mutex};
    /// use shoal_lru::LruCache;
    ///
    /// let evicted = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&evicted);
    /// let mut cache = LruCache::with_eviction_callback(4, move |key: &str, _: &String| {
    ///     sink.lock().unwrap().push(key.to_string());
    /// });
    ///
    /// cache.add("a", "1".to_string());
    /// cache.add("b", "2".to_string());
    /// cache.add("c", "3".to_string());
    ///
    /// assert_eq!(*evicted.lock().unwrap(), ["a"]);
    /// ```
    #[must_use]
    pub fn with_eviction_callback(max_bytes: usize, on_evicted: impl FnMut(&str, &V) + Send + 'static) -> Self {
        Self {
            on_evicted: Some(Box::new(on_evicted)),
            ..Self::new(max_bytes)
        }
    }

    /// Looks up a key, marking it as the most recently used entry on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.promote(slot);
        Some(&self.nodes[slot].value)
    }

    /// Inserts or replaces the value for `key` and marks it as most recently used.
    ///
    /// Replacing a value only re-charges the difference in value size; the key is already
    /// accounted for. Eviction runs afterwards, so the newly added entry is itself evicted when it
    /// alone exceeds the budget.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(&slot) = self.index.get(&key) {
            let node = &mut self.nodes[slot];
            self.used_bytes = self.used_bytes - node.value.byte_len() + value.byte_len();
            node.value = value;
            self.promote(slot);
        } else {
            let slot = self.nodes.len();
            self.used_bytes += key.len() + value.byte_len();
            self.nodes.push(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.index.insert(key, slot);
            self.link_front(slot);
        }

        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    /// Evicts the least recently used entry, if any, and returns it.
    ///
    /// The eviction callback, when configured, observes the entry before it is returned.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let slot = self.tail?;
        let node = self.take(slot);
        self.index.remove(&node.key);
        self.used_bytes -= node.key.len() + node.value.byte_len();

        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(&node.key, &node.value);
        }

        Some((node.key, node.value))
    }
}

impl<V> LruCache<V> {
    /// Returns the number of resident entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the bytes currently charged against the budget.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Returns the byte budget; zero means unbounded.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Iterates over the entries from most to least recently used without touching recency.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            cache: self,
            current: self.head,
        }
    }

    fn promote(&mut self, slot: usize) {
        if self.head != Some(slot) {
            self.unlink(slot);
            self.link_front(slot);
        }
    }

    fn link_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;

        match self.head {
            Some(head) => self.nodes[head].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let Node { prev, next, .. } = self.nodes[slot];

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }

        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    /// Unlinks and removes the node in `slot`, moving the last node into the hole.
    fn take(&mut self, slot: usize) -> Node<V> {
        self.unlink(slot);
        let node = self.nodes.swap_remove(slot);

        if slot < self.nodes.len() {
            let Node { prev, next, .. } = self.nodes[slot];
            match prev {
                Some(prev) => self.nodes[prev].next = Some(slot),
                None => self.head = Some(slot),
            }
            match next {
                Some(next) => self.nodes[next].prev = Some(slot),
                None => self.tail = Some(slot),
            }
            if let Some(moved) = self.index.get_mut(&self.nodes[slot].key) {
                *moved = slot;
            }
        }

        node
    }
}

impl<V: Debug> Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("max_bytes", &self.max_bytes)
            .field("used_bytes", &self.used_bytes)
            .field("entries", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

/// Iterator over the entries of an [`LruCache`], most recently used first.
#[derive(Debug)]
pub struct Iter<'a, V> {
    cache: &'a LruCache<V>,
    current: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.cache.nodes[self.current?];
        self.current = node.next;
        Some((node.key.as_str(), &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<V>(cache: &LruCache<V>) -> Vec<&str> {
        cache.iter().map(|(key, _)| key).collect()
    }

    /// Walks the list in both directions and checks links, index and accounting agree.
    fn assert_consistent(cache: &LruCache<String>) {
        let forward: Vec<usize> = {
            let mut slots = Vec::new();
            let mut current = cache.head;
            while let Some(slot) = current {
                slots.push(slot);
                current = cache.nodes[slot].next;
            }
            slots
        };
        let mut backward: Vec<usize> = {
            let mut slots = Vec::new();
            let mut current = cache.tail;
            while let Some(slot) = current {
                slots.push(slot);
                current = cache.nodes[slot].prev;
            }
            slots
        };
        backward.reverse();

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), cache.nodes.len());
        assert_eq!(cache.index.len(), cache.nodes.len());
        for (key, slot) in &cache.index {
            assert_eq!(&cache.nodes[*slot].key, key);
        }

        let charged: usize = cache.nodes.iter().map(|node| node.key.len() + node.value.len()).sum();
        assert_eq!(charged, cache.used_bytes);
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = LruCache::<String>::new(0);
        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
        assert_eq!(cache.max_bytes(), 0);
        assert!(cache.head.is_none());
        assert!(cache.tail.is_none());
    }

    #[test]
    fn remove_from_middle_keeps_links_intact() {
        let mut cache = LruCache::new(0);
        for key in ["a", "b", "c", "d", "e"] {
            cache.add(key, key.to_uppercase());
        }
        assert_eq!(keys(&cache), ["e", "d", "c", "b", "a"]);

        // Oldest lives in slot 0, so removal swaps the newest node into it.
        assert_eq!(cache.remove_oldest().map(|(key, _)| key).as_deref(), Some("a"));
        assert_consistent(&cache);
        assert_eq!(keys(&cache), ["e", "d", "c", "b"]);

        cache.get("c");
        cache.get("b");
        assert_eq!(keys(&cache), ["b", "c", "e", "d"]);
        assert_consistent(&cache);

        while cache.remove_oldest().is_some() {
            assert_consistent(&cache);
        }
        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn replacing_value_recharges_only_value_delta() {
        let mut cache = LruCache::new(0);
        cache.add("key", "12".to_string());
        assert_eq!(cache.used_bytes(), 5);

        cache.add("key", "123456".to_string());
        assert_eq!(cache.used_bytes(), 9);
        assert_eq!(cache.len(), 1);

        cache.add("key", String::new());
        assert_eq!(cache.used_bytes(), 3);
        assert_consistent(&cache);
    }

    #[test]
    fn replacing_value_promotes_entry() {
        let mut cache = LruCache::new(0);
        cache.add("a", "1".to_string());
        cache.add("b", "2".to_string());
        cache.add("a", "3".to_string());

        assert_eq!(keys(&cache), ["a", "b"]);
        assert_eq!(cache.remove_oldest().map(|(key, _)| key).as_deref(), Some("b"));
    }

    #[test]
    fn oversized_entry_evicts_itself() {
        let mut cache = LruCache::new(4);
        cache.add("a", "1".to_string());
        cache.add("huge", "0123456789".to_string());

        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn debug_output_omits_values() {
        let mut cache = LruCache::new(16);
        cache.add("secret", "value".to_string());
        let debug = format!("{cache:?}");

        assert!(debug.contains("used_bytes: 11"), "unexpected debug output: {debug}");
        assert!(!debug.contains("value\""), "unexpected debug output: {debug}");
    }
}
