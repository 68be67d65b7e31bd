// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A byte-budgeted least-recently-used store keyed by string.
//!
//! [`LruCache`] keeps its entries ordered by recency and evicts from the least recently used end
//! whenever the accounted size of the resident entries exceeds the configured byte budget. The
//! accounted size of an entry is the length of its key plus the [`ByteLen`] of its value.
//!
//! The cache is not synchronized. Wrap it in a lock to share it between threads.
//!
//! # Examples
//!
//! ```
//! use shoal_lru::LruCache;
//!
//! // Room for exactly two entries of 2 + 2 bytes each.
//! let mut cache = LruCache::new(8);
//! cache.add("k1", "v1".to_string());
//! cache.add("k2", "v2".to_string());
//!
//! // Touch k1 so that k2 becomes the least recently used entry.
//! assert_eq!(cache.get("k1").map(String::as_str), Some("v1"));
//!
//! cache.add("k3", "v3".to_string());
//! assert!(cache.get("k2").is_none());
//! assert_eq!(cache.len(), 2);
//! ```

mod cache;

#[doc(inline)]
pub use cache::{EvictionCallback, Iter, LruCache};

/// Values stored in an [`LruCache`] report how many bytes they account for.
///
/// The reported length is what the cache charges against its byte budget. It should be stable for
/// as long as the value is resident.
pub trait ByteLen {
    /// Returns the number of bytes this value accounts for.
    fn byte_len(&self) -> usize;
}

impl ByteLen for String {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteLen for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteLen for Box<[u8]> {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteLen for &str {
    fn byte_len(&self) -> usize {
        self.len()
    }
}
