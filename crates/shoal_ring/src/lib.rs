// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A consistent hash ring for picking the peer that owns a key.
//!
//! Every peer added to a [`Ring`] is represented by `replicas` virtual nodes. The virtual node
//! `i` of peer `p` sits at position `hash("{i}{p}")` on a 32-bit ring. A key is owned by the
//! first virtual node whose position is at or after `hash(key)`, wrapping around to the lowest
//! position when the key hashes past the last one.
//!
//! Spreading each peer over many positions keeps the key space evenly split, and adding or
//! removing one of `N` peers only moves about `1/N` of the keys.
//!
//! # Examples
//!
//! ```
//! use shoal_ring::Ring;
//!
//! let mut ring = Ring::default();
//! ring.add(["http://10.0.0.1:8008", "http://10.0.0.2:8008", "http://10.0.0.3:8008"]);
//!
//! let owner = ring.get("user:42").unwrap();
//! assert_eq!(ring.get("user:42"), Some(owner));
//! ```

use std::fmt::Debug;

/// Number of virtual nodes created per peer by [`Ring::default`].
pub const DEFAULT_REPLICAS: usize = 50;

/// A hash function placing keys and virtual nodes on the ring.
pub type HashFn = fn(&[u8]) -> u32;

/// The hash used by [`Ring::new`]: CRC-32 (IEEE).
pub const DEFAULT_HASH: HashFn = crc32fast::hash;

/// Maps keys to peers using consistent hashing with virtual nodes.
///
/// Lookups are `O(log n)` in the number of virtual nodes. The ring is a plain value; share it
/// behind a lock when membership changes concurrently with lookups.
#[derive(Clone, Debug)]
pub struct Ring {
    replicas: usize,
    hash: HashFn,
    /// Virtual node positions sorted ascending, each with the index of its peer in `peers`.
    positions: Vec<(u32, usize)>,
    peers: Vec<String>,
}

impl Default for Ring {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

impl Ring {
    /// Creates an empty ring hashing with CRC-32 (IEEE).
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, DEFAULT_HASH)
    }

    /// Creates an empty ring with a custom hash function.
    ///
    /// The function must be deterministic: every node sharing a key space has to agree on it.
    ///
    /// # Examples
    ///
    /// ```
    /// use shoal_ring::Ring;
    ///
    /// let mut ring = Ring::with_hasher(1, |bytes| bytes.len() as u32);
    /// ring.add(["ab", "abcd"]);
    ///
    /// // "0ab" hashes to 3 and "0abcd" to 5.
    /// assert_eq!(ring.get("x"), Some("ab"));
    /// assert_eq!(ring.get("xxxx"), Some("abcd"));
    /// assert_eq!(ring.get("xxxxxx"), Some("ab"));
    /// ```
    #[must_use]
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            replicas,
            hash,
            positions: Vec::new(),
            peers: Vec::new(),
        }
    }

    /// Adds peers to the ring.
    ///
    /// Peers that are already members are skipped. When two virtual nodes land on the same
    /// position, the one inserted first keeps it.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for peer in peers {
            let peer = peer.into();
            if self.peers.contains(&peer) {
                continue;
            }

            let owner = self.peers.len();
            self.positions
                .extend((0..self.replicas).map(|i| ((self.hash)(format!("{i}{peer}").as_bytes()), owner)));
            self.peers.push(peer);
        }

        // Stable sort keeps earlier insertions ahead of later ones on equal positions.
        self.positions.sort_by_key(|&(position, _)| position);
        self.positions.dedup_by_key(|&mut (position, _)| position);
    }

    /// Returns the peer owning `key`, or `None` when the ring has no peers.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let index = self.positions.partition_point(|&(position, _)| position < hash);
        let (_, owner) = self.positions[index % self.positions.len()];
        Some(&self.peers[owner])
    }

    /// Returns the number of peers on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if no peer has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Returns the number of virtual nodes created per peer.
    #[must_use]
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Iterates over the peers in insertion order.
    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.peers.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(bytes: &[u8]) -> u32 {
        std::str::from_utf8(bytes).unwrap().parse().unwrap()
    }

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = Ring::default();
        assert!(ring.is_empty());
        assert_eq!(ring.get("anything"), None);
    }

    #[test]
    fn positions_stay_sorted_with_one_entry_per_virtual_node() {
        let mut ring = Ring::new(10);
        ring.add(["a", "b"]);
        ring.add(["c"]);

        assert_eq!(ring.positions.len(), 30);
        assert!(ring.positions.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn duplicate_peer_is_ignored() {
        let mut ring = Ring::new(5);
        ring.add(["a", "a"]);
        ring.add(["a"]);

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.positions.len(), 5);
    }

    #[test]
    fn colliding_position_keeps_first_owner() {
        // "0a" and "0b" both hash to 2.
        let mut ring = Ring::with_hasher(1, |bytes| bytes.len() as u32);
        ring.add(["a", "b"]);

        assert_eq!(ring.positions, [(2, 0)]);
        assert_eq!(ring.get("k"), Some("a"));
    }

    #[test]
    fn virtual_nodes_hash_index_then_peer() {
        let mut ring = Ring::with_hasher(3, numeric);
        ring.add(["6", "4", "2"]);

        let positions: Vec<u32> = ring.positions.iter().map(|&(position, _)| position).collect();
        assert_eq!(positions, [2, 4, 6, 12, 14, 16, 22, 24, 26]);
    }
}
