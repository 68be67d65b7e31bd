// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for key placement on the consistent hash ring.

use std::collections::HashMap;

use rstest::rstest;
use shoal_ring::{DEFAULT_REPLICAS, Ring};

const KEY_COUNT: usize = 2_000;

fn numeric(bytes: &[u8]) -> u32 {
    std::str::from_utf8(bytes).unwrap().parse().unwrap()
}

fn peer(i: usize) -> String {
    format!("http://10.0.0.{i}:8008")
}

fn ring_of(peers: &[String]) -> Ring {
    let mut ring = Ring::default();
    ring.add(peers.iter().cloned());
    ring
}

fn assignments(ring: &Ring) -> HashMap<String, String> {
    (0..KEY_COUNT)
        .map(|i| {
            let key = format!("key-{i}");
            let owner = ring.get(&key).unwrap().to_string();
            (key, owner)
        })
        .collect()
}

#[test]
fn keys_map_to_owning_virtual_node() {
    let mut ring = Ring::with_hasher(3, numeric);

    // Positions: 2, 4, 6, 12, 14, 16, 22, 24, 26.
    ring.add(["6", "4", "2"]);

    for (key, owner) in [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")] {
        assert_eq!(ring.get(key), Some(owner), "key {key}");
    }

    // Adds 8, 18, 28; 27 now lands on 28.
    ring.add(["8"]);

    for (key, owner) in [("2", "2"), ("11", "2"), ("23", "4"), ("27", "8")] {
        assert_eq!(ring.get(key), Some(owner), "key {key}");
    }
}

#[test]
fn identical_membership_yields_identical_assignment() {
    let peers: Vec<String> = (1..=4).map(peer).collect();
    let first = ring_of(&peers);

    let mut reversed = Ring::default();
    reversed.add(peers.iter().rev().cloned());

    assert_eq!(assignments(&first), assignments(&first));
    assert_eq!(assignments(&first), assignments(&reversed));
}

#[rstest]
#[case(2)]
#[case(4)]
#[case(8)]
fn adding_a_peer_moves_keys_only_to_that_peer(#[case] existing: usize) {
    let mut peers: Vec<String> = (1..=existing).map(peer).collect();
    let before = assignments(&ring_of(&peers));

    let newcomer = peer(existing + 1);
    peers.push(newcomer.clone());
    let after = assignments(&ring_of(&peers));

    let moved: Vec<&String> = before.keys().filter(|key| before[*key] != after[*key]).collect();
    for key in &moved {
        assert_eq!(after[*key], newcomer, "key {key} moved to an old peer");
    }

    // Expected share is 1 / (existing + 1); allow generous slack for hash variance.
    let expected = KEY_COUNT / (existing + 1);
    assert!(!moved.is_empty(), "new peer received no keys");
    assert!(moved.len() < expected * 2, "{} keys moved, expected about {expected}", moved.len());
}

#[test]
fn removing_a_peer_moves_only_its_keys() {
    let peers: Vec<String> = (1..=5).map(peer).collect();
    let before = assignments(&ring_of(&peers));

    let removed = peer(3);
    let remaining: Vec<String> = peers.iter().filter(|p| **p != removed).cloned().collect();
    let after = assignments(&ring_of(&remaining));

    for (key, owner) in &before {
        if *owner == removed {
            assert_ne!(after[key], removed);
        } else {
            assert_eq!(&after[key], owner, "key {key} was not owned by the removed peer");
        }
    }
}

#[test]
fn every_peer_owns_part_of_the_key_space() {
    let peers: Vec<String> = (1..=5).map(peer).collect();
    let ring = ring_of(&peers);
    assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
    assert_eq!(ring.peers().count(), 5);

    let mut owned: HashMap<String, usize> = HashMap::new();
    for owner in assignments(&ring).into_values() {
        *owned.entry(owner).or_default() += 1;
    }

    assert_eq!(owned.len(), peers.len());
}
