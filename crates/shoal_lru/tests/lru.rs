// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the byte-budgeted LRU store.

use std::sync::{Arc, Mutex};

use rstest::rstest;
use shoal_lru::{ByteLen, LruCache};

#[test]
fn get_hit_and_miss() {
    let mut cache = LruCache::new(0);
    cache.add("key1", "1234".to_string());

    assert_eq!(cache.get("key1").map(String::as_str), Some("1234"));
    assert!(cache.get("key2").is_none());
}

#[test]
fn remove_oldest_when_budget_exceeded() {
    let (k1, k2, k3) = ("key1", "key2", "k3");
    let (v1, v2, v3) = ("value1", "value2", "v3");
    let budget = k1.len() + k2.len() + v1.len() + v2.len();

    let mut cache = LruCache::new(budget);
    cache.add(k1, v1.to_string());
    cache.add(k2, v2.to_string());
    cache.add(k3, v3.to_string());

    assert!(cache.get(k1).is_none());
    assert_eq!(cache.len(), 2);
}

#[test]
fn eviction_callback_fires_in_lru_order() {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let mut cache = LruCache::with_eviction_callback(10, move |key: &str, value: &String| {
        sink.lock().unwrap().push((key.to_string(), value.clone()));
    });

    cache.add("key1", "123456".to_string());
    cache.add("k2", "k2".to_string());
    cache.add("k3", "k3".to_string());
    cache.add("k4", "k4".to_string());

    assert_eq!(
        *evicted.lock().unwrap(),
        [
            ("key1".to_string(), "123456".to_string()),
            ("k2".to_string(), "k2".to_string())
        ]
    );
    let resident: Vec<&str> = cache.iter().map(|(key, _)| key).collect();
    assert_eq!(resident, ["k4", "k3"]);
}

#[test]
fn get_hit_protects_entry_from_next_eviction() {
    let mut cache = LruCache::new(6);
    cache.add("a", "1".to_string());
    cache.add("b", "2".to_string());
    cache.add("c", "3".to_string());

    // "a" is the oldest until it is read.
    assert!(cache.get("a").is_some());
    cache.add("d", "4".to_string());

    assert!(cache.get("b").is_none());
    assert!(cache.get("a").is_some());
    assert!(cache.get("c").is_some());
    assert!(cache.get("d").is_some());
}

#[test]
fn remove_oldest_on_empty_cache_is_none() {
    let mut cache = LruCache::<String>::new(0);
    assert!(cache.remove_oldest().is_none());
}

#[test]
fn zero_budget_never_evicts() {
    let mut cache = LruCache::new(0);
    for i in 0..1_000 {
        cache.add(format!("key-{i}"), vec![0_u8; 64]);
    }

    assert_eq!(cache.len(), 1_000);
    assert!(cache.get("key-0").is_some());
}

#[rstest]
#[case::tight(8)]
#[case::medium(64)]
#[case::roomy(512)]
fn budget_holds_after_every_add(#[case] budget: usize) {
    let mut cache = LruCache::new(budget);

    // Deterministic mix of new keys, overwrites and reads with varying value sizes.
    for i in 0_usize..500 {
        let key = format!("k{}", (i * 7) % 37);
        let value = "x".repeat((i * 13) % 23);
        cache.add(key, value);
        if i % 3 == 0 {
            let _ = cache.get(&format!("k{}", i % 37));
        }

        let charged: usize = cache.iter().map(|(key, value)| key.len() + value.byte_len()).sum();
        assert_eq!(charged, cache.used_bytes());
        assert!(cache.used_bytes() <= budget, "{} > {budget}", cache.used_bytes());
    }
}

#[test]
fn eviction_never_removes_more_recent_entry_first() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&order);
    let mut cache = LruCache::with_eviction_callback(0, move |key: &str, _: &Vec<u8>| {
        sink.lock().unwrap().push(key.to_string());
    });

    for key in ["a", "b", "c", "d"] {
        cache.add(key, vec![1]);
    }
    cache.get("b");
    cache.get("a");

    while cache.remove_oldest().is_some() {}

    assert_eq!(*order.lock().unwrap(), ["c", "d", "b", "a"]);
}

#[test]
fn byte_len_of_builtin_values() {
    assert_eq!("abc".byte_len(), 3);
    assert_eq!("héllo".to_string().byte_len(), 6);
    assert_eq!(vec![0_u8; 5].byte_len(), 5);
    assert_eq!(vec![1_u8, 2].into_boxed_slice().byte_len(), 2);
}
