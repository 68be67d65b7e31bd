// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A namespace-partitioned byte cache that shards misses across peers.
//!
//! A [`Group`] is one cache namespace with its own byte budget and [`Loader`]. Looking up a key
//! runs through three tiers:
//!
//! 1. the group's local LRU cache;
//! 2. the peer that owns the key, chosen by the group's [`PeerPicker`], when that peer is not the
//!    local node. Values fetched from a peer are returned but not cached locally, so each value
//!    lives in the cache of its owner only;
//! 3. the loader, which produces the value from the source of record. Loaded values are cached.
//!
//! A failing peer is logged and the lookup falls back to the loader.
//!
//! Groups are held by a [`GroupRegistry`], which the server side of the peer protocol uses to
//! resolve the namespace named in an incoming request.
//!
//! # Examples
//!
//! ```
//! use shoal::{GroupRegistry, LoaderFn};
//!
//! # futures::executor::block_on(async {
//! let registry = GroupRegistry::new();
//! let scores = registry.new_group(
//!     "scores",
//!     2 << 10,
//!     LoaderFn::new(|key: String| async move {
//!         match key.as_str() {
//!             "Tom" => Ok("630"),
//!             "Jack" => Ok("589"),
//!             _ => Err(format!("{key} not exist")),
//!         }
//!     }),
//! )?;
//!
//! assert_eq!(scores.get("Tom").await?.to_string(), "630");
//! assert!(registry.get("scores").is_some());
//!
//! let missing = scores.get("Kate").await.unwrap_err();
//! assert_eq!(missing.kind(), shoal::ErrorKind::Source);
//! # Ok::<(), shoal::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Logging
//!
//! Lookups emit `tracing` events: `shoal.cache_hit`, `shoal.peer_error`, `shoal.load_error`,
//! `shoal.evicted` and `shoal.group_registered`. No subscriber is installed by this crate.

mod byte_view;
mod cache;
pub mod error;
mod group;
mod loader;
mod peers;
mod registry;
#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

#[doc(inline)]
pub use byte_view::ByteView;
#[doc(inline)]
pub use error::{BoxError, Error, ErrorKind, Result};
#[doc(inline)]
pub use group::{Group, GroupBuilder, GroupStats};
#[doc(inline)]
pub use loader::{DynLoader, Loader, LoaderFn};
#[doc(inline)]
pub use peers::{DynPeerFetcher, PeerFetcher, PeerPicker};
#[doc(inline)]
pub use registry::GroupRegistry;
