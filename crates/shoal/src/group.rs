// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::cache::GuardedCache;
use crate::{ByteView, DynLoader, Error, Loader, PeerFetcher, PeerPicker, Result};

/// One cache namespace.
///
/// A group owns a byte-budgeted local cache, the [`Loader`] for its source of record and,
/// optionally, a [`PeerPicker`] that spreads the key space over a fleet of nodes. See
/// [`Group::get`] for the lookup order.
///
/// Groups are created with [`Group::builder`] or [`GroupRegistry::new_group`](crate::GroupRegistry::new_group)
/// and are shared as `Arc<Group>`.
pub struct Group {
    name: Arc<str>,
    loader: Arc<DynLoader<'static>>,
    main_cache: GuardedCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    stats: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    peer_loads: AtomicU64,
    peer_errors: AtomicU64,
    local_loads: AtomicU64,
    local_load_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A snapshot of a group's activity.
///
/// All fields except `cached_entries` and `cached_bytes` are counters that only grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct GroupStats {
    /// Lookups with a non-empty key.
    pub gets: u64,
    /// Lookups served from the local cache.
    pub cache_hits: u64,
    /// Lookups served by a remote peer.
    pub peer_loads: u64,
    /// Remote fetches that failed and fell back to the loader.
    pub peer_errors: u64,
    /// Lookups served by the loader.
    pub local_loads: u64,
    /// Loader calls that failed.
    pub local_load_errors: u64,
    /// Entries evicted from the local cache.
    pub evictions: u64,
    /// Entries currently in the local cache.
    pub cached_entries: usize,
    /// Bytes currently charged against the local cache budget.
    pub cached_bytes: usize,
}

impl Group {
    /// Starts building a group named `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shoal::{Group, LoaderFn};
    ///
    /// let group = Group::builder("scores")
    ///     .cache_bytes(2 << 10)
    ///     .loader(LoaderFn::new(|key: String| async move { Ok::<_, &str>(key) }))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(group.name(), "scores");
    /// assert_eq!(group.cache_bytes(), 2048);
    /// ```
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder {
            name: name.into(),
            cache_bytes: 0,
            loader: None,
            peers: None,
        }
    }

    /// Returns the namespace of this group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the byte budget of the local cache. Zero means unbounded.
    #[must_use]
    pub fn cache_bytes(&self) -> usize {
        self.main_cache.cache_bytes()
    }

    /// Attaches the picker that decides which peer owns a key.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Misconfiguration`](crate::ErrorKind::Misconfiguration) when a
    /// picker is already attached.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        match self.peers.set(peers) {
            Ok(()) => Ok(()),
            Err(_rejected) => Err(Error::misconfigured(format!("peers already registered for group {}", self.name))),
        }
    }

    /// Returns the value for `key`.
    ///
    /// The local cache is consulted first. On a miss the value is fetched from the peer owning
    /// the key, and is returned without being cached locally. When no remote peer owns the key,
    /// or the fetch fails, the loader produces the value and it is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`](crate::ErrorKind::InvalidKey) for an empty key and
    /// [`ErrorKind::Source`](crate::ErrorKind::Source) when the loader fails. Peer failures are
    /// never returned; they fall back to the loader.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::invalid_key());
        }
        Counters::bump(&self.stats.gets);

        if let Some(value) = self.main_cache.get(key) {
            Counters::bump(&self.stats.cache_hits);
            tracing::event!(
                name: "shoal.cache_hit",
                tracing::Level::DEBUG,
                group.name = %self.name,
                cache.key = key,
                "served from local cache",
            );
            return Ok(value);
        }

        self.load(key).await
    }

    /// Returns the value for `key` if the local cache holds it.
    ///
    /// Never consults peers or the loader, and does not count as a lookup in [`stats`](Self::stats).
    #[must_use]
    pub fn get_local(&self, key: &str) -> Option<ByteView> {
        self.main_cache.get(key)
    }

    /// Returns a snapshot of this group's counters and cache usage.
    #[must_use]
    pub fn stats(&self) -> GroupStats {
        let (cached_entries, cached_bytes) = self.main_cache.usage();
        GroupStats {
            gets: self.stats.gets.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            peer_loads: self.stats.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.stats.peer_errors.load(Ordering::Relaxed),
            local_loads: self.stats.local_loads.load(Ordering::Relaxed),
            local_load_errors: self.stats.local_load_errors.load(Ordering::Relaxed),
            evictions: self.main_cache.evictions(),
            cached_entries,
            cached_bytes,
        }
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        if let Some(peer) = self.peers.get().and_then(|peers| peers.pick_peer(key)) {
            match peer.fetch(&self.name, key).await {
                Ok(bytes) => {
                    Counters::bump(&self.stats.peer_loads);
                    return Ok(ByteView::from(bytes));
                }
                Err(error) => {
                    Counters::bump(&self.stats.peer_errors);
                    tracing::event!(
                        name: "shoal.peer_error",
                        tracing::Level::WARN,
                        group.name = %self.name,
                        cache.key = key,
                        error.kind = %error.kind(),
                        error.message = %error,
                        "peer fetch failed, loading locally",
                    );
                }
            }
        }

        self.load_locally(key).await
    }

    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        match self.loader.load(key).await {
            Ok(bytes) => {
                Counters::bump(&self.stats.local_loads);
                let value = ByteView::from(bytes);
                self.main_cache.add(key, value.clone());
                Ok(value)
            }
            Err(error) => {
                Counters::bump(&self.stats.local_load_errors);
                tracing::event!(
                    name: "shoal.load_error",
                    tracing::Level::DEBUG,
                    group.name = %self.name,
                    cache.key = key,
                    error.message = %error,
                    "loader failed",
                );
                Err(Error::source_failed(error))
            }
        }
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("main_cache", &self.main_cache)
            .field("has_peers", &self.peers.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Group`], created by [`Group::builder`].
pub struct GroupBuilder {
    name: String,
    cache_bytes: usize,
    loader: Option<Arc<DynLoader<'static>>>,
    peers: Option<Arc<dyn PeerPicker>>,
}

impl GroupBuilder {
    /// Sets the byte budget of the local cache. Defaults to zero, which disables eviction.
    #[must_use]
    pub fn cache_bytes(mut self, cache_bytes: usize) -> Self {
        self.cache_bytes = cache_bytes;
        self
    }

    /// Sets the loader for the source of record. Required.
    #[must_use]
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(DynLoader::new_arc(loader));
        self
    }

    /// Attaches the peer picker up front instead of through [`Group::register_peers`].
    #[must_use]
    pub fn peers(mut self, peers: Arc<dyn PeerPicker>) -> Self {
        self.peers = Some(peers);
        self
    }

    /// Builds the group.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Misconfiguration`](crate::ErrorKind::Misconfiguration) when the
    /// name is empty or no loader was set.
    pub fn build(self) -> Result<Group> {
        if self.name.is_empty() {
            return Err(Error::misconfigured("group name must not be empty"));
        }
        let Some(loader) = self.loader else {
            return Err(Error::misconfigured(format!("group {} has no loader", self.name)));
        };

        let name: Arc<str> = Arc::from(self.name);
        let peers = self.peers.map_or_else(OnceLock::new, OnceLock::from);

        Ok(Group {
            main_cache: GuardedCache::new(Arc::clone(&name), self.cache_bytes),
            name,
            loader,
            peers,
            stats: Counters::default(),
        })
    }
}

impl Debug for GroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache_bytes)
            .field("has_loader", &self.loader.is_some())
            .field("has_peers", &self.peers.is_some())
            .finish()
    }
}
