// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;
use shoal::{DynPeerFetcher, PeerPicker};
use shoal_ring::{DEFAULT_HASH, DEFAULT_REPLICAS, HashFn, Ring};

use crate::client::{HttpClient, HttpFetcher, http_client};
use crate::{DEFAULT_BASE_PATH, normalize_base_path};

/// The peer picker of one node, placing the fleet on a consistent hash ring.
///
/// Every peer is identified by its base URL, such as `http://10.0.0.2:8001`, and the node
/// identifies itself the same way. Trailing slashes are dropped, so `http://10.0.0.2:8001/`
/// names the same peer. Keys whose owner is the node itself are served locally;
/// other keys are fetched from their owner with an [`HttpFetcher`]. All nodes of a fleet must
/// use the same peer list, replica count and hash function to agree on ownership.
///
/// # Examples
///
/// ```
/// use shoal::PeerPicker;
/// use shoal_http::HttpPool;
///
/// let pool = HttpPool::builder("http://10.0.0.1:8001")
///     .base_path("/cache/")
///     .replicas(100)
///     .peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001"])
///     .build();
///
/// assert_eq!(pool.peers(), ["http://10.0.0.1:8001", "http://10.0.0.2:8001"]);
///
/// // Keys either belong to this node or to the other one.
/// let remote = (0..100).filter(|i| pool.pick_peer(&format!("key-{i}")).is_some()).count();
/// assert!(remote > 0 && remote < 100);
/// ```
pub struct HttpPool {
    self_url: String,
    base_path: String,
    replicas: usize,
    hash: HashFn,
    client: HttpClient,
    state: Mutex<PoolState>,
}

struct PoolState {
    ring: Ring,
    fetchers: HashMap<String, Arc<DynPeerFetcher<'static>>>,
}

impl HttpPool {
    /// Creates a pool with default settings and no peers for the node at `self_url`.
    #[must_use]
    pub fn new(self_url: impl Into<String>) -> Self {
        Self::builder(self_url).build()
    }

    /// Starts building a pool for the node at `self_url`.
    pub fn builder(self_url: impl Into<String>) -> HttpPoolBuilder {
        HttpPoolBuilder {
            self_url: self_url.into(),
            base_path: DEFAULT_BASE_PATH.to_owned(),
            replicas: DEFAULT_REPLICAS,
            hash: DEFAULT_HASH,
            peers: Vec::new(),
        }
    }

    /// Returns the URL identifying this node.
    #[must_use]
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Returns the path prefix peers serve lookups under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Replaces the fleet membership.
    ///
    /// The list should include this node's own URL. The ring and the fetchers are rebuilt
    /// together, so concurrent picks observe either the old or the new membership.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ring = Ring::with_hasher(self.replicas, self.hash);
        ring.add(peers.into_iter().map(|peer| peer_url(peer.into())));
        let fetchers = ring
            .peers()
            .map(|peer| {
                let fetcher = HttpFetcher::with_client(format!("{peer}{}", self.base_path), self.client.clone());
                (peer.to_owned(), DynPeerFetcher::new_arc(fetcher))
            })
            .collect();

        let count = ring.len();
        *self.state.lock() = PoolState { ring, fetchers };

        tracing::event!(
            name: "shoal.peers_updated",
            tracing::Level::INFO,
            pool.self_url = %self.self_url,
            pool.peer_count = count,
            "peer membership updated",
        );
    }

    /// Returns the current peers in the order they were set, without duplicates.
    #[must_use]
    pub fn peers(&self) -> Vec<String> {
        self.state.lock().ring.peers().map(str::to_owned).collect()
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<DynPeerFetcher<'static>>> {
        let state = self.state.lock();
        let peer = state.ring.get(key)?;
        if peer == self.self_url {
            return None;
        }

        tracing::event!(
            name: "shoal.peer_picked",
            tracing::Level::DEBUG,
            pool.self_url = %self.self_url,
            cache.key = key,
            peer.url = peer,
            "picked remote owner",
        );
        state.fetchers.get(peer).cloned()
    }
}

impl Debug for HttpPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_url", &self.self_url)
            .field("base_path", &self.base_path)
            .field("replicas", &self.replicas)
            .field("peers", &self.peers())
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpPool`], created by [`HttpPool::builder`].
#[derive(Debug)]
pub struct HttpPoolBuilder {
    self_url: String,
    base_path: String,
    replicas: usize,
    hash: HashFn,
    peers: Vec<String>,
}

impl HttpPoolBuilder {
    /// Sets the path prefix peers serve lookups under. Defaults to [`DEFAULT_BASE_PATH`].
    #[must_use]
    pub fn base_path(mut self, base_path: impl AsRef<str>) -> Self {
        self.base_path = normalize_base_path(base_path.as_ref());
        self
    }

    /// Sets the number of ring positions per peer. Defaults to [`DEFAULT_REPLICAS`].
    #[must_use]
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Sets the hash function placing keys and peers on the ring. Defaults to CRC-32 (IEEE).
    #[must_use]
    pub fn hasher(mut self, hash: HashFn) -> Self {
        self.hash = hash;
        self
    }

    /// Sets the initial fleet membership.
    #[must_use]
    pub fn peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the pool.
    #[must_use]
    pub fn build(self) -> HttpPool {
        let pool = HttpPool {
            self_url: peer_url(self.self_url),
            base_path: self.base_path,
            replicas: self.replicas,
            hash: self.hash,
            client: http_client(),
            state: Mutex::new(PoolState {
                ring: Ring::with_hasher(self.replicas, self.hash),
                fetchers: HashMap::new(),
            }),
        };
        if !self.peers.is_empty() {
            pool.set_peers(self.peers);
        }
        pool
    }
}

fn peer_url(mut url: String) -> String {
    url.truncate(url.trim_end_matches('/').len());
    url
}
