// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for loaders and peers.
//!
//! [`MockLoader`] and [`MockPeer`] serve values from an in-memory map, record every call, and
//! can be told to fail on demand for exercising fallback paths.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{BoxError, DynPeerFetcher, Error, Loader, PeerFetcher, PeerPicker};

type KeyPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    data: Mutex<HashMap<String, Bytes>>,
    calls: Mutex<Vec<String>>,
    fail_when: Mutex<Option<KeyPredicate>>,
}

impl State {
    fn with_data<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bytes>,
    {
        let state = Self::default();
        state
            .data
            .lock()
            .extend(data.into_iter().map(|(key, value)| (key.into(), value.into())));
        state
    }

    fn should_fail(&self, key: &str) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(key))
    }

    fn lookup(&self, key: &str) -> Option<Bytes> {
        self.calls.lock().push(key.to_owned());
        if self.should_fail(key) {
            return None;
        }
        self.data.lock().get(key).cloned()
    }

    fn count(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == key).count()
    }
}

/// A loader backed by an in-memory map.
///
/// Keys missing from the map fail with `"{key} not exist"`. Clones share their data and their
/// call log.
#[derive(Clone, Default)]
pub struct MockLoader {
    state: Arc<State>,
}

impl MockLoader {
    /// Creates a loader with no data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader serving the given key/value pairs.
    #[must_use]
    pub fn with_data<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bytes>,
    {
        Self {
            state: Arc::new(State::with_data(data)),
        }
    }

    /// Makes loads fail for every key matching `predicate`.
    pub fn fail_when(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        *self.state.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Returns every key passed to [`load`](Loader::load), in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().clone()
    }

    /// Returns how many times `key` was loaded.
    #[must_use]
    pub fn load_count(&self, key: &str) -> usize {
        self.state.count(key)
    }
}

impl Debug for MockLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockLoader")
            .field("data", &self.state.data)
            .field("calls", &self.state.calls)
            .field("fail_when", &self.state.fail_when.lock().is_some())
            .finish()
    }
}

impl Loader for MockLoader {
    async fn load(&self, key: &str) -> Result<Bytes, BoxError> {
        self.state.lookup(key).ok_or_else(|| format!("{key} not exist").into())
    }
}

/// A remote peer backed by an in-memory map.
///
/// As a [`PeerFetcher`] it answers fetches from its map; keys it does not hold, or that match
/// the failure predicate, fail with [`ErrorKind::PeerProtocol`](crate::ErrorKind::PeerProtocol).
/// As a [`PeerPicker`] it claims every key accepted by [`owns`](Self::owns), which defaults to
/// all keys, and hands out itself as the fetcher. Clones share their data and their call log.
#[derive(Clone)]
pub struct MockPeer {
    state: Arc<State>,
    owns: Arc<Mutex<KeyPredicate>>,
}

impl Default for MockPeer {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            owns: Arc::new(Mutex::new(Box::new(|_| true))),
        }
    }
}

impl MockPeer {
    /// Creates a peer with no data that owns every key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a peer serving the given key/value pairs.
    #[must_use]
    pub fn with_data<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bytes>,
    {
        Self {
            state: Arc::new(State::with_data(data)),
            ..Self::default()
        }
    }

    /// Restricts the keys this peer claims when used as a picker.
    pub fn owns(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        *self.owns.lock() = Box::new(predicate);
    }

    /// Makes fetches fail for every key matching `predicate`.
    pub fn fail_when(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        *self.state.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Returns every fetch as `"{namespace}/{key}"`, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().clone()
    }

    /// Returns how many times `key` was fetched from `namespace`.
    #[must_use]
    pub fn fetch_count(&self, namespace: &str, key: &str) -> usize {
        self.state.count(&format!("{namespace}/{key}"))
    }
}

impl Debug for MockPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPeer")
            .field("data", &self.state.data)
            .field("calls", &self.state.calls)
            .field("fail_when", &self.state.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl PeerFetcher for MockPeer {
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Bytes, Error> {
        self.state.calls.lock().push(format!("{namespace}/{key}"));
        if self.state.should_fail(key) {
            return Err(Error::peer_protocol("mock: fetch failed"));
        }
        self.state
            .data
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::peer_protocol(format!("mock: {key} not found")))
    }
}

impl PeerPicker for MockPeer {
    fn pick_peer(&self, key: &str) -> Option<Arc<DynPeerFetcher<'static>>> {
        let owned = (*self.owns.lock())(key);
        owned.then(|| DynPeerFetcher::new_arc(self.clone()))
    }
}
