// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Traits connecting a group to the peers that share its key space.

use std::sync::Arc;

use bytes::Bytes;

use crate::Error;

/// Chooses the peer that owns a key.
///
/// Implementations typically place peers on a consistent hash ring. Returning `None` tells the
/// group to serve the key locally, either because there are no peers or because the local node
/// owns the key. A picker must never return a fetcher pointing back at the local node.
pub trait PeerPicker: Send + Sync {
    /// Returns the fetcher for the peer owning `key`, or `None` to serve it locally.
    fn pick_peer(&self, key: &str) -> Option<Arc<DynPeerFetcher<'static>>>;
}

/// Fetches a value from a group on a remote peer.
///
/// Failures are reported with [`Error::peer_transport`] when the peer could not be reached or
/// its answer could not be read, and with [`Error::peer_protocol`] when it answered with a
/// failure status.
#[dynosaur::dynosaur(pub DynPeerFetcher = dyn(box) PeerFetcher, bridge(none))]
pub trait PeerFetcher: Send + Sync {
    /// Fetches `key` from the group named `namespace` on the peer.
    fn fetch(&self, namespace: &str, key: &str) -> impl Future<Output = Result<Bytes, Error>> + Send;
}
