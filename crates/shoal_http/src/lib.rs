// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The HTTP peer protocol for `shoal`.
//!
//! Every node of a fleet runs a [`PeerServer`] that answers
//! `GET {base_path}{namespace}/{key}` from its [`GroupRegistry`](shoal::GroupRegistry), and
//! registers an [`HttpPool`] as the peer picker of its groups. The pool places the fleet on a
//! consistent hash ring, so every node agrees on which one owns a key; keys owned by other nodes
//! are fetched from them through an [`HttpFetcher`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use shoal::{GroupRegistry, LoaderFn};
//! use shoal_http::{HttpPool, PeerServer};
//!
//! let registry = Arc::new(GroupRegistry::new());
//! let scores = registry
//!     .new_group("scores", 2 << 10, LoaderFn::new(|key: String| async move { Ok::<_, &str>(key) }))
//!     .unwrap();
//!
//! let pool = Arc::new(HttpPool::new("http://10.0.0.1:8001"));
//! pool.set_peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001", "http://10.0.0.3:8001"]);
//! scores.register_peers(pool).unwrap();
//!
//! // Serve `PeerServer::handle` from the node's HTTP listener.
//! let server = PeerServer::new(registry);
//! assert_eq!(server.base_path(), shoal_http::DEFAULT_BASE_PATH);
//! ```

mod client;
mod pool;
mod server;

/// Path prefix under which peers serve group lookups.
pub const DEFAULT_BASE_PATH: &str = "/_shoal/";

#[doc(inline)]
pub use client::HttpFetcher;
#[doc(inline)]
pub use pool::{HttpPool, HttpPoolBuilder};
#[doc(inline)]
pub use server::PeerServer;

/// Makes `base_path` start and end with a slash.
fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}
