// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};

use bytes::Bytes;

use crate::BoxError;

/// Produces values from the source of record when no cache holds them.
///
/// A group calls its loader only after a local miss, and only when no remote peer supplied the
/// value. Any error is opaque to the group and is returned as the cause of an
/// [`ErrorKind::Source`](crate::ErrorKind::Source) error.
///
/// Closures can be used through [`LoaderFn`]. Implement the trait directly for loaders that
/// carry state, such as a database handle.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use bytes::Bytes;
/// use shoal::{BoxError, Loader};
///
/// struct Scores(HashMap<String, String>);
///
/// impl Loader for Scores {
///     async fn load(&self, key: &str) -> Result<Bytes, BoxError> {
///         self.0
///             .get(key)
///             .map(|score| Bytes::from(score.clone()))
///             .ok_or_else(|| format!("{key} not exist").into())
///     }
/// }
/// ```
#[dynosaur::dynosaur(pub DynLoader = dyn(box) Loader, bridge(none))]
pub trait Loader: Send + Sync {
    /// Loads the value for `key`.
    fn load(&self, key: &str) -> impl Future<Output = Result<Bytes, BoxError>> + Send;
}

/// Adapts an async closure into a [`Loader`].
///
/// The closure receives an owned key and may return any value convertible into [`Bytes`] and any
/// error convertible into a [`BoxError`].
///
/// # Examples
///
/// ```
/// use shoal::{Loader, LoaderFn};
///
/// # futures::executor::block_on(async {
/// let loader = LoaderFn::new(|key: String| async move {
///     if key == "Tom" { Ok("630") } else { Err("not found") }
/// });
///
/// assert_eq!(loader.load("Tom").await.unwrap(), "630");
/// assert!(loader.load("Kate").await.is_err());
/// # });
/// ```
#[derive(Clone)]
pub struct LoaderFn<F>(F);

impl<F> LoaderFn<F> {
    /// Wraps `load` as a loader.
    pub fn new(load: F) -> Self {
        Self(load)
    }
}

impl<F> Debug for LoaderFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderFn").finish_non_exhaustive()
    }
}

impl<F, Fut, V, E> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, E>> + Send,
    V: Into<Bytes>,
    E: Into<BoxError>,
{
    async fn load(&self, key: &str) -> Result<Bytes, BoxError> {
        (self.0)(key.to_owned()).await.map(Into::into).map_err(Into::into)
    }
}
