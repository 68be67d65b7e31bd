// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;
use pct_str::PctStr;
use shoal::GroupRegistry;

use crate::{DEFAULT_BASE_PATH, normalize_base_path};

/// Answers peer lookups from a [`GroupRegistry`].
///
/// The server is independent of the transport: pass each request received by the node's HTTP
/// listener to [`handle`](Self::handle) and send back the response.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use http::{Request, StatusCode};
/// use shoal::{GroupRegistry, LoaderFn};
/// use shoal_http::PeerServer;
///
/// # futures::executor::block_on(async {
/// let registry = Arc::new(GroupRegistry::new());
/// registry
///     .new_group("scores", 0, LoaderFn::new(|_key: String| async { Ok::<_, &str>("630") }))
///     .unwrap();
/// let server = PeerServer::new(registry);
///
/// let response = server.handle(Request::get("/_shoal/scores/Tom").body(()).unwrap()).await;
/// assert_eq!(response.status(), StatusCode::OK);
///
/// let response = server.handle(Request::get("/_shoal/names/Tom").body(()).unwrap()).await;
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// # });
/// ```
pub struct PeerServer {
    registry: Arc<GroupRegistry>,
    base_path: String,
}

impl PeerServer {
    /// Creates a server for the groups of `registry`, under [`DEFAULT_BASE_PATH`].
    #[must_use]
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self {
            registry,
            base_path: DEFAULT_BASE_PATH.to_owned(),
        }
    }

    /// Serves lookups under `base_path` instead of [`DEFAULT_BASE_PATH`].
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl AsRef<str>) -> Self {
        self.base_path = normalize_base_path(base_path.as_ref());
        self
    }

    /// Returns the path prefix lookups are served under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Answers one request for `{base_path}{namespace}/{key}`.
    ///
    /// | Outcome                                           | Status |
    /// |---------------------------------------------------|--------|
    /// | value found or loaded                             | 200    |
    /// | path outside the base path, or not `namespace/key`| 400    |
    /// | method other than `GET`                           | 405    |
    /// | namespace not registered                          | 404    |
    /// | lookup failed                                     | 500    |
    ///
    /// Successful responses carry the raw value as `application/octet-stream`; failures carry a
    /// plain-text reason. The request body is ignored.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>> {
        let path = request.uri().path();
        tracing::event!(
            name: "shoal.request",
            tracing::Level::DEBUG,
            http.method = %request.method(),
            http.path = path,
            "peer request",
        );

        let Some(rest) = path.strip_prefix(self.base_path.as_str()) else {
            return reject(StatusCode::BAD_REQUEST, format!("unexpected path: {path}"));
        };
        if request.method() != Method::GET {
            let mut response = reject(StatusCode::METHOD_NOT_ALLOWED, format!("method not allowed: {}", request.method()));
            response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET"));
            return response;
        }
        let Some((namespace, key)) = split_lookup(rest) else {
            return reject(StatusCode::BAD_REQUEST, format!("bad request: {path}"));
        };

        let Some(group) = self.registry.get(&namespace) else {
            return reject(StatusCode::NOT_FOUND, format!("no such group: {namespace}"));
        };

        match group.get(&key).await {
            Ok(value) => {
                let mut response = Response::new(Full::new(value.into_bytes()));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
                response
            }
            Err(error) => reject(StatusCode::INTERNAL_SERVER_ERROR, error.reason()),
        }
    }
}

impl Debug for PeerServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerServer")
            .field("registry", &self.registry)
            .field("base_path", &self.base_path)
            .finish()
    }
}

/// Splits `namespace/key` and decodes both segments.
fn split_lookup(rest: &str) -> Option<(String, String)> {
    let (namespace, key) = rest.split_once('/')?;
    if namespace.is_empty() || key.is_empty() {
        return None;
    }
    Some((unescape(namespace)?, unescape(key)?))
}

fn unescape(segment: &str) -> Option<String> {
    PctStr::new(segment).ok().map(PctStr::decode)
}

fn reject(status: StatusCode, reason: String) -> Response<Full<Bytes>> {
    tracing::event!(
        name: "shoal.request_rejected",
        tracing::Level::INFO,
        http.status = status.as_u16(),
        reason = %reason,
        "peer request rejected",
    );

    let mut response = Response::new(Full::new(Bytes::from(reason)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
