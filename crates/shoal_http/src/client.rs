// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};

use bytes::Bytes;
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use pct_str::{PctString, UriReserved};
use shoal::{Error, PeerFetcher};

pub(crate) type HttpClient = Client<HttpConnector, Empty<Bytes>>;

pub(crate) fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build_http()
}

/// Fetches values from one remote peer over HTTP.
///
/// A fetch of `key` in `namespace` requests `GET {base_url}{namespace}/{key}`, percent-encoding
/// both segments so that keys may contain slashes or any other reserved character. A `200`
/// response body is the value. Any other status fails with
/// [`ErrorKind::PeerProtocol`](shoal::ErrorKind::PeerProtocol); a connection or body failure
/// fails with [`ErrorKind::PeerTransport`](shoal::ErrorKind::PeerTransport).
///
/// The fetcher must be used from within a Tokio runtime.
#[derive(Clone)]
pub struct HttpFetcher {
    base_url: String,
    client: HttpClient,
}

impl HttpFetcher {
    /// Creates a fetcher for the peer serving groups under `base_url`.
    ///
    /// `base_url` is the peer's address followed by its base path, for example
    /// `http://10.0.0.2:8001/_shoal/`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url.into(), http_client())
    }

    pub(crate) fn with_client(base_url: String, client: HttpClient) -> Self {
        Self { base_url, client }
    }

    /// Returns the URL prefix requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, namespace: &str, key: &str) -> String {
        format!("{}{}/{}", self.base_url, escape(namespace), escape(key))
    }
}

fn escape(segment: &str) -> String {
    PctString::encode(segment.chars(), UriReserved::Any).into_string()
}

impl PeerFetcher for HttpFetcher {
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Bytes, Error> {
        let uri: Uri = self.url(namespace, key).parse().map_err(Error::peer_transport)?;
        let response = self.client.get(uri).await.map_err(Error::peer_transport)?;

        let status = response.status();
        let body = response.into_body().collect().await.map_err(Error::peer_transport)?.to_bytes();
        if status != StatusCode::OK {
            let reason = String::from_utf8_lossy(&body);
            return Err(Error::peer_protocol(format!("server returned: {status}: {}", reason.trim_end())));
        }

        Ok(body)
    }
}

impl Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_escapes_each_segment() {
        let fetcher = HttpFetcher::new("http://10.0.0.2:8001/_shoal/");

        assert_eq!(fetcher.url("scores", "Tom"), "http://10.0.0.2:8001/_shoal/scores/Tom");
        assert_eq!(
            fetcher.url("team scores", "a/b?c"),
            "http://10.0.0.2:8001/_shoal/team%20scores/a%2Fb%3Fc"
        );
    }

    #[test]
    fn escaped_url_parses_as_uri() {
        let fetcher = HttpFetcher::new("http://localhost:8001/_shoal/");
        let uri: Uri = fetcher.url("scores", "#1 & co").parse().unwrap();

        assert_eq!(uri.path(), "/_shoal/scores/%231%20%26%20co");
        assert!(uri.query().is_none());
    }
}
