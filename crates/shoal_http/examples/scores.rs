// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serves a small score table as the `scores` group of one cache node.
//!
//! ```text
//! cargo run -p shoal_http --example scores -- 127.0.0.1:8001 http://127.0.0.1:8001 http://127.0.0.1:8002
//! curl http://127.0.0.1:8001/_shoal/scores/Tom
//! ```
//!
//! The first argument is the address to listen on; the remaining ones are the URLs of every node
//! in the fleet, including this one. Without arguments the node listens on `127.0.0.1:8001` and
//! serves every key itself.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use ohno::AppError;
use shoal::{GroupRegistry, LoaderFn};
use shoal_http::{HttpPool, PeerServer};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SLOW_DB: [(&str, &str); 3] = [("Tom", "630"), ("Jack", "589"), ("Sam", "567")];

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:8001".to_owned());
    let self_url = format!("http://{addr}");
    let fleet: Vec<String> = args.collect();

    let registry = Arc::new(GroupRegistry::new());
    let scores = registry.new_group(
        "scores",
        2 << 10,
        LoaderFn::new(|key: String| async move {
            tracing::info!(key = %key, "searching slow database");
            SLOW_DB
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, score)| *score)
                .ok_or_else(|| format!("{key} not exist"))
        }),
    )?;
    scores.register_peers(Arc::new(HttpPool::builder(self_url.as_str()).peers(fleet).build()))?;

    let server = Arc::new(PeerServer::new(registry));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(url = %self_url, base_path = server.base_path(), "cache node listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let server = Arc::clone(&server);
                async move { Ok::<_, Infallible>(server.handle(request).await) }
            });
            if let Err(error) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                tracing::warn!(%error, "connection failed");
            }
        });
    }
}
