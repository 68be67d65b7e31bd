// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Failure responses of a node running with backtrace capture enabled.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Arc;

use http::{Request, StatusCode};
use http_body_util::BodyExt;
use shoal::GroupRegistry;
use shoal::testing::MockLoader;
use shoal_http::PeerServer;

#[test]
fn failure_reason_never_carries_backtrace() {
    // SAFETY: this binary holds a single test, so no other thread reads the environment.
    unsafe { std::env::set_var("RUST_LIB_BACKTRACE", "1") };
    // SAFETY: as above.
    unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    assert_eq!(Backtrace::capture().status(), BacktraceStatus::Captured);

    let registry = Arc::new(GroupRegistry::new());
    let group = registry.new_group("scores", 2 << 10, MockLoader::new()).unwrap();
    let local = futures::executor::block_on(group.get("Kate")).unwrap_err();
    assert!(local.to_string().contains("Backtrace"), "backtraces are not captured: {local}");

    let server = PeerServer::new(registry);
    let response = futures::executor::block_on(server.handle(Request::get("/_shoal/scores/Kate").body(()).unwrap()));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = futures::executor::block_on(response.into_body().collect()).unwrap().to_bytes();
    assert_eq!(body, "loading from source failed: Kate not exist");
}
