//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use chainserve::{from_fn, Engine, Shutdown, Unit};
use tokio::net::TcpListener;

/// Handler that writes a fixed body.
#[allow(dead_code)]
pub fn text(body: &'static str) -> Unit {
    from_fn(move |ctx| {
        Box::pin(async move {
            ctx.respond(body);
        })
    })
}

/// Build a request with an empty body.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Collect a response body as a string.
#[allow(dead_code)]
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Serve `engine` on an ephemeral local port.
///
/// The server stops when the returned `Shutdown` is triggered or dropped.
#[allow(dead_code)]
pub async fn spawn_server(engine: Engine) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = engine.run_with_shutdown(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

/// HTTP client that does not follow redirects.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
