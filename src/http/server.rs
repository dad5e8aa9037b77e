//! Dispatch engine and HTTP server setup.
//!
//! # Responsibilities
//! - Collect routes, groups and engine-wide middleware during startup
//! - Freeze them into an immutable engine before serving
//! - Per request: correlate, gate the method, normalize the path, look up
//!   the route, run its chain behind a panic barrier
//! - Bind the engine to a plain or TLS listener
//!
//! # Design Decisions
//! - `EngineBuilder` is the only mutable phase; `build()` consumes it, so
//!   routes cannot change once an `Engine` exists
//! - 405, 404 and redirects are written by the engine and never reach a chain
//! - A panicking unit is logged and contained. The client gets whatever the
//!   chain had written so far (an empty 200 if nothing), and the server keeps
//!   serving. This trades a possibly incomplete response for availability
//! - The request-ID header is set on every response, whatever the outcome
//! - If the connection drops mid-chain the request future is dropped; the
//!   exit trace record is still emitted from a guard

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, Response},
    Router,
};
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::{DispatchConfig, ListenerConfig, TlsConfig, ValidationError};
use crate::http::context::Context;
use crate::http::handler::Unit;
use crate::http::request::{self, RequestId};
use crate::http::response;
use crate::lifecycle::{shutdown, shutdown_signal};
use crate::net::{listener, tls, ListenerError};
use crate::observability;
use crate::routing::{AllowedMethods, Group, Lookup, PathParams, Route, RouteError, RouteTable};

/// How long in-flight TLS connections get to finish after a shutdown signal.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Registration phase of an [`Engine`].
///
/// All registration happens here, on one task, before the engine is built.
#[derive(Debug)]
pub struct EngineBuilder {
    table: RouteTable,
    middleware: Vec<Unit>,
    root_path: String,
    request_id_header: HeaderName,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            table: RouteTable::new(),
            middleware: Vec::new(),
            root_path: DispatchConfig::default().root_path,
            request_id_header: request::X_REQUEST_ID,
        }
    }

    /// Builder using the given dispatch settings.
    pub fn with_config(config: &DispatchConfig) -> Result<Self, ValidationError> {
        if !config.root_path.starts_with('/') {
            return Err(ValidationError::RootPath(config.root_path.clone()));
        }
        let request_id_header = HeaderName::from_bytes(config.request_id_header.as_bytes())
            .map_err(|_| ValidationError::RequestIdHeader(config.request_id_header.clone()))?;

        Ok(Self {
            root_path: config.root_path.clone(),
            request_id_header,
            ..Self::new()
        })
    }

    /// Run `unit` before every route's own chain.
    ///
    /// Applies to routes registered before and after this call; units run in
    /// append order.
    pub fn append_middleware(&mut self, unit: Unit) -> &mut Self {
        self.middleware.push(unit);
        self
    }

    /// Register a chain for (method, path). The last unit is the handler.
    pub fn register(
        &mut self,
        method: Method,
        path: impl Into<String>,
        chain: impl IntoIterator<Item = Unit>,
    ) -> Result<&mut Self, RouteError> {
        self.table.register(method, path, chain)?;
        Ok(self)
    }

    /// Flatten `group` and register every route in it, in declaration order.
    ///
    /// Stops at the first failing route; routes before it stay registered.
    pub fn group(&mut self, group: Group) -> Result<&mut Self, RouteError> {
        for def in group.flatten() {
            self.table.register(def.method, def.path, def.chain)?;
        }
        Ok(self)
    }

    /// Freeze the routes and start the serving phase.
    pub fn build(self) -> Engine {
        observability::panic::install_hook();

        let mut table = self.table;
        table.prepend_all(&self.middleware);

        tracing::info!(
            routes = table.len(),
            allow = ?table.allowed_methods().allow_header(),
            "Engine built"
        );

        Engine {
            inner: Arc::new(Inner {
                table,
                root_path: self.root_path,
                request_id_header: self.request_id_header,
            }),
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner {
    table: RouteTable,
    root_path: String,
    request_id_header: HeaderName,
}

/// The request dispatch engine. Cheap to clone; all clones share one table.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn allowed_methods(&self) -> &AllowedMethods {
        self.inner.table.allowed_methods()
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        self.inner.table.lookup(method, path)
    }

    /// Handle one request.
    pub async fn serve(&self, mut request: Request<Body>) -> Response<Body> {
        let request_id = request::assign(&mut request);
        let span = observability::tracing::request_span(&request_id, &request);

        async move {
            let exit = observability::tracing::ExitRecord::new();
            observability::tracing::trace_request(&request);

            let mut response = self.dispatch(request, &request_id).await;
            match HeaderValue::from_str(request_id.as_str()) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(self.inner.request_id_header.clone(), value);
                }
                Err(e) => tracing::warn!(error = %e, "Request ID is not a valid header value"),
            }

            exit.finish(&response);
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: Request<Body>, request_id: &RequestId) -> Response<Body> {
        let inner = &*self.inner;
        let allowed = inner.table.allowed_methods();

        if !allowed.contains(request.method()) {
            tracing::warn!(allow = ?allowed.allow_header(), "Method not allowed");
            return response::method_not_allowed(allowed.allow_header());
        }

        let path = request.uri().path();
        if path.is_empty() {
            let target = response::redirect_target(request.uri(), &inner.root_path);
            tracing::debug!(location = %target, "Empty path, redirecting to root");
            return response::permanent_redirect(&target);
        }

        match inner.table.lookup(request.method(), path) {
            Lookup::Found { route, params } => {
                self.run_chain(request, route, params, request_id.clone())
                    .await
            }
            Lookup::Redirect => {
                let toggled = response::toggle_trailing_slash(path);
                let target = response::redirect_target(request.uri(), &toggled);
                tracing::debug!(location = %target, "Trailing slash mismatch, redirecting");
                response::permanent_redirect(&target)
            }
            Lookup::NotFound => {
                tracing::debug!("No route matched");
                response::not_found()
            }
        }
    }

    /// Run a matched chain behind the panic barrier.
    async fn run_chain(
        &self,
        request: Request<Body>,
        route: Arc<Route>,
        params: PathParams,
        request_id: RequestId,
    ) -> Response<Body> {
        let mut ctx = Context::new(request, route, params, request_id);

        if let Err(payload) = AssertUnwindSafe(ctx.advance()).catch_unwind().await {
            let message = observability::panic::payload_message(payload.as_ref());
            match observability::panic::take_capture() {
                Some(capture) => tracing::error!(
                    route = %ctx.route_pattern(),
                    panic = %message,
                    location = %capture.location,
                    "[panic] handler chain panicked, stack:\n{}",
                    capture.backtrace
                ),
                None => tracing::error!(
                    route = %ctx.route_pattern(),
                    panic = %message,
                    "[panic] handler chain panicked"
                ),
            }
        }

        ctx.into_response()
    }

    /// Axum router with this engine as the only handler.
    pub fn into_router(self) -> Router {
        Router::new().fallback(move |request: Request<Body>| {
            let engine = self.clone();
            async move { engine.serve(request).await }
        })
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn run_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        self.serve_plain(listener, shutdown::wait(shutdown)).await
    }

    /// Serve plain HTTP on all interfaces until a shutdown signal.
    pub async fn run_plain(self, port: u16) -> Result<(), ListenerError> {
        let config = ListenerConfig {
            port,
            tls: None,
            ..ListenerConfig::default()
        };
        self.run(&config).await
    }

    /// Serve HTTPS on all interfaces until a shutdown signal.
    pub async fn run_tls(self, port: u16, cert_file: &str, key_file: &str) -> Result<(), ListenerError> {
        let config = ListenerConfig {
            port,
            tls: Some(TlsConfig {
                cert_path: cert_file.to_string(),
                key_path: key_file.to_string(),
            }),
            ..ListenerConfig::default()
        };
        self.run(&config).await
    }

    /// Serve according to `config`: HTTPS when TLS is configured, plain otherwise.
    pub async fn run(self, config: &ListenerConfig) -> Result<(), ListenerError> {
        match &config.tls {
            None => {
                let listener = listener::bind(config).await?;
                self.serve_plain(listener, shutdown_signal()).await
            }
            Some(tls_config) => {
                let addr = listener::socket_addr(config)?;
                self.serve_tls(addr, tls_config, shutdown_signal()).await
            }
        }
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls_with_shutdown(
        self,
        addr: SocketAddr,
        tls_config: TlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        self.serve_tls(addr, &tls_config, shutdown::wait(shutdown))
            .await
    }

    async fn serve_tls(
        self,
        addr: SocketAddr,
        tls_config: &TlsConfig,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ListenerError> {
        let rustls = tls::load(tls_config).await?;

        let handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown.await;
                handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
            }
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app)
            .await
            .map_err(ListenerError::Serve)?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    async fn serve_plain(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ListenerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::from_fn;
    use axum::http::{header, StatusCode, Uri};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok_handler(body: &'static str) -> Unit {
        from_fn(move |ctx| {
            Box::pin(async move {
                ctx.respond(body);
            })
        })
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_method_gate_ignores_path() {
        let mut builder = Engine::builder();
        builder.register(Method::GET, "/a", [ok_handler("a")]).unwrap();
        builder.register(Method::POST, "/b", [ok_handler("b")]).unwrap();
        let engine = builder.build();

        let put = Request::builder().method(Method::PUT).uri("/a").body(Body::empty()).unwrap();
        let response = engine.serve(put).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET,POST");

        // POST is registered somewhere, so it passes the gate and misses lookup.
        let post = Request::builder().method(Method::POST).uri("/a").body(Body::empty()).unwrap();
        assert_eq!(engine.serve(post).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_path_redirects_to_root() {
        let mut builder = Engine::builder();
        builder.register(Method::GET, "/index", [ok_handler("home")]).unwrap();
        let engine = builder.build();

        let uri: Uri = "example.com:80".parse().unwrap();
        assert_eq!(uri.path(), "");
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();

        let response = engine.serve(request).await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/index");

        // Following the redirect lands on the route, not another redirect.
        assert_eq!(engine.serve(get("/index")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_configured_root_path() {
        let config = DispatchConfig {
            root_path: "/home".to_string(),
            ..DispatchConfig::default()
        };
        let mut builder = EngineBuilder::with_config(&config).unwrap();
        builder.register(Method::GET, "/home", [ok_handler("home")]).unwrap();
        let engine = builder.build();

        let request = Request::builder()
            .uri("example.com:80".parse::<Uri>().unwrap())
            .body(Body::empty())
            .unwrap();
        let response = engine.serve(request).await;
        assert_eq!(response.headers()[header::LOCATION], "/home");
    }

    #[test]
    fn test_with_config_rejects_bad_values() {
        let config = DispatchConfig {
            root_path: "home".to_string(),
            ..DispatchConfig::default()
        };
        assert!(matches!(
            EngineBuilder::with_config(&config),
            Err(ValidationError::RootPath(_))
        ));

        let config = DispatchConfig {
            request_id_header: "not valid".to_string(),
            ..DispatchConfig::default()
        };
        assert!(matches!(
            EngineBuilder::with_config(&config),
            Err(ValidationError::RequestIdHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_engine_middleware_runs_first() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let tag = |name: &'static str| {
            let order = order.clone();
            from_fn(move |ctx| {
                order.lock().unwrap().push(name);
                Box::pin(async move {
                    ctx.advance().await;
                })
            })
        };

        let mut builder = Engine::builder();
        builder
            .group(
                Group::new("/api")
                    .middleware(tag("group"))
                    .route(Method::GET, "/x", [tag("route"), tag("handler")]),
            )
            .unwrap();
        // Appended after registration, still runs first.
        builder.append_middleware(tag("engine"));
        let engine = builder.build();

        engine.serve(get("/api/x")).await;
        assert_eq!(
            *order.lock().unwrap(),
            vec!["engine", "group", "route", "handler"]
        );
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut builder = Engine::builder();
        builder
            .register(
                Method::GET,
                "/boom",
                [from_fn(|ctx| {
                    Box::pin(async move {
                        *ctx.response_mut().status_mut() = StatusCode::ACCEPTED;
                        panic!("handler exploded");
                    })
                })],
            )
            .unwrap();
        builder
            .register(
                Method::GET,
                "/ok",
                [from_fn(move |ctx| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Box::pin(async move {
                        ctx.respond("fine");
                    })
                })],
            )
            .unwrap();
        let engine = builder.build();

        let response = engine.serve(get("/boom")).await;
        // Whatever was written before the fault is what goes out.
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().contains_key("x-request-id"));

        let response = engine.serve(get("/ok")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
