//! Per-request execution context.
//!
//! # Responsibilities
//! - Own the inbound request, the pending response and the path parameters
//! - Drive the matched chain one unit at a time through `advance()`
//!
//! # Design Decisions
//! - The chain is an owned slice shared by `Arc`; the cursor is a plain index
//! - `advance()` is synchronous with respect to the caller: it returns only
//!   after the downstream unit (and everything it advanced into) has finished
//! - A unit gets at most one effective `advance()` per invocation; repeated
//!   calls return `false` and leave the chain untouched
//! - There is no abort signal: a unit short-circuits by not advancing, after
//!   writing whatever response it wants delivered

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    response::IntoResponse,
};
use futures_util::future::BoxFuture;

use crate::http::request::RequestId;
use crate::routing::{PathParams, Route};

/// Mutable cursor over one route's chain for one request.
pub struct Context {
    request: Request<Body>,
    response: Response<Body>,
    params: PathParams,
    route: Arc<Route>,
    request_id: RequestId,
    /// Index of the unit currently executing (`None` before the first).
    current: Option<usize>,
    /// Number of units entered so far. Units run strictly in order, so a
    /// position below this has already been invoked once.
    entered: usize,
}

impl Context {
    pub(crate) fn new(
        request: Request<Body>,
        route: Arc<Route>,
        params: PathParams,
        request_id: RequestId,
    ) -> Self {
        Self {
            request,
            response: Response::new(Body::empty()),
            params,
            route,
            request_id,
            current: None,
            entered: 0,
        }
    }

    /// Run the next unit of the chain.
    ///
    /// Returns `false` without doing anything when the chain is exhausted or
    /// when the calling unit has already advanced once. Otherwise invokes the
    /// next unit, waits for it to finish and returns `true`.
    pub fn advance(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let next = self.current.map_or(0, |i| i + 1);

            if next < self.entered {
                tracing::warn!(
                    request_id = %self.request_id,
                    route = %self.route.pattern(),
                    position = next,
                    "advance() called more than once by the same unit; ignoring"
                );
                return false;
            }

            let Some(unit) = self.route.chain().get(next).cloned() else {
                return false;
            };

            let caller = self.current;
            self.entered = next + 1;
            self.current = Some(next);
            unit.call(self).await;
            self.current = caller;
            true
        })
    }

    /// Returns true once every unit of the chain has been entered.
    pub fn is_exhausted(&self) -> bool {
        self.entered >= self.route.chain().len()
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    /// Move the inbound body out of the request, leaving an empty one.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(self.request.body_mut(), Body::empty())
    }

    pub fn response(&self) -> &Response<Body> {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response<Body> {
        &mut self.response
    }

    /// Replace the pending response.
    pub fn respond(&mut self, response: impl IntoResponse) {
        self.response = response.into_response();
    }

    /// Path parameters extracted for this match, in pattern order.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Value of a single path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The pattern this request matched, as registered.
    pub fn route_pattern(&self) -> &str {
        self.route.pattern()
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub(crate) fn into_response(self) -> Response<Body> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::{from_fn, Unit};
    use axum::http::{Method, StatusCode};
    use std::sync::Mutex;

    fn context_for(chain: Vec<Unit>) -> Context {
        let route = Route::new(Method::GET, "/test".to_string(), chain);
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        Context::new(request, Arc::new(route), PathParams::default(), RequestId::new())
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str, advance: bool) -> Unit {
        let log = log.clone();
        from_fn(move |ctx| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push(format!("{name}:before"));
                if advance {
                    ctx.advance().await;
                }
                log.lock().unwrap().push(format!("{name}:after"));
            })
        })
    }

    #[tokio::test]
    async fn test_runs_chain_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_for(vec![
            recorder(&log, "a", true),
            recorder(&log, "b", true),
            recorder(&log, "h", false),
        ]);

        assert!(ctx.advance().await);
        assert!(ctx.is_exhausted());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:before", "b:before", "h:before", "h:after", "b:after", "a:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_downstream() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate = from_fn(|ctx| {
            Box::pin(async move {
                ctx.respond((StatusCode::FORBIDDEN, "denied"));
            })
        });
        let mut ctx = context_for(vec![gate, recorder(&log, "b", true), recorder(&log, "h", false)]);

        assert!(ctx.advance().await);
        assert!(log.lock().unwrap().is_empty());
        assert!(!ctx.is_exhausted());
        assert_eq!(ctx.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_advance_past_end_is_noop() {
        let mut ctx = context_for(vec![from_fn(|ctx| {
            Box::pin(async move {
                // Terminal unit: nothing downstream.
                assert!(!ctx.advance().await);
            })
        })]);

        assert!(ctx.advance().await);
        assert!(ctx.is_exhausted());
    }

    #[tokio::test]
    async fn test_second_advance_from_same_unit_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let twice = from_fn(|ctx| {
            Box::pin(async move {
                assert!(ctx.advance().await);
                assert!(!ctx.advance().await);
            })
        });
        let mut ctx = context_for(vec![
            twice,
            recorder(&log, "b", false),
            recorder(&log, "h", false),
        ]);

        ctx.advance().await;
        // "b" short-circuited; the repeated advance must not reach "h".
        assert_eq!(*log.lock().unwrap(), vec!["b:before", "b:after"]);
    }

    #[tokio::test]
    async fn test_accessors() {
        let route = Route::new(
            Method::GET,
            "/users/{id}".to_string(),
            vec![from_fn(|_| Box::pin(async {}))],
        );
        let params = PathParams::from_pairs(vec![("id".to_string(), "42".to_string())]);
        let request = Request::builder()
            .uri("/users/42")
            .body(Body::from("payload"))
            .unwrap();
        let id = RequestId::new();
        let mut ctx = Context::new(request, Arc::new(route), params, id.clone());

        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.route_pattern(), "/users/{id}");
        assert_eq!(ctx.request_id(), &id);
        assert_eq!(ctx.request().uri().path(), "/users/42");

        let body = axum::body::to_bytes(ctx.take_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"payload");
        assert_eq!(ctx.response().status(), StatusCode::OK);
    }
}
