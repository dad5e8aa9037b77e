//! Chain units.
//!
//! # Responsibilities
//! - Define the single callable shape shared by middleware and handlers
//! - Adapt closures and plain functions into shareable units
//!
//! # Design Decisions
//! - No separate "middleware" and "handler" types: the terminal handler is
//!   just the last unit of a chain
//! - A unit borrows the request context mutably for the duration of its
//!   future, which is what lets it call `advance()` before or after its own work
//! - Units are `Arc`-shared so one registration can appear in many chains

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::context::Context;

/// A unit of a handler chain.
///
/// Implementors receive the per-request [`Context`] and decide whether to
/// continue downstream with [`Context::advance`].
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (self)(ctx)
    }
}

/// Shared handle to a chain unit.
#[derive(Clone)]
pub struct Unit(Arc<dyn Handler>);

impl Unit {
    /// Wrap any [`Handler`] implementation.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    pub(crate) fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        self.0.call(ctx)
    }

    /// Returns true if both handles point at the same registered unit.
    pub fn ptr_eq(&self, other: &Unit) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unit")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Build a unit from a closure or function.
///
/// ```ignore
/// let auth = from_fn(|ctx| Box::pin(async move {
///     if ctx.request().headers().contains_key("authorization") {
///         ctx.advance().await;
///     } else {
///         ctx.respond(StatusCode::UNAUTHORIZED);
///     }
/// }));
/// ```
pub fn from_fn<F>(f: F) -> Unit
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Unit::new(f)
}
