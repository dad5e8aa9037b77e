//! Minimal HTTP request dispatch.
//!
//! Maps (method, path) to a chain of units and runs the chain in order. Each
//! unit decides whether the rest of the chain runs by calling
//! [`Context::advance`].
//!
//! ```text
//!   startup                          per request
//!   ───────                          ───────────
//!   EngineBuilder                    Engine::serve
//!     register / group / middleware    correlate (request ID, span)
//!     build() ──────────────────────▶  method gate ──▶ 405
//!                                      empty path  ──▶ 308 root
//!                                      lookup ─┬─▶ chain (panic barrier)
//!                                              ├─▶ 308 slash toggle
//!                                              └─▶ 404
//! ```
//!
//! ```ignore
//! let mut builder = Engine::builder();
//! builder.register(Method::GET, "/users/{id}", [from_fn(|ctx| Box::pin(async move {
//!     let id = ctx.param("id").unwrap_or_default().to_string();
//!     ctx.respond(id);
//! }))])?;
//! builder.build().run_plain(8080).await?;
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use http::{from_fn, Context, Engine, EngineBuilder, Handler, RequestId, Unit};
pub use lifecycle::Shutdown;
pub use routing::{Group, PathParams, RouteError};
