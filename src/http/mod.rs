//! HTTP dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (correlate, method gate, empty-path redirect)
//!     → [routing lookup]
//!         → Found: context.rs drives the chain (handler.rs units)
//!         → Redirect / NotFound: response.rs
//!     → request ID header, Resp trace
//!     → Send to client
//! ```

pub mod context;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use context::Context;
pub use handler::{from_fn, Handler, Unit};
pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use server::{Engine, EngineBuilder};
