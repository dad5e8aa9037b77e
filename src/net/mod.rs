//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (resolve + bind TCP)
//!     → tls.rs (optional certificate loading)
//!     → Hand off to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently by axum-server
//! - Bind and certificate errors surface to the caller of the run functions

pub mod listener;
pub mod tls;

pub use listener::ListenerError;
