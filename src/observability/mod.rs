//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     logging.rs (subscriber + filter)
//!     panic.rs (capturing panic hook)
//!
//! Per request:
//!     tracing.rs (span with request ID, Req/Resp records)
//!     panic.rs (stack of a contained fault)
//! ```
//!
//! # Design Decisions
//! - Structured logging through `tracing` everywhere
//! - Request ID flows through the request span into every event

pub mod logging;
pub mod panic;
pub mod tracing;
