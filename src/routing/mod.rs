//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Group tree
//!     → group.rs (flatten prefixes + shared middleware)
//!     → router.rs (register into per-method trees)
//!     → methods.rs (grow the allowed-methods set)
//!
//! Per request:
//!     (method, path)
//!     → router.rs lookup
//!     → Found { route, params } | Redirect | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable once the engine is built
//! - Matching is keyed on (method, path), never on registration order
//! - Duplicates are a startup error

pub mod group;
pub mod methods;
pub mod router;

pub use group::{Group, RouteDef};
pub use methods::AllowedMethods;
pub use router::{Lookup, PathParams, Route, RouteError, RouteTable};
