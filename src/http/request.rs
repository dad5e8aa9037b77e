//! Request correlation.
//!
//! # Responsibilities
//! - Generate one correlation identifier per request (UUID v4)
//! - Attach it to the request so handlers and logs can read it
//!
//! # Design Decisions
//! - Generated by the engine, never taken from the client
//! - Stored in request extensions, mirrored on the response header

use std::fmt;

use axum::{
    body::Body,
    http::{HeaderName, Request},
};
use uuid::Uuid;

/// Default response header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access to the request ID stored on a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl RequestIdExt for Request<Body> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Generate an ID and attach it to the request.
pub(crate) fn assign(request: &mut Request<Body>) -> RequestId {
    let id = RequestId::new();
    request.extensions_mut().insert(id.clone());
    id
}
