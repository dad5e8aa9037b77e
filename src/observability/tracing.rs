//! Request and response trace records.
//!
//! # Responsibilities
//! - Create the per-request span carrying the correlation ID
//! - Emit one trace record on entry and one on exit
//!
//! # Design Decisions
//! - Records are `TRACE` level: silent unless explicitly enabled
//! - Fields are structured, not pre-formatted strings
//! - The exit record is tied to an [`ExitRecord`] guard, so a request whose
//!   future is dropped mid-chain (client went away) still gets one

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
};
use tracing::Span;

use crate::http::request::RequestId;

/// Span wrapping one request's dispatch.
pub fn request_span(request_id: &RequestId, request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

pub fn trace_request(request: &Request<Body>) {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    tracing::trace!(
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
        headers = ?request.headers(),
        host = ?request.uri().host(),
        remote_addr = ?remote_addr,
        "Req"
    );
}

pub fn trace_response(response: &Response<Body>) {
    tracing::trace!(
        status = %response.status(),
        headers = ?response.headers(),
        "Resp"
    );
}

/// Exit-record guard for one request.
///
/// Call [`ExitRecord::finish`] with the outgoing response. If the guard is
/// dropped first, an abandoned exit record is emitted instead.
#[must_use]
pub struct ExitRecord {
    finished: bool,
}

impl ExitRecord {
    pub fn new() -> Self {
        Self { finished: false }
    }

    pub fn finish(mut self, response: &Response<Body>) {
        self.finished = true;
        trace_response(response);
    }
}

impl Default for ExitRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExitRecord {
    fn drop(&mut self) {
        if !self.finished {
            tracing::trace!(status = "none", "Resp");
            tracing::debug!("Request abandoned before a response was produced");
        }
    }
}
