//! Engine-level responses.
//!
//! # Responsibilities
//! - Build the responses the engine writes without running a chain:
//!   405 Method Not Allowed, 404 Not Found, 308 Permanent Redirect
//! - Compute redirect targets for empty paths and trailing-slash mismatches
//!
//! # Design Decisions
//! - Short plain-text bodies with `nosniff`, no templating
//! - Redirect targets keep the query string

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode, Uri},
};

const TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
const NOSNIFF: HeaderValue = HeaderValue::from_static("nosniff");

fn plain_text(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, TEXT_PLAIN);
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF);
    response
}

/// 405 with the `Allow` header set to the registered methods.
pub fn method_not_allowed(allow: &HeaderValue) -> Response<Body> {
    let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n");
    response.headers_mut().insert(header::ALLOW, allow.clone());
    response
}

pub fn not_found() -> Response<Body> {
    plain_text(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// 308 to `location`.
///
/// Falls back to a bare 308 if `location` cannot be a header value, which
/// can only happen for targets built from a malformed URI.
pub fn permanent_redirect(location: &str) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::PERMANENT_REDIRECT;
    match HeaderValue::try_from(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(e) => {
            tracing::warn!(location = %location, error = %e, "Invalid redirect target");
        }
    }
    response
}

/// Flip the trailing slash of a path: strip it if present, append otherwise.
pub fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => format!("{path}/"),
    }
}

/// Redirect target for `uri` with its path replaced by `path`.
pub fn redirect_target(uri: &Uri, path: &str) -> String {
    match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    }
}
