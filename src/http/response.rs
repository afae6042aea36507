//! Response construction for relayed content.
//!
//! # Responsibilities
//! - Serve rewritten HTML as UTF-8
//! - Pass non-HTML bodies through with the upstream content type
//! - Carry cache headers for sub-resources
//!
//! # Design Decisions
//! - Bodies are already buffered; nothing is streamed half-way
//! - Unrepresentable upstream header values are dropped, not forwarded

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::rewrite::encode_component;
use crate::rewrite::resolver::PROXY_ROUTE;
use crate::upstream::UpstreamResponse;

/// Cache policy for resources whose upstream did not send one.
pub const DEFAULT_RESOURCE_CACHE_CONTROL: &str = "public, max-age=3600";

/// Rewritten page.
pub fn html(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Upstream body and content type, unmodified.
pub fn passthrough(content_type: Option<&str>, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// Sub-resource passthrough with a cache policy.
pub fn resource(upstream: UpstreamResponse) -> Response {
    let cache_control = upstream
        .cache_control
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_RESOURCE_CACHE_CONTROL));

    let mut response = passthrough(upstream.content_type.as_deref(), upstream.body);
    response.headers_mut().insert(header::CACHE_CONTROL, cache_control);
    response
}

/// 302 to the page route for `target`.
pub fn redirect_to_page(target: &str) -> Response {
    let location = format!("{}?url={}", PROXY_ROUTE, encode_component(target));
    match HeaderValue::from_str(&location) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
