//! Route handlers for the relay.
//!
//! # Responsibilities
//! - Validate the `url` query parameter
//! - Build the upstream request for pages, form posts and sub-resources
//! - Hand HTML to the rewriter, pass everything else through
//! - Record per-route metrics and log failures
//!
//! # Design Decisions
//! - Missing or blocked targets are rejected before any network activity
//! - Rewriting uses the post-redirect URL as its base
//! - A dropped client connection drops the handler future, which cancels
//!   the in-flight upstream fetch

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use url::Url;

use crate::error::ProxyError;
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::rewrite::{rewrite_html, RewriteContext};
use crate::upstream::{ForwardedHeaders, UpstreamRequest, UpstreamResponse};

/// `?url=` on every relay route.
#[derive(Debug, Default, Deserialize)]
pub struct TargetQuery {
    pub url: Option<String>,
}

impl TargetQuery {
    fn target(self) -> Option<String> {
        self.url.filter(|u| !u.trim().is_empty())
    }
}

/// `GET /`: send the browser to the default page.
pub async fn root(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let response = response::redirect_to_page(&state.config.proxy.default_page);
    metrics::record_request("root", response.status().as_u16(), start);
    response
}

/// `GET /proxy`: fetch and rewrite a page. Without `url` the site root is used.
pub async fn page_get(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let result = relay_page(&state, query, &headers).await;
    complete("proxy_get", start, result)
}

/// `POST /proxy`: forward a form submission and rewrite the result.
pub async fn page_post(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = relay_form(&state, query, &headers, body).await;
    complete("proxy_post", start, result)
}

/// `GET /resource`: relay a sub-resource byte-for-byte.
pub async fn resource(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let result = relay_resource(&state, query, &headers).await;
    complete("resource", start, result)
}

async fn relay_page(
    state: &AppState,
    query: TargetQuery,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let raw = query
        .target()
        .unwrap_or_else(|| state.config.proxy.target_site.clone());
    let url = parse_target(&raw)?;

    tracing::info!(url = %url, "Relaying page");
    let request = UpstreamRequest::page(url, ForwardedHeaders::from_inbound(headers));
    let upstream = state.upstream.fetch(request).await?;
    Ok(render_page(state, upstream))
}

async fn relay_form(
    state: &AppState,
    query: TargetQuery,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let raw = query.target().ok_or(ProxyError::MissingParameter)?;
    let url = parse_target(&raw)?;

    tracing::info!(url = %url, bytes = body.len(), "Relaying form submission");
    let request = UpstreamRequest::form(url, ForwardedHeaders::from_inbound(headers), body);
    let upstream = state.upstream.fetch(request).await?;
    Ok(render_page(state, upstream))
}

async fn relay_resource(
    state: &AppState,
    query: TargetQuery,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let raw = query.target().ok_or(ProxyError::MissingParameter)?;
    if state.rewrite.is_reserved(&raw) {
        return Err(ProxyError::BlockedAsset);
    }
    let url = parse_target(&raw)?;

    tracing::debug!(url = %url, "Relaying resource");
    let request = UpstreamRequest::resource(url, ForwardedHeaders::from_inbound(headers));
    let upstream = state
        .upstream
        .fetch(request)
        .await
        .map_err(ProxyError::ResourceUnavailable)?;
    Ok(response::resource(upstream))
}

/// Absolute http(s) URL or `InvalidTarget`.
pub fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let invalid = || ProxyError::InvalidTarget { url: raw.to_string() };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(invalid()),
    }
}

fn render_page(state: &AppState, upstream: UpstreamResponse) -> Response {
    if !upstream.is_html() {
        return response::passthrough(upstream.content_type.as_deref(), upstream.body);
    }

    let html = String::from_utf8_lossy(&upstream.body);
    let rewritten = rewrite_html(&html, RewriteContext::new(&upstream.url, &state.rewrite));
    response::html(rewritten.html)
}

/// Log failures, record metrics, produce the final response.
fn complete(route: &'static str, start: Instant, result: Result<Response, ProxyError>) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            let detail = match &err {
                ProxyError::Upstream(e) | ProxyError::ResourceUnavailable(e) => {
                    metrics::record_upstream_error(e.kind());
                    e.to_string()
                }
                other => other.to_string(),
            };
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(route, status = status.as_u16(), kind = err.kind(), error = %detail, "Request failed");
            } else {
                tracing::warn!(route, status = status.as_u16(), kind = err.kind(), error = %detail, "Request failed");
            }
            err.into_response()
        }
    };

    metrics::record_request(route, response.status().as_u16(), start);
    response
}
