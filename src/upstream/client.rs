//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Forward browser headers, falling back to configured defaults
//! - Enforce timeout, redirect and response-size limits
//! - Buffer the body so errors surface before anything reaches the client
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` shared by every request; no response cache
//! - Non-2xx upstream statuses are errors, like a browser-side fetch wrapper
//! - Dropping the returned future aborts the fetch (client disconnect)

use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE,
    REFERER, USER_AGENT,
};
use reqwest::{redirect, Method, StatusCode};
use url::Url;

use crate::config::{ProxyConfig, UpstreamConfig};
use crate::upstream::error::UpstreamError;

/// Content type assumed for form posts without one.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// What the fetch is for; decides method and header defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// GET of a page that may be rewritten.
    Page,
    /// POST of a form to a page that may be rewritten.
    Form,
    /// GET of a sub-resource, passed through as bytes.
    Resource,
}

/// Inbound headers worth forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedHeaders {
    pub user_agent: Option<String>,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub content_type: Option<String>,
}

impl ForwardedHeaders {
    pub fn from_inbound(headers: &HeaderMap) -> Self {
        let get = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            user_agent: get(USER_AGENT),
            accept: get(ACCEPT),
            accept_language: get(ACCEPT_LANGUAGE),
            content_type: get(CONTENT_TYPE),
        }
    }
}

/// One outbound fetch.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub kind: FetchKind,
    pub url: Url,
    pub headers: ForwardedHeaders,
    pub body: Option<Bytes>,
}

impl UpstreamRequest {
    pub fn page(url: Url, headers: ForwardedHeaders) -> Self {
        Self { kind: FetchKind::Page, url, headers, body: None }
    }

    pub fn form(url: Url, headers: ForwardedHeaders, body: Bytes) -> Self {
        Self { kind: FetchKind::Form, url, headers, body: Some(body) }
    }

    pub fn resource(url: Url, headers: ForwardedHeaders) -> Self {
        Self { kind: FetchKind::Resource, url, headers, body: None }
    }

    pub fn method(&self) -> Method {
        match self.kind {
            FetchKind::Form => Method::POST,
            FetchKind::Page | FetchKind::Resource => Method::GET,
        }
    }
}

/// A fully buffered upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// URL after redirects.
    pub url: Url,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Client for the upstream site.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    defaults: UpstreamConfig,
    /// Referer for page and resource fetches.
    referer: String,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            .redirect(redirect::Policy::limited(config.upstream.max_redirects));
        if !config.upstream.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            defaults: config.upstream.clone(),
            referer: config.proxy.target_site.clone(),
        })
    }

    /// Perform one fetch and buffer the body.
    pub async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let headers = self.outbound_headers(&request);
        let method = request.method();
        let UpstreamRequest { url, body, .. } = request;

        let mut builder = self.http.request(method, url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, &url))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(UpstreamError::Status { status });
        }

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let cache_control = header(CACHE_CONTROL);
        let final_url = response.url().clone();

        let body = self.read_body(response, &url).await?;

        Ok(UpstreamResponse {
            status,
            url: final_url,
            content_type,
            cache_control,
            body,
        })
    }

    async fn read_body(&self, mut response: reqwest::Response, url: &Url) -> Result<Bytes, UpstreamError> {
        let limit = self.defaults.max_response_bytes;
        let declared = response.content_length().unwrap_or(0);
        if declared > limit as u64 {
            return Err(UpstreamError::TooLarge { limit });
        }

        let mut body = Vec::with_capacity(declared as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, url))?
        {
            if body.len() + chunk.len() > limit {
                return Err(UpstreamError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(body))
    }

    fn outbound_headers(&self, request: &UpstreamRequest) -> HeaderMap {
        let forwarded = &request.headers;
        let mut headers = HeaderMap::new();

        insert(
            &mut headers,
            USER_AGENT,
            forwarded.user_agent.as_deref().unwrap_or(&self.defaults.user_agent),
        );

        match request.kind {
            FetchKind::Resource => insert(&mut headers, ACCEPT, "*/*"),
            FetchKind::Page | FetchKind::Form => {
                insert(
                    &mut headers,
                    ACCEPT,
                    forwarded.accept.as_deref().unwrap_or(&self.defaults.accept),
                );
                insert(
                    &mut headers,
                    ACCEPT_LANGUAGE,
                    forwarded
                        .accept_language
                        .as_deref()
                        .unwrap_or(&self.defaults.accept_language),
                );
            }
        }

        match request.kind {
            FetchKind::Form => {
                insert(&mut headers, REFERER, request.url.as_str());
                insert(
                    &mut headers,
                    CONTENT_TYPE,
                    forwarded.content_type.as_deref().unwrap_or(FORM_URLENCODED),
                );
            }
            FetchKind::Page | FetchKind::Resource => insert(&mut headers, REFERER, &self.referer),
        }

        headers
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "Dropping unrepresentable header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UpstreamClient {
        let mut config = ProxyConfig::default();
        config.proxy.target_site = "https://upstream.example".into();
        UpstreamClient::new(&config).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_page_headers_default_when_absent() {
        let client = client();
        let headers = client.outbound_headers(&UpstreamRequest::page(
            url("https://upstream.example/a"),
            ForwardedHeaders::default(),
        ));

        assert_eq!(headers[USER_AGENT], UpstreamConfig::default().user_agent.as_str());
        assert_eq!(headers[ACCEPT_LANGUAGE], "ko-KR,ko;q=0.9,en;q=0.8");
        assert_eq!(headers[REFERER], "https://upstream.example");
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_form_headers_forward_inbound() {
        let mut inbound = HeaderMap::new();
        inbound.insert(USER_AGENT, HeaderValue::from_static("TestBrowser/1.0"));
        inbound.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        inbound.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = client();
        let request = UpstreamRequest::form(
            url("https://upstream.example/form.aspx"),
            ForwardedHeaders::from_inbound(&inbound),
            Bytes::from_static(b"{}"),
        );
        assert_eq!(request.method(), Method::POST);

        let headers = client.outbound_headers(&request);
        assert_eq!(headers[USER_AGENT], "TestBrowser/1.0");
        assert_eq!(headers[ACCEPT_LANGUAGE], "en-US");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[REFERER], "https://upstream.example/form.aspx");
    }

    #[test]
    fn test_form_content_type_defaults_to_urlencoded() {
        let client = client();
        let headers = client.outbound_headers(&UpstreamRequest::form(
            url("https://upstream.example/form.aspx"),
            ForwardedHeaders::default(),
            Bytes::new(),
        ));
        assert_eq!(headers[CONTENT_TYPE], FORM_URLENCODED);
    }

    #[test]
    fn test_resource_accepts_anything() {
        let mut inbound = HeaderMap::new();
        inbound.insert(ACCEPT, HeaderValue::from_static("text/html"));

        let client = client();
        let headers = client.outbound_headers(&UpstreamRequest::resource(
            url("https://upstream.example/a.png"),
            ForwardedHeaders::from_inbound(&inbound),
        ));
        assert_eq!(headers[ACCEPT], "*/*");
        assert!(headers.get(ACCEPT_LANGUAGE).is_none());
        assert_eq!(headers[REFERER], "https://upstream.example");
    }

    #[test]
    fn test_html_detection() {
        let mut response = UpstreamResponse {
            status: StatusCode::OK,
            url: url("https://upstream.example/"),
            content_type: Some("Text/HTML; charset=euc-kr".into()),
            cache_control: None,
            body: Bytes::new(),
        };
        assert!(response.is_html());

        response.content_type = Some("image/png".into());
        assert!(!response.is_html());

        response.content_type = None;
        assert!(!response.is_html());
    }
}
