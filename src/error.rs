//! Request-level errors and their client-facing responses.
//!
//! Upstream failures render a short Korean/English page; internal details
//! only go to the logs.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Body for blocked reserved-asset requests.
pub const BLOCKED_ASSET_MESSAGE: &str = "PWA file should not be proxied";

/// Everything a dispatcher route can fail with.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("URL parameter required")]
    MissingParameter,

    #[error("Invalid URL: {url}")]
    InvalidTarget { url: String },

    #[error("PWA file should not be proxied")]
    BlockedAsset,

    #[error("Resource not found")]
    ResourceUnavailable(#[source] UpstreamError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter | ProxyError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
            ProxyError::BlockedAsset | ProxyError::ResourceUnavailable(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream(e) => match e {
                UpstreamError::Timeout => StatusCode::REQUEST_TIMEOUT,
                UpstreamError::Dns { .. } => StatusCode::NOT_FOUND,
                UpstreamError::Status { status } => *status,
                UpstreamError::TooLarge { .. } => StatusCode::BAD_GATEWAY,
                UpstreamError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingParameter => "missing_parameter",
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::BlockedAsset => "blocked_asset",
            ProxyError::ResourceUnavailable(_) => "resource_unavailable",
            ProxyError::Upstream(e) => e.kind(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ProxyError::Upstream(e) => {
                let (ko, en) = upstream_message(e);
                error_page(status, ko, en)
            }
            _ => (status, self.to_string()).into_response(),
        }
    }
}

fn upstream_message(err: &UpstreamError) -> (&'static str, &'static str) {
    match err {
        UpstreamError::Timeout => (
            "요청 시간이 초과되었습니다. 잠시 후 다시 시도해 주세요.",
            "The site took too long to respond. Please try again later.",
        ),
        UpstreamError::Dns { .. } => (
            "사이트를 찾을 수 없습니다. 주소를 확인해 주세요.",
            "The site could not be found. Please check the address.",
        ),
        UpstreamError::Status { .. } => (
            "원본 사이트에서 오류를 반환했습니다.",
            "The original site returned an error.",
        ),
        UpstreamError::TooLarge { .. } => (
            "페이지가 너무 커서 불러올 수 없습니다.",
            "The page is too large to load.",
        ),
        UpstreamError::Network(_) => (
            "페이지를 불러오는 중 오류가 발생했습니다.",
            "Something went wrong while loading the page.",
        ),
    }
}

fn error_page(status: StatusCode, ko: &str, en: &str) -> Response {
    let body = format!(
        concat!(
            "<!DOCTYPE html><html lang=\"ko\"><head><meta charset=\"UTF-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
            "<title>{code}</title></head><body>",
            "<h1>{ko}</h1><p>{en}</p>",
            "<p><a href=\"/\">처음으로 / Home</a></p>",
            "</body></html>"
        ),
        code = status.as_u16(),
        ko = ko,
        en = en,
    );
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ProxyError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_request_errors() {
        let (status, body) = body_of(ProxyError::MissingParameter).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "URL parameter required");

        let (status, body) = body_of(ProxyError::BlockedAsset).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, BLOCKED_ASSET_MESSAGE);

        let (status, body) = body_of(ProxyError::ResourceUnavailable(UpstreamError::Timeout)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Resource not found");
    }

    #[test]
    fn test_upstream_status_mapping() {
        let cases = [
            (UpstreamError::Timeout, StatusCode::REQUEST_TIMEOUT),
            (UpstreamError::Dns { host: "nowhere.invalid".into() }, StatusCode::NOT_FOUND),
            (UpstreamError::Status { status: StatusCode::SERVICE_UNAVAILABLE }, StatusCode::SERVICE_UNAVAILABLE),
            (UpstreamError::TooLarge { limit: 10 }, StatusCode::BAD_GATEWAY),
            (UpstreamError::Network("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ProxyError::from(err).status_code(), expected);
        }
    }

    #[tokio::test]
    async fn test_upstream_page_is_bilingual_and_opaque() {
        let err = ProxyError::Upstream(UpstreamError::Network(
            "tcp connect error: 10.0.0.7:8443 refused".into(),
        ));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("페이지를 불러오는 중 오류가 발생했습니다."));
        assert!(body.contains("Something went wrong while loading the page."));
        assert!(!body.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_dns_page() {
        let (status, body) = body_of(UpstreamError::Dns { host: "nowhere.invalid".into() }.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("The site could not be found."));
    }
}
