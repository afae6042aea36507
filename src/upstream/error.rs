//! Upstream transport error taxonomy.
//!
//! # Design Decisions
//! - reqwest errors are collapsed into a handful of kinds the dispatcher
//!   can map to client-facing statuses
//! - DNS failures are recognised from the source chain; reqwest does not
//!   expose them as a distinct kind

use std::error::Error as StdError;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Why an upstream fetch produced no usable response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream did not answer in time")]
    Timeout,

    #[error("could not resolve upstream host '{host}'")]
    Dns { host: String },

    #[error("upstream returned {status}")]
    Status { status: StatusCode },

    #[error("upstream response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("network error: {0}")]
    Network(String),
}

impl UpstreamError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Timeout => "timeout",
            UpstreamError::Dns { .. } => "dns",
            UpstreamError::Status { .. } => "status",
            UpstreamError::TooLarge { .. } => "too_large",
            UpstreamError::Network(_) => "network",
        }
    }

    /// Classify a reqwest failure for a request to `url`.
    pub fn from_reqwest(err: reqwest::Error, url: &Url) -> Self {
        if err.is_timeout() {
            return UpstreamError::Timeout;
        }
        if is_dns_failure(&err) {
            return UpstreamError::Dns {
                host: url.host_str().unwrap_or_default().to_string(),
            };
        }
        if err.is_redirect() {
            return UpstreamError::Network("too many redirects".to_string());
        }
        UpstreamError::Network(describe(&err))
    }
}

const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
];

/// Walks the source chain looking for a resolver failure.
pub(crate) fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_ascii_lowercase();
        if DNS_MARKERS.iter().any(|m| message.contains(m)) {
            return true;
        }
        current = e.source();
    }
    false
}

/// Innermost message of the chain; reqwest's top-level text only says
/// "error sending request".
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
