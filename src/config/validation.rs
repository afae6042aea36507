//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the upstream site and landing page are absolute URLs
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that every injected asset is covered by a reserved marker
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use lol_html::Selector;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    check_absolute_url(&mut errors, "proxy.target_site", &config.proxy.target_site);
    check_absolute_url(&mut errors, "proxy.default_page", &config.proxy.default_page);

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs <= config.timeouts.upstream_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed timeouts.upstream_secs ({}) so upstream timeouts surface first",
                config.timeouts.upstream_secs
            ),
        ));
    }

    if config.upstream.max_response_bytes == 0 {
        errors.push(ValidationError::new("upstream.max_response_bytes", "must be greater than 0"));
    }
    if config.upstream.max_redirects > 10 {
        errors.push(ValidationError::new("upstream.max_redirects", "must be at most 10"));
    }

    for raw in &config.rewrite.remove_selectors {
        if let Err(e) = raw.parse::<Selector>() {
            errors.push(ValidationError::new(
                "rewrite.remove_selectors",
                format!("invalid selector '{}': {}", raw, e),
            ));
        }
    }

    let assets = &config.assets;
    for (field, path) in [
        ("assets.manifest_path", &assets.manifest_path),
        ("assets.service_worker_path", &assets.service_worker_path),
        ("assets.icon_path", &assets.icon_path),
    ] {
        if !assets.is_reserved(path) {
            errors.push(ValidationError::new(
                field,
                format!("'{}' is not covered by assets.reserved_markers", path),
            ));
        }
    }
    if assets.reserved_markers.iter().any(|m| m.is_empty()) {
        errors.push(ValidationError::new(
            "assets.reserved_markers",
            "empty marker would block every resource",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_absolute_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", value, e))),
    }
}
