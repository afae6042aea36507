//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the page relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Upstream site and landing page.
    pub proxy: SiteConfig,

    /// Outbound client settings.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// HTML rewrite settings.
    pub rewrite: RewriteConfig,

    /// Locally served PWA assets.
    pub assets: AssetsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum inbound body size in bytes (form posts).
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// The site being relayed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Upstream root, used when `/proxy` is called without `url`
    /// and as the Referer for page and resource fetches.
    pub target_site: String,

    /// Deep link the root route redirects to.
    pub default_page: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            target_site: "https://hanjaro.juntong.or.kr".to_string(),
            default_page: "https://hanjaro.juntong.or.kr/page_translater_mobile.aspx?sURL=http%3a%2f%2fm.news.naver.com&hh=1&hu=1&hl=111111111".to_string(),
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Maximum redirect hops followed per fetch.
    pub max_redirects: usize,

    /// Maximum upstream body size in bytes.
    pub max_response_bytes: usize,

    /// User-Agent sent when the client did not supply one.
    pub user_agent: String,

    /// Accept sent for page fetches when the client did not supply one.
    pub accept: String,

    /// Accept-Language sent when the client did not supply one.
    pub accept_language: String,

    /// Honour HTTP_PROXY / HTTPS_PROXY / NO_PROXY from the environment.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            max_response_bytes: 10 * 1024 * 1024, // 10MB
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "ko-KR,ko;q=0.9,en;q=0.8".to_string(),
            use_system_proxy: true,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream fetch timeout (connect + headers + body) in seconds.
    pub upstream_secs: u64,

    /// Total budget for one inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            upstream_secs: 30,
            request_secs: 45,
        }
    }
}

/// HTML rewrite configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Upstream chrome removed from every page.
    pub remove_selectors: Vec<String>,

    /// Replacement `<title>` text. `None` keeps the upstream title.
    pub title_override: Option<String>,

    /// Prepend the PWA head markup to `<head>`.
    pub inject_head: bool,

    /// Abort the pass on ambiguous markup and serve the page unmodified.
    /// Off: the parser guesses and the page is still rewritten.
    pub strict_parsing: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            remove_selectors: vec![
                "header#header".to_string(),
                "div#content".to_string(),
                "div#footer".to_string(),
            ],
            title_override: None,
            inject_head: true,
            strict_parsing: false,
        }
    }
}

/// Locally served PWA assets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory served at the root. `None` disables static serving.
    pub static_dir: Option<String>,

    /// Web app manifest path.
    pub manifest_path: String,

    /// Service worker script path.
    pub service_worker_path: String,

    /// Icon path used for the icon links.
    pub icon_path: String,

    /// theme-color meta value.
    pub theme_color: String,

    /// apple-mobile-web-app-title meta value.
    pub app_title: String,

    /// URL fragments that must never be fetched from upstream.
    pub reserved_markers: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            static_dir: Some("static".to_string()),
            manifest_path: "/manifest.json".to_string(),
            service_worker_path: "/sw.js".to_string(),
            icon_path: "/icon-192.png".to_string(),
            theme_color: "#2c3e50".to_string(),
            app_title: "한자로".to_string(),
            reserved_markers: vec![
                "/manifest.json".to_string(),
                "/sw.js".to_string(),
                "/icon-192.png".to_string(),
                "/icon-512.png".to_string(),
            ],
        }
    }
}

impl AssetsConfig {
    /// Returns true if the URL points at one of the relay's own assets.
    pub fn is_reserved(&self, url: &str) -> bool {
        self.reserved_markers.iter().any(|m| url.contains(m.as_str()))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reserve_injected_assets() {
        let assets = AssetsConfig::default();
        assert!(assets.is_reserved(&assets.manifest_path));
        assert!(assets.is_reserved(&assets.service_worker_path));
        assert!(assets.is_reserved(&assets.icon_path));
        assert!(assets.is_reserved("https://example.com/manifest.json"));
        assert!(!assets.is_reserved("https://example.com/style.css"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [proxy]
            target_site = "https://example.com"

            [timeouts]
            upstream_secs = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.proxy.target_site, "https://example.com");
        assert_eq!(config.timeouts.upstream_secs, 15);
        assert_eq!(config.timeouts.request_secs, 45);
        assert_eq!(config.upstream.max_redirects, 5);
        assert_eq!(config.rewrite.remove_selectors.len(), 3);
        assert_eq!(config.observability.log_format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_lowercase() {
        let config: ObservabilityConfig = toml::from_str(r#"log_format = "json""#).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
