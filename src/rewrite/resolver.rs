//! URL resolution and proxy link construction.
//!
//! # Responsibilities
//! - Resolve relative references against a page's base URL
//! - Build `/proxy?url=` and `/resource?url=` links
//! - Classify references that are never rewritten (fragments, script URLs, data URIs)

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

/// Characters left alone by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Route serving rewritten pages.
pub const PROXY_ROUTE: &str = "/proxy";

/// Route serving raw sub-resources.
pub const RESOURCE_ROUTE: &str = "/resource";

/// A reference that could not be turned into an absolute URL.
#[derive(Debug, Error)]
#[error("cannot resolve '{reference}': {source}")]
pub struct ResolutionError {
    pub reference: String,
    #[source]
    source: url::ParseError,
}

/// Resolve `reference` against `base`.
///
/// Absolute references keep their own scheme and host; everything else
/// inherits from `base`.
pub fn resolve(reference: &str, base: &Url) -> Result<Url, ResolutionError> {
    base.join(reference.trim()).map_err(|source| ResolutionError {
        reference: reference.to_string(),
        source,
    })
}

/// Percent-encode a query component the way browsers do for `encodeURIComponent`.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Link that fetches `target` through the page route.
pub fn proxy_href(target: &Url) -> String {
    format!("{}?url={}", PROXY_ROUTE, encode_component(target.as_str()))
}

/// Link that fetches `target` through the resource route.
pub fn resource_href(target: &Url) -> String {
    format!("{}?url={}", RESOURCE_ROUTE, encode_component(target.as_str()))
}

/// In-page fragments and `javascript:` URLs stay as written.
pub fn is_skipped_link(href: &str) -> bool {
    let href = href.trim_start();
    href.starts_with('#') || has_scheme(href, "javascript:")
}

/// `data:` URIs carry their payload inline.
pub fn is_data_uri(url: &str) -> bool {
    has_scheme(url.trim_start(), "data:")
}

fn has_scheme(value: &str, scheme: &str) -> bool {
    value
        .get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}
