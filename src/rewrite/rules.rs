//! The rewrite pass.
//!
//! # Rules (document order, single streaming pass)
//! 1. Remove upstream chrome (`rewrite.remove_selectors`)
//! 2. Override `<title>` when configured
//! 3. Prepend the PWA head markup
//! 4. `form[action]` → `/proxy?url=` (missing action → base URL)
//! 5. `a[href]` → `/proxy?url=` (fragments and `javascript:` kept)
//! 6. `link[href]`, `script[src]`, `img[src]` → `/resource?url=`
//!    (data URIs and reserved assets kept)
//!
//! # Design Decisions
//! - Every per-element edit returns a `Result`; failures are logged and the
//!   element is emitted unchanged
//! - A failed pass returns the input untouched, never an error
//! - Inserted head markup is opaque to the later rules

use std::cell::Cell;

use lol_html::html_content::{ContentType, Element};
use lol_html::{element, rewrite_str, RewriteStrSettings, Selector};
use thiserror::Error;
use url::Url;

use crate::config::{AssetsConfig, RewriteConfig};
use crate::observability::metrics;
use crate::rewrite::head::head_markup;
use crate::rewrite::resolver::{
    is_data_uri, is_skipped_link, proxy_href, resolve, resource_href, ResolutionError,
};

/// Startup-time rewrite settings, shared by every pass.
#[derive(Debug, Clone)]
pub struct RewriteSettings {
    remove_selectors: Vec<String>,
    /// `S *` for each removal selector `S`; marks descendants as discarded.
    removed_descendants: Vec<String>,
    strict: bool,
    title_override: Option<String>,
    head_markup: Option<String>,
    assets: AssetsConfig,
}

impl RewriteSettings {
    pub fn from_config(rewrite: &RewriteConfig, assets: &AssetsConfig) -> Self {
        let remove_selectors = rewrite
            .remove_selectors
            .iter()
            .filter(|raw| match raw.parse::<Selector>() {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(selector = %raw, error = %e, "Ignoring invalid removal selector");
                    false
                }
            })
            .cloned()
            .collect::<Vec<_>>();
        let removed_descendants = remove_selectors
            .iter()
            .filter_map(|raw| descendant_selector(raw))
            .collect();

        Self {
            remove_selectors,
            removed_descendants,
            strict: rewrite.strict_parsing,
            title_override: rewrite.title_override.clone(),
            head_markup: rewrite.inject_head.then(|| head_markup(assets)),
            assets: assets.clone(),
        }
    }

    /// Returns true if `url` names one of the relay's own assets.
    pub fn is_reserved(&self, url: &str) -> bool {
        self.assets.is_reserved(url)
    }
}

/// Every element below a match of `raw`, or `None` if that does not parse.
fn descendant_selector(raw: &str) -> Option<String> {
    let nested = raw
        .split(',')
        .map(|part| format!("{} *", part.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    nested.parse::<Selector>().ok().map(|_| nested)
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self::from_config(&RewriteConfig::default(), &AssetsConfig::default())
    }
}

/// Inputs of one rewrite pass.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Every relative reference in the document resolves against this.
    pub base: &'a Url,
    pub settings: &'a RewriteSettings,
}

impl<'a> RewriteContext<'a> {
    pub fn new(base: &'a Url, settings: &'a RewriteSettings) -> Self {
        Self { base, settings }
    }
}

/// Per-pass element counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub removed: usize,
    pub rewritten: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten,
    /// The pass failed; the original document is returned.
    Unmodified,
}

impl RewriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteOutcome::Rewritten => "rewritten",
            RewriteOutcome::Unmodified => "unmodified",
        }
    }
}

/// Result of [`rewrite_html`].
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub html: String,
    pub stats: RewriteStats,
    pub outcome: RewriteOutcome,
}

/// The whole pass could not complete.
#[derive(Debug, Error)]
#[error("HTML rewrite failed: {0}")]
pub struct RewriteFailure(#[from] lol_html::errors::RewritingError);

/// A single element could not be edited.
#[derive(Debug, Error)]
enum ElementError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("cannot set {attr}: {reason}")]
    Attribute { attr: &'static str, reason: String },
}

enum Edit {
    Rewritten,
    Skipped,
    /// Inside removed chrome; never reaches the output.
    Discarded,
}

#[derive(Default)]
struct Counters {
    removed: Cell<usize>,
    rewritten: Cell<usize>,
    skipped: Cell<usize>,
    failed: Cell<usize>,
}

impl Counters {
    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }

    /// Record an element edit. Failures are logged and dropped here.
    fn record(&self, tag: &'static str, result: Result<Edit, ElementError>) {
        match result {
            Ok(Edit::Rewritten) => Self::bump(&self.rewritten),
            Ok(Edit::Skipped) => Self::bump(&self.skipped),
            Ok(Edit::Discarded) => {}
            Err(e) => {
                tracing::warn!(element = tag, error = %e, "Element left unmodified");
                Self::bump(&self.failed);
            }
        }
    }

    fn snapshot(&self) -> RewriteStats {
        RewriteStats {
            removed: self.removed.get(),
            rewritten: self.rewritten.get(),
            skipped: self.skipped.get(),
            failed: self.failed.get(),
        }
    }
}

/// Run one rewrite pass over `html`.
///
/// Never fails: if the pass cannot complete the input is returned as-is
/// with [`RewriteOutcome::Unmodified`].
pub fn rewrite_html(html: &str, ctx: RewriteContext<'_>) -> Rewritten {
    let counters = Counters::default();

    let (html, outcome) = match run_pass(html, ctx, &counters) {
        Ok(out) => (out, RewriteOutcome::Rewritten),
        Err(e) => {
            tracing::warn!(base = %ctx.base, error = %e, "Serving upstream HTML unmodified");
            (html.to_string(), RewriteOutcome::Unmodified)
        }
    };

    let stats = counters.snapshot();
    metrics::record_rewrite(outcome.as_str());
    tracing::debug!(
        base = %ctx.base,
        outcome = outcome.as_str(),
        removed = stats.removed,
        rewritten = stats.rewritten,
        skipped = stats.skipped,
        failed = stats.failed,
        "Rewrite pass complete"
    );

    Rewritten { html, stats, outcome }
}

fn run_pass(html: &str, ctx: RewriteContext<'_>, counters: &Counters) -> Result<String, RewriteFailure> {
    let settings = ctx.settings;
    let base = ctx.base;
    let mut handlers = Vec::new();

    // Descendants go first so a chrome element nested in another is not
    // counted twice and later rules can see `el.removed()`.
    for selector in &settings.removed_descendants {
        handlers.push(element!(selector.as_str(), |el| {
            el.remove();
            Ok(())
        }));
    }
    for selector in &settings.remove_selectors {
        handlers.push(element!(selector.as_str(), |el| {
            if !el.removed() {
                el.remove();
                Counters::bump(&counters.removed);
            }
            Ok(())
        }));
    }

    if let Some(title) = settings.title_override.as_deref() {
        handlers.push(element!("title", move |el| {
            el.set_inner_content(title, ContentType::Text);
            Ok(())
        }));
    }

    if let Some(markup) = settings.head_markup.as_deref() {
        handlers.push(element!("head", move |el| {
            el.prepend(markup, ContentType::Html);
            Ok(())
        }));
    }

    handlers.push(element!("form", |el| {
        counters.record("form", rewrite_form(el, base));
        Ok(())
    }));
    handlers.push(element!("a[href]", |el| {
        counters.record("a", rewrite_anchor(el, base));
        Ok(())
    }));
    handlers.push(element!("link[href]", |el| {
        counters.record("link", rewrite_resource(el, "href", ctx));
        Ok(())
    }));
    handlers.push(element!("script[src]", |el| {
        counters.record("script", rewrite_resource(el, "src", ctx));
        Ok(())
    }));
    handlers.push(element!("img[src]", |el| {
        counters.record("img", rewrite_resource(el, "src", ctx));
        Ok(())
    }));

    let out = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            strict: settings.strict,
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(out)
}

fn rewrite_form(el: &mut Element<'_, '_>, base: &Url) -> Result<Edit, ElementError> {
    if el.removed() {
        return Ok(Edit::Discarded);
    }
    let target = match el.get_attribute("action").filter(|a| !a.trim().is_empty()) {
        Some(action) => resolve(&action, base)?,
        None => base.clone(),
    };
    set_attribute(el, "action", &proxy_href(&target))
}

fn rewrite_anchor(el: &mut Element<'_, '_>, base: &Url) -> Result<Edit, ElementError> {
    if el.removed() {
        return Ok(Edit::Discarded);
    }
    let href = match el.get_attribute("href") {
        Some(href) if !href.is_empty() && !is_skipped_link(&href) => href,
        _ => return Ok(Edit::Skipped),
    };
    let target = resolve(&href, base)?;
    set_attribute(el, "href", &proxy_href(&target))
}

fn rewrite_resource(
    el: &mut Element<'_, '_>,
    attr: &'static str,
    ctx: RewriteContext<'_>,
) -> Result<Edit, ElementError> {
    if el.removed() {
        return Ok(Edit::Discarded);
    }
    let url = match el.get_attribute(attr) {
        Some(url) if !url.is_empty() && !is_data_uri(&url) && !ctx.settings.is_reserved(&url) => url,
        _ => return Ok(Edit::Skipped),
    };
    let target = resolve(&url, ctx.base)?;
    if ctx.settings.is_reserved(target.as_str()) {
        return Ok(Edit::Skipped);
    }
    set_attribute(el, attr, &resource_href(&target))
}

fn set_attribute(el: &mut Element<'_, '_>, attr: &'static str, value: &str) -> Result<Edit, ElementError> {
    el.set_attribute(attr, value)
        .map_err(|e| ElementError::Attribute { attr, reason: e.to_string() })?;
    Ok(Edit::Rewritten)
}
