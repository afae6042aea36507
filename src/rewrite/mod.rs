//! HTML rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! upstream HTML + base URL
//!     → rules.rs (single lol_html pass, ordered rules)
//!         → resolver.rs (relative → absolute, /proxy and /resource links)
//!         → head.rs (static PWA head markup)
//!     → rewritten HTML (or the original on failure)
//! ```
//!
//! # Design Decisions
//! - Streaming rewriter with CSS selectors; no DOM tree is built
//! - Settings are computed once at startup; a pass only borrows them
//! - Degraded rewriting is acceptable, a blank page is not

pub mod head;
pub mod resolver;
pub mod rules;

pub use resolver::{encode_component, proxy_href, resolve, resource_href, ResolutionError};
pub use rules::{
    rewrite_html, RewriteContext, RewriteFailure, RewriteOutcome, RewriteSettings, RewriteStats,
    Rewritten,
};
