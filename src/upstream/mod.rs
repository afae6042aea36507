//! Upstream fetch subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher builds UpstreamRequest (page / form / resource)
//!     → client.rs (headers, timeout, redirect limit, size limit)
//!     → UpstreamResponse (buffered)
//!     or error.rs (Timeout / Dns / Status / TooLarge / Network)
//! ```

pub mod client;
pub mod error;

pub use client::{
    FetchKind, ForwardedHeaders, UpstreamClient, UpstreamRequest, UpstreamResponse,
    FORM_URLENCODED,
};
pub use error::UpstreamError;
