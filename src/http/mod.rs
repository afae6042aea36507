//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, static fallback)
//!     → request.rs (request ID, tracing span)
//!     → handlers.rs (validate target, fetch upstream, rewrite)
//!     → response.rs (content type, cache headers)
//!     → Send to client
//! ```

pub mod handlers;
pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
