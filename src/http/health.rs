//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub target_site: String,
    pub uptime_secs: u64,
}

/// `GET /health`. Never touches the upstream.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        target_site: state.config.proxy.target_site.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
