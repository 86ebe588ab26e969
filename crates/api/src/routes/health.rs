//! Health check endpoints.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use wharf_core::storage::ObjectStore;
use wharf_core::tenant::TenantDirectory;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check handler.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates health check routes.
pub fn routes<D, S>() -> Router<AppState<D, S>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    Router::new().route("/health", get(health_check))
}
