//! URL rewrite endpoints.
//!
//! The hosting runtime posts the output of each URL hook here and uses the
//! rewritten value in its place.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use wharf_core::offload::UploadDir;
use wharf_core::rewrite::{RewriteEngine, UrlHook, UrlValue};
use wharf_core::storage::ObjectStore;
use wharf_core::tenant::TenantDirectory;

use crate::{AppState, middleware::CurrentTenant};

/// Creates the rewrite routes.
pub fn routes<D, S>() -> Router<AppState<D, S>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    Router::new()
        .route("/rewrite", post(rewrite::<D, S>))
        .route("/uploads/dir", get(upload_dir::<D, S>))
}

/// Request body for a hook rewrite.
#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    /// Hook that produced the value.
    #[serde(default)]
    pub hook: UrlHook,
    /// A URL, a list of URLs, or any other JSON value.
    pub value: UrlValue,
}

/// Response for a hook rewrite.
#[derive(Debug, Serialize)]
pub struct RewriteResponse {
    /// Hook that produced the value.
    pub hook: UrlHook,
    /// The rewritten value, same shape as the input.
    pub value: UrlValue,
}

/// POST `/rewrite`
async fn rewrite<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
    Json(payload): Json<RewriteRequest>,
) -> Json<RewriteResponse>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    let mut engine = RewriteEngine::new(&state.rewrite, &ctx);
    let value = engine.rewrite_hook(payload.hook, payload.value);

    Json(RewriteResponse {
        hook: payload.hook,
        value,
    })
}

/// GET `/uploads/dir`
/// The tenant's upload directory for the current month.
async fn upload_dir<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
) -> Json<UploadDir>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    let mut engine = RewriteEngine::new(&state.rewrite, &ctx);
    Json(state.offloader.upload_dir(&mut engine))
}
