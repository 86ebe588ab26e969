//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for URL rewriting and the media lifecycle events
//! - Tenant resolution middleware
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wharf_core::offload::MediaOffloader;
use wharf_core::rewrite::RewriteConfig;
use wharf_core::storage::{ObjectStore, S3ObjectStore};
use wharf_core::tenant::{TenantDirectory, TenantResolver};
use wharf_db::TenantRepository;

/// Application state shared across handlers.
pub struct AppState<D = TenantRepository, S = S3ObjectStore>
where
    D: TenantDirectory,
    S: ObjectStore,
{
    /// Rewrite settings shared by every request.
    pub rewrite: Arc<RewriteConfig>,
    /// Host-based tenant resolution.
    pub resolver: Arc<TenantResolver<D>>,
    /// Media offload to the object store.
    pub offloader: Arc<MediaOffloader<S>>,
}

impl<D: TenantDirectory, S: ObjectStore> AppState<D, S> {
    /// Creates the application state.
    #[must_use]
    pub fn new(
        rewrite: RewriteConfig,
        resolver: TenantResolver<D>,
        offloader: MediaOffloader<S>,
    ) -> Self {
        Self {
            rewrite: Arc::new(rewrite),
            resolver: Arc::new(resolver),
            offloader: Arc::new(offloader),
        }
    }
}

impl<D: TenantDirectory, S: ObjectStore> Clone for AppState<D, S> {
    fn clone(&self) -> Self {
        Self {
            rewrite: Arc::clone(&self.rewrite),
            resolver: Arc::clone(&self.resolver),
            offloader: Arc::clone(&self.offloader),
        }
    }
}

/// Creates the main application router.
pub fn create_router<D, S>(state: AppState<D, S>) -> Router
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
