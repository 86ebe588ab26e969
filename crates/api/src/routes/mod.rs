//! API route definitions.

use axum::{Router, middleware};
use wharf_core::storage::ObjectStore;
use wharf_core::tenant::TenantDirectory;

use crate::{AppState, middleware::tenant_middleware};

pub mod health;
pub mod media;
pub mod rewrite;
pub mod tenant;

/// Creates the API router. Every route except the health check runs behind
/// tenant resolution.
pub fn api_routes_with_state<D, S>(state: AppState<D, S>) -> Router<AppState<D, S>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    let tenant_routes = Router::new()
        .merge(tenant::routes())
        .merge(rewrite::routes())
        .merge(media::routes())
        .layer(middleware::from_fn_with_state(
            state,
            tenant_middleware::<D, S>,
        ));

    Router::new().merge(health::routes()).merge(tenant_routes)
}
