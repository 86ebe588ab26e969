//! Resolved tenant endpoint.
//!
//! Lets the hosting runtime adopt the tenant, cookie domain and admin cookie
//! path resolved for the request host before it handles the request.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use wharf_core::storage::ObjectStore;
use wharf_core::tenant::{Tenant, TenantDirectory};

use crate::{AppState, middleware::CurrentTenant};

/// Creates the tenant routes.
pub fn routes<D, S>() -> Router<AppState<D, S>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    Router::new().route("/tenant", get(current_tenant))
}

/// Response for the resolved tenant.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    /// The tenant serving this host.
    pub tenant: Tenant,
    /// Cookie domain for the request.
    pub cookie_domain: Option<String>,
    /// Path scoping admin cookies.
    pub admin_cookie_path: &'static str,
}

/// GET `/tenant`
async fn current_tenant(CurrentTenant(ctx): CurrentTenant) -> Json<TenantResponse> {
    Json(TenantResponse {
        cookie_domain: ctx.cookie_domain().get().map(str::to_string),
        admin_cookie_path: ctx.admin_cookie_path(),
        tenant: ctx.tenant().clone(),
    })
}
