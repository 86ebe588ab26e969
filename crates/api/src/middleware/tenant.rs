//! Tenant resolution middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::HOST, request::Parts},
    middleware::Next,
    response::Response,
};
use wharf_core::storage::ObjectStore;
use wharf_core::tenant::{RequestContext, TenantDirectory};
use wharf_shared::AppError;

use crate::AppState;
use crate::error::ApiError;

/// Resolves the tenant from the `Host` header and stores the
/// [`RequestContext`] in the request extensions.
///
/// Falls back to the URI authority when the header is missing (HTTP/2).
pub async fn tenant_middleware<D, S>(
    State(state): State<AppState<D, S>>,
    mut request: Request,
    next: Next,
) -> Response
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    let host = request
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(ToString::to_string))
        .unwrap_or_default();

    let context = state.resolver.resolve(&host).await;
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Extractor for the resolved tenant context.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub RequestContext);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(CurrentTenant)
            .ok_or_else(|| AppError::Internal("tenant context is missing".to_string()).into())
    }
}
