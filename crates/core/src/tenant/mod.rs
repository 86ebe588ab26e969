//! Tenant resolution.
//!
//! Runs once per request, before any URL is rewritten. The resulting
//! [`RequestContext`] is immutable for the rest of the request, apart from the
//! cookie domain which can be set exactly once.

pub mod context;
pub mod error;
pub mod resolver;


pub use context::{ADMIN_COOKIE_PATH, CookieDomain, MAIN_TENANT_ID, RequestContext, Tenant};
pub use error::TenantError;
pub use resolver::{TenantDirectory, TenantRecord, TenantResolver, TenantSettings};
